use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use super::{read_chunk, HASH_CHUNK_SIZE, PARTIAL_HASH_LENGTH};

/// BLAKE3 digest of a file's content.
///
/// Two files with the same fingerprint are treated as duplicates. A collision
/// between different contents is possible in principle; callers that need
/// certainty confirm with [`super::files_identical`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; blake3::OUT_LEN]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; blake3::OUT_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl From<blake3::Hash> for Fingerprint {
    fn from(hash: blake3::Hash) -> Self {
        Fingerprint(*hash.as_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_string()[..16])
    }
}

/// Fingerprint the whole file, streamed in [`HASH_CHUNK_SIZE`] reads.
pub fn fingerprint_file(path: &Path) -> io::Result<Fingerprint> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let n = read_chunk(&mut file, &mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        if n < buffer.len() {
            break;
        }
    }

    Ok(hasher.finalize().into())
}

/// Fingerprint only the first [`PARTIAL_HASH_LENGTH`] bytes.
pub fn partial_fingerprint(path: &Path) -> io::Result<Fingerprint> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; PARTIAL_HASH_LENGTH];
    let n = read_chunk(&mut file, &mut buffer)?;
    Ok(blake3::hash(&buffer[..n]).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_identical_content_same_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&a, &content).unwrap();
        fs::write(&b, &content).unwrap();

        assert_eq!(fingerprint_file(&a).unwrap(), fingerprint_file(&b).unwrap());
        assert_eq!(
            fingerprint_file(&a).unwrap(),
            Fingerprint::from(blake3::hash(&content))
        );
    }

    #[test]
    fn test_tail_difference_only_shows_in_full_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let mut content = vec![7u8; PARTIAL_HASH_LENGTH * 3];
        fs::write(&a, &content).unwrap();
        *content.last_mut().unwrap() = 8;
        fs::write(&b, &content).unwrap();

        assert_eq!(partial_fingerprint(&a).unwrap(), partial_fingerprint(&b).unwrap());
        assert_ne!(fingerprint_file(&a).unwrap(), fingerprint_file(&b).unwrap());
    }

    #[test]
    fn test_hex_display() {
        let fp = Fingerprint::from(blake3::hash(b""));
        assert_eq!(fp.to_hex(), blake3::hash(b"").to_hex().to_string());
        assert_eq!(fp.to_hex().len(), 64);
    }

    #[test]
    fn test_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(fingerprint_file(&dir.path().join("gone")).is_err());
    }
}
