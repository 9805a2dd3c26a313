use std::fs::{self, File};
use std::io;
use std::path::Path;

use super::{read_chunk, HASH_CHUNK_SIZE};

/// Byte-for-byte comparison of two files, chunk by chunk.
pub fn files_identical(a: &Path, b: &Path) -> io::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut fa = File::open(a)?;
    let mut fb = File::open(b)?;
    let mut buf_a = vec![0u8; HASH_CHUNK_SIZE];
    let mut buf_b = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let na = read_chunk(&mut fa, &mut buf_a)?;
        let nb = read_chunk(&mut fb, &mut buf_b)?;
        if na != nb || buf_a[..na] != buf_b[..nb] {
            return Ok(false);
        }
        if na < HASH_CHUNK_SIZE {
            return Ok(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_identical() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        let content = vec![3u8; HASH_CHUNK_SIZE + 10];
        fs::write(&a, &content).unwrap();
        fs::write(&b, &content).unwrap();
        let mut other = content.clone();
        other[HASH_CHUNK_SIZE + 5] = 4;
        fs::write(&c, &other).unwrap();

        assert!(files_identical(&a, &b).unwrap());
        assert!(!files_identical(&a, &c).unwrap());
    }

    #[test]
    fn test_different_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, b"abc").unwrap();
        fs::write(&b, b"abcd").unwrap();
        assert!(!files_identical(&a, &b).unwrap());
    }
}
