pub mod fingerprint;
pub mod verify;

pub use fingerprint::{fingerprint_file, partial_fingerprint, Fingerprint};
pub use verify::files_identical;

use std::io::{self, Read};

/// Streaming read size. Must stay a power of two of at least 4 KiB so memory
/// use is bounded no matter how large the file is.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Bytes read from the head of a file for the cheap first-pass fingerprint.
pub const PARTIAL_HASH_LENGTH: usize = 4096;

/// Fill `buf` as far as the reader allows. Returns fewer bytes than
/// `buf.len()` only at end of file.
pub(crate) fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
