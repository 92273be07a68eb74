//! Checksum calculation using MD5
//!
//! Files are streamed through the digest with a fixed-size buffer so memory
//! stays bounded regardless of file size.

use md5::{Digest, Md5};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer size for streaming checksums
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Streaming MD5 over a reader, tracking how many bytes were hashed
pub struct ChecksumStream {
    hasher: Md5,
    bytes: u64,
}

impl ChecksumStream {
    pub fn new() -> Self {
        Self {
            hasher: Md5::new(),
            bytes: 0,
        }
    }

    /// Consume the reader to EOF, feeding everything into the digest
    pub fn consume<R: Read>(&mut self, mut reader: R) -> io::Result<()> {
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.hasher.update(&buffer[..n]);
            self.bytes += n as u64;
        }

        Ok(())
    }

    /// Number of bytes hashed so far
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Finish the digest and return it as lowercase hex (32 characters)
    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

impl Default for ChecksumStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the MD5 checksum of a file, returning `(hex, bytes_read)`
///
/// Fails if the file cannot be opened or a read fails part way through.
pub fn compute_md5_with_size(path: &Path) -> io::Result<(String, u64)> {
    let file = File::open(path)?;
    let mut stream = ChecksumStream::new();
    stream.consume(file)?;
    let bytes = stream.bytes();
    Ok((stream.finish(), bytes))
}

/// Compute the MD5 checksum of a file as lowercase hex
///
/// # Example
///
/// ```no_run
/// use rotcheck::content::compute_md5;
/// use std::path::Path;
///
/// let sum = compute_md5(Path::new("/etc/hostname")).unwrap();
/// assert_eq!(sum.len(), 32);
/// ```
pub fn compute_md5(path: &Path) -> io::Result<String> {
    compute_md5_with_size(path).map(|(sum, _)| sum)
}

/// Compute the MD5 checksum of an in-memory buffer as lowercase hex
pub fn compute_md5_bytes(content: &[u8]) -> String {
    format!("{:x}", Md5::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_compute_md5_bytes_known_values() {
        assert_eq!(compute_md5_bytes(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            compute_md5_bytes(b"The quick brown fox jumps over the lazy dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn test_compute_md5_file_matches_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        file.flush().unwrap();

        let (sum, bytes) = compute_md5_with_size(file.path()).unwrap();
        assert_eq!(sum, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(sum, compute_md5_bytes(b"hello"));
        assert_eq!(bytes, 5);
    }

    #[test]
    fn test_large_content_spans_buffers() {
        // Larger than the read buffer so the digest sees several chunks
        let data = vec![0xABu8; READ_BUFFER_SIZE * 3 + 17];
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let (sum, bytes) = compute_md5_with_size(file.path()).unwrap();
        assert_eq!(sum, compute_md5_bytes(&data));
        assert_eq!(bytes, data.len() as u64);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = compute_md5(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
