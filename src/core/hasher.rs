//! BLAKE3 file hashing.
//!
//! Quarantine records carry the hash of the moved content so the audit log
//! can identify a file after it has left its original location.

use crate::core::error::ScanError;
use crate::core::types::FileHash;

use std::io::Read;
use std::path::Path;

/// Streams files through BLAKE3.
///
/// # Examples
///
/// ```rust
/// use buddy_cleaner::core::FileHasher;
///
/// let hash = FileHasher::new().hash_bytes(b"hello world");
/// assert_eq!(hash.blake3.len(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct FileHasher {
    buffer_size: usize,
}

impl Default for FileHasher {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024,
        }
    }
}

impl FileHasher {
    /// Creates a new `FileHasher` with a 64 KiB read buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes bytes already in memory.
    pub fn hash_bytes(&self, data: &[u8]) -> FileHash {
        FileHash::new(blake3::hash(data).to_hex().to_string())
    }

    /// Hashes a file without loading it entirely into memory.
    pub fn hash_file(&self, path: &Path) -> Result<FileHash, ScanError> {
        let file = std::fs::File::open(path).map_err(|e| ScanError::from_io(path, e))?;
        let mut reader = std::io::BufReader::new(file);
        self.hash_reader(&mut reader)
    }

    /// Hashes everything a reader yields.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> Result<FileHash, ScanError> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.buffer_size];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(FileHash::new(hasher.finalize().to_hex().to_string()))
    }
}
