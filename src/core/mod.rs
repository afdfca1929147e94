//! Core types and traits for the buddy-cleaner library.
//!
//! - [`types`] - Per-file verdicts and file hashes
//! - [`traits`] - The `Scanner` trait
//! - [`error`] - Structured error types
//! - [`hasher`] - BLAKE3-based file hashing
//! - [`result`] - Scan report structures

pub mod error;
pub mod hasher;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{ConfigError, ConnectionError, QuarantineError, ScanError};
pub use hasher::FileHasher;
pub use result::{Detection, ScanFailure, ScanReport};
pub use traits::{ArcScanner, Scanner};
pub use types::{FileHash, ScanVerdict};
