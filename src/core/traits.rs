//! Core traits for the buddy-cleaner library.
//!
//! This module defines the `Scanner` trait that every scanning backend
//! implements.

use crate::core::error::ScanError;
use crate::core::types::ScanVerdict;

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

/// The seam between the sweep pipeline and a malware scanning engine.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync` for use in async contexts.
/// - `scan_file` returns `Ok(ScanVerdict::Clean)` or
///   `Ok(ScanVerdict::Infected { .. })` for a completed scan and `Err` for
///   anything else. Callers should go through [`crate::ScanClient`], which
///   turns errors into `ScanVerdict::Error`.
/// - Health checks should be lightweight and not require file data.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use buddy_cleaner::core::{Scanner, ScanError, ScanVerdict};
/// use async_trait::async_trait;
/// use std::path::Path;
///
/// #[derive(Debug)]
/// struct NeverInfected;
///
/// #[async_trait]
/// impl Scanner for NeverInfected {
///     fn name(&self) -> &str {
///         "never-infected"
///     }
///
///     async fn scan_file(&self, _path: &Path) -> Result<ScanVerdict, ScanError> {
///         Ok(ScanVerdict::Clean)
///     }
///
///     async fn health_check(&self) -> Result<(), ScanError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Scanner: Send + Sync + Debug {
    /// Returns the name of this scanner engine, like "clamav".
    fn name(&self) -> &str;

    /// Scans the file at `path`.
    ///
    /// # Errors
    ///
    /// - `ConnectionFailed` / `Timeout` - The engine is not reachable.
    /// - `FileNotFound` / `Io` - The file could not be read.
    /// - `FileTooLarge` - The file exceeds the engine's limit.
    /// - `Engine` - The engine refused or failed to scan the file.
    /// - `AmbiguousResponse` - The engine's answer could not be parsed.
    async fn scan_file(&self, path: &Path) -> Result<ScanVerdict, ScanError>;

    /// Verifies that the engine is reachable and operational.
    async fn health_check(&self) -> Result<(), ScanError>;

    /// Returns the engine's version string, if it reports one.
    async fn version(&self) -> Option<String> {
        None
    }
}

/// An arc-wrapped scanner for shared ownership.
pub type ArcScanner = std::sync::Arc<dyn Scanner>;
