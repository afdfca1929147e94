//! Mock scanner for testing.
//!
//! The mock classifies files by name instead of content, so tests can lay
//! out a directory tree and know in advance how every file will be judged.

use crate::core::{ScanError, ScanVerdict, Scanner};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

/// Signature reported for files the mock flags.
pub const MOCK_SIGNATURE: &str = "Mock.Test-Signature";

/// A mock scanner for testing purposes.
///
/// By default a file is infected when its file name contains `INFECTED`
/// and clean otherwise. Specific file names can be given a fixed verdict or
/// made to fail as if the daemon connection dropped.
///
/// # Examples
///
/// ```rust
/// use buddy_cleaner::backends::MockScanner;
/// use buddy_cleaner::core::ScanVerdict;
///
/// let scanner = MockScanner::new()
///     .with_marker("EVIL")
///     .with_failure("locked.bin")
///     .with_verdict("eicar.com", ScanVerdict::infected("Eicar-Test-Signature"));
/// ```
#[derive(Debug)]
pub struct MockScanner {
    /// Name of this scanner instance.
    name: String,
    /// Substring of the file name that marks a file as infected.
    marker: String,
    /// Fixed verdicts keyed by file name.
    responses: RwLock<HashMap<String, ScanVerdict>>,
    /// File names for which scanning fails.
    failures: RwLock<HashSet<String>>,
    /// Counter for scan operations.
    scan_count: AtomicU64,
    /// Whether to fail health checks.
    unhealthy: AtomicBool,
}

impl MockScanner {
    /// Creates a new mock scanner with the `INFECTED` marker.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            marker: "INFECTED".to_string(),
            responses: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashSet::new()),
            scan_count: AtomicU64::new(0),
            unhealthy: AtomicBool::new(false),
        }
    }

    /// Sets the name of this scanner.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the file-name marker that flags a file as infected.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Fixes the verdict for files with this exact file name.
    pub fn with_verdict(self, file_name: impl Into<String>, verdict: ScanVerdict) -> Self {
        self.add_verdict(file_name, verdict);
        self
    }

    /// Makes scanning of files with this exact file name fail.
    pub fn with_failure(self, file_name: impl Into<String>) -> Self {
        self.add_failure(file_name);
        self
    }

    /// Fixes the verdict for a file name (mutable version).
    pub fn add_verdict(&self, file_name: impl Into<String>, verdict: ScanVerdict) {
        self.responses
            .write()
            .unwrap()
            .insert(file_name.into(), verdict);
    }

    /// Makes scanning of a file name fail (mutable version).
    pub fn add_failure(&self, file_name: impl Into<String>) {
        self.failures.write().unwrap().insert(file_name.into());
    }

    /// Returns the number of scans performed.
    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::Relaxed)
    }

    /// Sets the health status.
    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::Relaxed);
    }

    /// Makes the scanner unhealthy (health checks will fail).
    pub fn make_unhealthy(&self) {
        self.set_healthy(false);
    }

    /// Makes the scanner healthy again.
    pub fn make_healthy(&self) {
        self.set_healthy(true);
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for MockScanner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scan_file(&self, path: &Path) -> Result<ScanVerdict, ScanError> {
        self.scan_count.fetch_add(1, Ordering::Relaxed);

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.failures.read().unwrap().contains(&file_name) {
            return Err(ScanError::connection_failed(
                &self.name,
                "simulated transport failure",
            ));
        }

        std::fs::symlink_metadata(path).map_err(|e| ScanError::from_io(path, e))?;

        if let Some(verdict) = self.responses.read().unwrap().get(&file_name) {
            return match verdict {
                ScanVerdict::Error { reason } => {
                    Err(ScanError::engine_error(&self.name, reason.clone()))
                }
                other => Ok(other.clone()),
            };
        }

        if !self.marker.is_empty() && file_name.contains(&self.marker) {
            Ok(ScanVerdict::infected(MOCK_SIGNATURE))
        } else {
            Ok(ScanVerdict::Clean)
        }
    }

    async fn health_check(&self) -> Result<(), ScanError> {
        if self.unhealthy.load(Ordering::Relaxed) {
            return Err(ScanError::connection_failed(
                &self.name,
                "mock scanner is unhealthy",
            ));
        }
        Ok(())
    }

    async fn version(&self) -> Option<String> {
        Some(format!("{} {}", self.name, env!("CARGO_PKG_VERSION")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"content").unwrap();
        path
    }

    #[tokio::test]
    async fn test_mock_scanner_marker() {
        let dir = TempDir::new().unwrap();
        let scanner = MockScanner::new();

        let clean = touch(&dir, "report.pdf");
        let infected = touch(&dir, "INFECTED-payload.exe");

        assert_eq!(scanner.scan_file(&clean).await.unwrap(), ScanVerdict::Clean);
        assert_eq!(
            scanner.scan_file(&infected).await.unwrap(),
            ScanVerdict::infected(MOCK_SIGNATURE)
        );
        assert_eq!(scanner.scan_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_scanner_failure_and_fixed_verdict() {
        let dir = TempDir::new().unwrap();
        let scanner = MockScanner::new()
            .with_failure("locked.bin")
            .with_verdict("eicar.com", ScanVerdict::infected("Eicar-Test-Signature"));

        let locked = touch(&dir, "locked.bin");
        let eicar = touch(&dir, "eicar.com");

        let err = scanner.scan_file(&locked).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(
            scanner.scan_file(&eicar).await.unwrap().signature(),
            Some("Eicar-Test-Signature")
        );
    }

    #[tokio::test]
    async fn test_mock_scanner_missing_file() {
        let dir = TempDir::new().unwrap();
        let scanner = MockScanner::new();

        let result = scanner.scan_file(&dir.path().join("gone.txt")).await;
        assert!(matches!(result, Err(ScanError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn test_mock_scanner_health_check() {
        let scanner = MockScanner::new();
        assert!(scanner.health_check().await.is_ok());

        scanner.make_unhealthy();
        assert!(scanner.health_check().await.is_err());

        scanner.make_healthy();
        assert!(scanner.health_check().await.is_ok());
    }
}
