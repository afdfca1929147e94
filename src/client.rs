//! The session handle to a scanning daemon.

use crate::core::{ArcScanner, ConnectionError, ScanVerdict, Scanner};

use std::path::Path;
use std::sync::Arc;

/// A verified connection to a scanning engine.
///
/// Created once per command and reused for every file. `scan_file` never
/// fails: transport and protocol errors come back as
/// [`ScanVerdict::Error`], so one bad file or a hiccuping daemon cannot
/// abort a directory pass.
#[derive(Debug, Clone)]
pub struct ScanClient {
    scanner: ArcScanner,
    version: Option<String>,
}

impl ScanClient {
    /// Connects to `scanner` and runs its liveness check.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the health check fails. Callers are
    /// expected to treat this as fatal; there is no retry.
    pub async fn connect<S: Scanner + 'static>(scanner: S) -> Result<Self, ConnectionError> {
        Self::connect_arc(Arc::new(scanner)).await
    }

    /// Like [`ScanClient::connect`], for a scanner that is already shared.
    pub async fn connect_arc(scanner: ArcScanner) -> Result<Self, ConnectionError> {
        scanner
            .health_check()
            .await
            .map_err(|e| ConnectionError::new(scanner.name(), e))?;

        let version = scanner.version().await;
        tracing::info!(
            engine = scanner.name(),
            version = version.as_deref().unwrap_or("unknown"),
            "Connected to scanning engine"
        );

        Ok(Self { scanner, version })
    }

    /// Name of the underlying engine.
    pub fn name(&self) -> &str {
        self.scanner.name()
    }

    /// Version reported by the engine at connect time.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Scans one file.
    pub async fn scan_file(&self, path: &Path) -> ScanVerdict {
        match self.scanner.scan_file(path).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::debug!(
                    engine = self.scanner.name(),
                    path = %path.display(),
                    error = %e,
                    "Scan call failed"
                );
                ScanVerdict::error(e.to_string())
            }
        }
    }
}
