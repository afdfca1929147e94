//! Error types for the buddy-cleaner library.
//!
//! Errors are split by the component that raises them. Only
//! [`ConnectionError`] and [`ConfigError`] are fatal to a command; scan and
//! move failures are recovered per file and end up in reports.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The daemon could not be reached or failed its liveness check.
///
/// Raised once, at session start. No scan can proceed after it.
#[derive(Debug, Error)]
#[error("cannot connect to engine '{engine}': {cause}")]
pub struct ConnectionError {
    /// Name of the engine that could not be reached.
    pub engine: String,
    /// The underlying failure.
    #[source]
    pub cause: ScanError,
}

impl ConnectionError {
    /// Creates a `ConnectionError` for the given engine.
    pub fn new(engine: impl Into<String>, cause: ScanError) -> Self {
        Self {
            engine: engine.into(),
            cause,
        }
    }
}

/// Per-file scan failure.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Failed to connect to the scanning engine.
    #[error("connection to engine '{engine}' failed: {message}")]
    ConnectionFailed {
        /// Name of the engine.
        engine: String,
        /// Error message describing the failure.
        message: String,
    },

    /// The operation timed out.
    #[error("operation timed out after {elapsed:?} on engine '{engine}'")]
    Timeout {
        /// Name of the engine that timed out.
        engine: String,
        /// How long the operation ran before timing out.
        elapsed: Duration,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found at the specified path.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// The file exceeds the maximum size the engine accepts.
    #[error("file size {size} bytes exceeds maximum {max} bytes")]
    FileTooLarge {
        /// Actual file size in bytes.
        size: u64,
        /// Maximum allowed size in bytes.
        max: u64,
    },

    /// The engine reported an error for this file.
    #[error("engine '{engine}' reported an error: {reason}")]
    Engine {
        /// Name of the engine.
        engine: String,
        /// Reason given by the engine.
        reason: String,
    },

    /// The engine returned a response that could not be interpreted.
    #[error("ambiguous response from engine '{engine}': {details}")]
    AmbiguousResponse {
        /// Name of the engine.
        engine: String,
        /// The response, or a description of what was wrong with it.
        details: String,
    },

    /// The scanner is misconfigured.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl ScanError {
    /// Returns the engine name if this error is associated with one.
    pub fn engine(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailed { engine, .. }
            | Self::Timeout { engine, .. }
            | Self::Engine { engine, .. }
            | Self::AmbiguousResponse { engine, .. } => Some(engine),
            _ => None,
        }
    }

    /// Returns `true` if this error says nothing about the file itself,
    /// only about the transport to the engine.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::AmbiguousResponse { .. }
        )
    }

    /// Creates a `ConnectionFailed` error.
    pub fn connection_failed(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(engine: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            engine: engine.into(),
            elapsed,
        }
    }

    /// Creates an `Engine` error.
    pub fn engine_error(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Engine {
            engine: engine.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `AmbiguousResponse` error.
    pub fn ambiguous(engine: impl Into<String>, details: impl Into<String>) -> Self {
        Self::AmbiguousResponse {
            engine: engine.into(),
            details: details.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Maps an I/O error on `path`, turning `NotFound` into `FileNotFound`.
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io(err)
        }
    }
}

/// Error type for quarantine operations.
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// The quarantine directory could not be created.
    #[error("cannot create quarantine directory {}: {source}", path.display())]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file could not be moved into quarantine.
    #[error("cannot move {} to {}: {reason}", from.display(), to.display())]
    Move {
        /// Source path.
        from: PathBuf,
        /// Intended destination.
        to: PathBuf,
        /// Why the move failed.
        reason: String,
    },

    /// The path has no file name component to keep.
    #[error("path has no file name: {}", path.display())]
    NoFileName {
        /// The offending path.
        path: PathBuf,
    },

}

/// Error type for loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration {}: {source}", path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`crate::Config`].
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range or a required value is missing.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_engine() {
        let err = ScanError::connection_failed("clamav", "socket missing");
        assert_eq!(err.engine(), Some("clamav"));

        let io_err = ScanError::Io(std::io::Error::other("test error"));
        assert_eq!(io_err.engine(), None);
    }

    #[test]
    fn test_scan_error_is_transport() {
        assert!(ScanError::timeout("clamav", Duration::from_secs(1)).is_transport());
        assert!(!ScanError::engine_error("clamav", "Size limit exceeded").is_transport());
        assert!(!ScanError::FileTooLarge { size: 2, max: 1 }.is_transport());
    }

    #[test]
    fn test_from_io_not_found() {
        let path = std::path::Path::new("/nope/file");
        let err = ScanError::from_io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ScanError::FileNotFound { .. }));
        assert!(err.to_string().contains("/nope/file"));

        let err = ScanError::from_io(
            path,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScanError::Io(_)));
    }

    #[test]
    fn test_connection_error_display() {
        let err = ConnectionError::new(
            "clamav",
            ScanError::connection_failed("clamav", "No such file or directory"),
        );
        let msg = err.to_string();
        assert!(msg.contains("clamav"));
        assert!(msg.contains("No such file or directory"));
    }

    #[test]
    fn test_file_too_large_display() {
        let err = ScanError::FileTooLarge {
            size: 100_000_000,
            max: 50_000_000,
        };
        assert!(err.to_string().contains("100000000"));
        assert!(err.to_string().contains("50000000"));
    }
}
