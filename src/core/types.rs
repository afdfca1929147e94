//! Core types used throughout the buddy-cleaner library.
//!
//! This module defines the per-file verdict and the file hash recorded for
//! quarantined files.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The classification of a single file.
///
/// Produced once per file per scan pass and consumed immediately by the
/// directory scanner:
/// - `Clean`: the engine found nothing
/// - `Infected`: the engine matched a signature
/// - `Error`: the file could not be scanned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanVerdict {
    /// No threat detected.
    Clean,

    /// The engine matched a signature.
    Infected {
        /// Signature name reported by the engine (e.g., "Eicar-Test-Signature").
        signature: String,
    },

    /// The file could not be scanned.
    Error {
        /// Human-readable reason.
        reason: String,
    },
}

impl ScanVerdict {
    /// Creates an `Infected` verdict.
    pub fn infected(signature: impl Into<String>) -> Self {
        Self::Infected {
            signature: signature.into(),
        }
    }

    /// Creates an `Error` verdict.
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the file is clean.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    /// Returns `true` if the file is infected.
    pub fn is_infected(&self) -> bool {
        matches!(self, Self::Infected { .. })
    }

    /// Returns `true` if the scan failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Returns the signature name for infected verdicts.
    pub fn signature(&self) -> Option<&str> {
        match self {
            Self::Infected { signature } => Some(signature),
            _ => None,
        }
    }
}

impl fmt::Display for ScanVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Infected { signature } => write!(f, "infected ({})", signature),
            Self::Error { reason } => write!(f, "error ({})", reason),
        }
    }
}

/// BLAKE3 hash of a file's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHash {
    /// Hex-encoded BLAKE3 digest.
    pub blake3: String,
}

impl FileHash {
    /// Creates a new `FileHash` from a hex digest.
    pub fn new(blake3: impl Into<String>) -> Self {
        Self {
            blake3: blake3.into(),
        }
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.blake3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_verdict_is_methods() {
        assert!(ScanVerdict::Clean.is_clean());
        assert!(!ScanVerdict::Clean.is_infected());

        let infected = ScanVerdict::infected("Eicar-Test-Signature");
        assert!(infected.is_infected());
        assert_eq!(infected.signature(), Some("Eicar-Test-Signature"));

        let error = ScanVerdict::error("permission denied");
        assert!(error.is_error());
        assert_eq!(error.signature(), None);
    }

    #[test]
    fn test_scan_verdict_serde_tag() {
        let json = serde_json::to_string(&ScanVerdict::infected("Win.Trojan.Agent")).unwrap();
        assert_eq!(json, r#"{"type":"infected","signature":"Win.Trojan.Agent"}"#);
    }

    #[test]
    fn test_file_hash_display() {
        let hash = FileHash::new("abc123");
        assert_eq!(format!("{}", hash), "blake3:abc123");
    }
}
