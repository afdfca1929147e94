//! Quarantine record types.

use crate::core::FileHash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Unique identifier for one quarantine move.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuarantineId(pub String);

impl QuarantineId {
    /// Creates a new random quarantine ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QuarantineId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QuarantineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file that was moved into quarantine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    /// Unique identifier for this move.
    pub id: QuarantineId,

    /// Where the file was.
    pub original_path: PathBuf,

    /// Where the file is now.
    pub destination: PathBuf,

    /// Hash of the content, if the file could be read before the move.
    pub file_hash: Option<FileHash>,

    /// Signature that got the file quarantined, when known.
    pub signature: Option<String>,

    /// When the file was moved.
    pub quarantined_at: DateTime<Utc>,
}

/// The result of one move attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuarantineOutcome {
    /// The file now lives in the quarantine directory.
    Moved(QuarantineRecord),

    /// The file is still at its original location.
    Failed {
        /// The file that could not be moved.
        path: PathBuf,
        /// Why.
        reason: String,
    },
}

impl QuarantineOutcome {
    /// Returns `true` if the file was moved.
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved(_))
    }

    /// The original path of the file.
    pub fn path(&self) -> &Path {
        match self {
            Self::Moved(record) => &record.original_path,
            Self::Failed { path, .. } => path,
        }
    }

    /// Destination inside the quarantine directory, if the move succeeded.
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Moved(record) => Some(&record.destination),
            Self::Failed { .. } => None,
        }
    }
}
