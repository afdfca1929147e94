//! Scan report structures.
//!
//! A `ScanReport` is the result of one full directory pass. It keeps the
//! infected and clean files in traversal order, plus every file that could
//! not be scanned.

use crate::core::types::ScanVerdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A file the engine flagged as infected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Path of the infected file.
    pub path: PathBuf,
    /// Signature name reported by the engine.
    pub signature: String,
}

/// A file (or directory entry) that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    /// Path that failed.
    pub path: PathBuf,
    /// Human-readable reason.
    pub reason: String,
}

/// The result of scanning one directory tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Unique identifier for this report.
    pub id: String,

    /// The directory that was scanned.
    pub root: PathBuf,

    /// Infected files, in traversal order.
    pub infected: Vec<Detection>,

    /// Clean files, in traversal order.
    pub clean: Vec<PathBuf>,

    /// Files and entries that could not be scanned.
    pub failures: Vec<ScanFailure>,

    /// When the pass started.
    pub started_at: DateTime<Utc>,

    /// When the pass completed.
    pub completed_at: DateTime<Utc>,

    /// How long the pass took.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl ScanReport {
    /// Starts an empty report for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            root: root.into(),
            infected: Vec::new(),
            clean: Vec::new(),
            failures: Vec::new(),
            started_at: now,
            completed_at: now,
            duration: Duration::ZERO,
        }
    }

    /// Files the verdict into exactly one of the three lists.
    pub fn record(&mut self, path: PathBuf, verdict: ScanVerdict) {
        match verdict {
            ScanVerdict::Clean => self.clean.push(path),
            ScanVerdict::Infected { signature } => {
                self.infected.push(Detection { path, signature })
            }
            ScanVerdict::Error { reason } => self.failures.push(ScanFailure { path, reason }),
        }
    }

    /// Records a failure that did not come from the engine (walk errors).
    pub fn record_failure(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.failures.push(ScanFailure {
            path,
            reason: reason.into(),
        });
    }

    /// Stamps the completion time.
    pub fn finish(mut self, elapsed: Duration) -> Self {
        self.completed_at = Utc::now();
        self.duration = elapsed;
        self
    }

    /// Returns `true` if no infected file was found.
    pub fn is_clean(&self) -> bool {
        self.infected.is_empty()
    }

    /// Returns `true` if any infected file was found.
    pub fn has_infections(&self) -> bool {
        !self.infected.is_empty()
    }

    /// Paths of the infected files, in traversal order.
    pub fn infected_paths(&self) -> Vec<&Path> {
        self.infected.iter().map(|d| d.path.as_path()).collect()
    }

    /// Number of files that reached a verdict.
    pub fn scanned_count(&self) -> usize {
        self.infected.len() + self.clean.len()
    }
}

/// Serde helper for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_partitions_verdicts() {
        let mut report = ScanReport::new("/data");
        report.record(PathBuf::from("/data/a"), ScanVerdict::Clean);
        report.record(PathBuf::from("/data/b"), ScanVerdict::infected("Eicar"));
        report.record(PathBuf::from("/data/c"), ScanVerdict::error("unreadable"));

        assert_eq!(report.clean, vec![PathBuf::from("/data/a")]);
        assert_eq!(report.infected_paths(), vec![Path::new("/data/b")]);
        assert_eq!(report.infected[0].signature, "Eicar");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].reason, "unreadable");
        assert_eq!(report.scanned_count(), 2);
        assert!(report.has_infections());
    }

    #[test]
    fn test_report_json_duration_millis() {
        let report = ScanReport::new("/data").finish(Duration::from_millis(1500));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["duration"], 1500);
        assert!(report.is_clean());
    }
}
