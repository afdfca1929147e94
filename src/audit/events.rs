//! Audit event types and their `tracing` mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Something that happened to a file and must be recoverable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A directory pass started.
    ScanStarted {
        /// Report ID of the pass.
        scan_id: String,
        /// Directory being scanned.
        root: PathBuf,
    },

    /// A file or directory entry could not be scanned.
    ScanFailed {
        /// Report ID of the pass.
        scan_id: String,
        /// Path that failed.
        path: PathBuf,
        /// Why.
        reason: String,
    },

    /// The engine flagged a file.
    FileInfected {
        /// Report ID of the pass.
        scan_id: String,
        /// Infected file.
        path: PathBuf,
        /// Signature name reported by the engine.
        signature: String,
    },

    /// A directory pass finished.
    ScanCompleted {
        /// Report ID of the pass.
        scan_id: String,
        /// Directory that was scanned.
        root: PathBuf,
        /// Number of clean files.
        clean: usize,
        /// Number of infected files.
        infected: usize,
        /// Number of failures.
        failed: usize,
        /// Duration of the pass in milliseconds.
        duration_ms: u64,
    },

    /// A file was moved into quarantine.
    FileQuarantined {
        /// Original location.
        source: PathBuf,
        /// Location inside the quarantine directory.
        destination: PathBuf,
        /// BLAKE3 hash of the content, when it could be read.
        file_hash: Option<String>,
        /// Signature that caused the move, when known.
        signature: Option<String>,
    },

    /// A file could not be moved into quarantine.
    QuarantineFailed {
        /// File that stayed in place.
        path: PathBuf,
        /// Why.
        reason: String,
    },

    /// One monitor cycle finished.
    MonitorCycle {
        /// 1-based cycle number.
        cycle: u64,
        /// Infected files found in this cycle.
        infected: usize,
        /// Files moved in this cycle.
        quarantined: usize,
        /// Scan and move failures in this cycle.
        failed: usize,
    },
}

impl AuditEvent {
    /// Returns the event type name, as written to the log.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ScanStarted { .. } => "scan_started",
            Self::ScanFailed { .. } => "scan_failed",
            Self::FileInfected { .. } => "file_infected",
            Self::ScanCompleted { .. } => "scan_completed",
            Self::FileQuarantined { .. } => "file_quarantined",
            Self::QuarantineFailed { .. } => "quarantine_failed",
            Self::MonitorCycle { .. } => "monitor_cycle",
        }
    }

    /// Emits the event through `tracing` under the audit target.
    pub fn emit(&self) {
        match self {
            Self::ScanStarted { scan_id, root } => tracing::info!(
                target: "buddy_cleaner::audit",
                event_type = "scan_started",
                scan_id = %scan_id,
                root = %root.display(),
                "Scan started"
            ),
            Self::ScanFailed {
                scan_id,
                path,
                reason,
            } => tracing::warn!(
                target: "buddy_cleaner::audit",
                event_type = "scan_failed",
                scan_id = %scan_id,
                path = %path.display(),
                reason = %reason,
                "Error scanning file"
            ),
            Self::FileInfected {
                scan_id,
                path,
                signature,
            } => tracing::warn!(
                target: "buddy_cleaner::audit",
                event_type = "file_infected",
                scan_id = %scan_id,
                path = %path.display(),
                signature = %signature,
                "Infected file found"
            ),
            Self::ScanCompleted {
                scan_id,
                root,
                clean,
                infected,
                failed,
                duration_ms,
            } => tracing::info!(
                target: "buddy_cleaner::audit",
                event_type = "scan_completed",
                scan_id = %scan_id,
                root = %root.display(),
                clean,
                infected,
                failed,
                duration_ms,
                "Scan completed"
            ),
            Self::FileQuarantined {
                source,
                destination,
                file_hash,
                signature,
            } => tracing::info!(
                target: "buddy_cleaner::audit",
                event_type = "file_quarantined",
                source = %source.display(),
                destination = %destination.display(),
                file_hash_blake3 = ?file_hash,
                signature = ?signature,
                "File quarantined"
            ),
            Self::QuarantineFailed { path, reason } => tracing::error!(
                target: "buddy_cleaner::audit",
                event_type = "quarantine_failed",
                path = %path.display(),
                reason = %reason,
                "Error quarantining file"
            ),
            Self::MonitorCycle {
                cycle,
                infected,
                quarantined,
                failed,
            } => tracing::info!(
                target: "buddy_cleaner::audit",
                event_type = "monitor_cycle",
                cycle,
                infected,
                quarantined,
                failed,
                "Monitor cycle completed"
            ),
        }
    }
}

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,

    /// The event itself, flattened next to the timestamp.
    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditRecord {
    /// Stamps an event with the current time.
    pub fn now(event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_flat() {
        let record = AuditRecord::now(AuditEvent::QuarantineFailed {
            path: PathBuf::from("/srv/upload/a.exe"),
            reason: "permission denied".into(),
        });
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["event_type"], "quarantine_failed");
        assert_eq!(value["path"], "/srv/upload/a.exe");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_record_round_trips_through_json_line() {
        let record = AuditRecord::now(AuditEvent::MonitorCycle {
            cycle: 3,
            infected: 1,
            quarantined: 1,
            failed: 0,
        });
        let line = serde_json::to_string(&record).unwrap();
        let parsed: AuditRecord = serde_json::from_str(&line).unwrap();

        assert_eq!(parsed, record);
        assert_eq!(parsed.event.event_type(), "monitor_cycle");
    }
}
