//! Append-only audit log.
//!
//! Every scan failure, detection, move and move failure is written as one
//! JSON line to the audit file and mirrored to `tracing` under the
//! `buddy_cleaner::audit` target. The log is an ordinary value created by
//! the caller and handed to each component; nothing here is global.

mod events;

pub use events::{AuditEvent, AuditRecord};

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
enum Sink {
    Disabled,
    File { path: PathBuf, file: Mutex<File> },
    Memory(Mutex<Vec<AuditRecord>>),
}

/// Destination for audit events.
///
/// Writing never fails from the caller's point of view: an event that
/// cannot be appended is reported through `tracing` and dropped.
#[derive(Debug)]
pub struct AuditLog {
    sink: Sink,
}

impl AuditLog {
    /// Opens (or creates) an audit file for appending.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            sink: Sink::File {
                path,
                file: Mutex::new(file),
            },
        })
    }

    /// An audit log that only mirrors events to `tracing`.
    pub fn disabled() -> Self {
        Self {
            sink: Sink::Disabled,
        }
    }

    /// An audit log that keeps events in memory, for tests.
    pub fn in_memory() -> Self {
        Self {
            sink: Sink::Memory(Mutex::new(Vec::new())),
        }
    }

    /// Path of the audit file, if writing to one.
    pub fn path(&self) -> Option<&Path> {
        match &self.sink {
            Sink::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Records an event.
    pub fn record(&self, event: AuditEvent) {
        event.emit();
        let record = AuditRecord::now(event);

        match &self.sink {
            Sink::Disabled => {}
            Sink::File { path, file } => {
                let line = match serde_json::to_string(&record) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to serialize audit event");
                        return;
                    }
                };
                let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
                if let Err(e) = writeln!(file, "{}", line) {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to append to audit log"
                    );
                }
            }
            Sink::Memory(records) => records
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(record),
        }
    }

    /// Events captured by an in-memory log, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        match &self.sink {
            Sink::Memory(records) => records
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .map(|r| r.event.clone())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_log_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("buddy.log");

        let log = AuditLog::open(&path).unwrap();
        log.record(AuditEvent::ScanStarted {
            scan_id: "s1".into(),
            root: PathBuf::from("/srv"),
        });
        drop(log);

        // Reopening appends instead of truncating.
        let log = AuditLog::open(&path).unwrap();
        log.record(AuditEvent::QuarantineFailed {
            path: PathBuf::from("/srv/x"),
            reason: "denied".into(),
        });
        assert_eq!(log.path(), Some(path.as_path()));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<AuditRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].event.event_type(), "scan_started");
        assert_eq!(lines[1].event.event_type(), "quarantine_failed");
    }

    #[test]
    fn test_in_memory_log() {
        let log = AuditLog::in_memory();
        log.record(AuditEvent::MonitorCycle {
            cycle: 1,
            infected: 0,
            quarantined: 0,
            failed: 0,
        });
        assert_eq!(log.events().len(), 1);
        assert!(AuditLog::disabled().events().is_empty());
    }
}
