//! Moves infected files into a quarantine directory.

use crate::audit::{AuditEvent, AuditLog};
use crate::core::error::QuarantineError;
use crate::core::{FileHasher, ScanReport};
use crate::quarantine::record::{QuarantineId, QuarantineOutcome, QuarantineRecord};

use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Flat quarantine directory.
///
/// Each file keeps only its base name:
///
/// ```text
/// quarantine/
/// ├── invoice.pdf.exe
/// └── eicar.com
/// ```
///
/// Two files with the same base name collide and the later move overwrites
/// the earlier one. This is a known limitation of the layout.
#[derive(Debug)]
pub struct FilesystemQuarantine {
    dir: PathBuf,
    hasher: FileHasher,
    audit: Arc<AuditLog>,
}

impl FilesystemQuarantine {
    /// Opens the quarantine directory, creating it (and its parents) if
    /// needed.
    pub fn new(dir: impl Into<PathBuf>, audit: Arc<AuditLog>) -> Result<Self, QuarantineError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| QuarantineError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        Ok(Self {
            dir,
            hasher: FileHasher::new(),
            audit,
        })
    }

    /// Returns the quarantine directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `path` would land in quarantine.
    pub fn destination_for(&self, path: &Path) -> Result<PathBuf, QuarantineError> {
        let name = path.file_name().ok_or_else(|| QuarantineError::NoFileName {
            path: path.to_path_buf(),
        })?;
        Ok(self.dir.join(name))
    }

    /// Moves each path into quarantine, in order.
    ///
    /// A failed move is recorded in its outcome and does not stop the rest.
    pub async fn quarantine<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<QuarantineOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            outcomes.push(self.quarantine_one(path.as_ref(), None).await);
        }
        outcomes
    }

    /// Moves every infected file of `report`, keeping its signature.
    pub async fn quarantine_report(&self, report: &ScanReport) -> Vec<QuarantineOutcome> {
        let mut outcomes = Vec::with_capacity(report.infected.len());
        for detection in &report.infected {
            outcomes.push(
                self.quarantine_one(&detection.path, Some(&detection.signature))
                    .await,
            );
        }
        outcomes
    }

    async fn quarantine_one(&self, path: &Path, signature: Option<&str>) -> QuarantineOutcome {
        match self.move_into_quarantine(path, signature).await {
            Ok(record) => {
                self.audit.record(AuditEvent::FileQuarantined {
                    source: record.original_path.clone(),
                    destination: record.destination.clone(),
                    file_hash: record.file_hash.as_ref().map(|h| h.blake3.clone()),
                    signature: record.signature.clone(),
                });
                QuarantineOutcome::Moved(record)
            }
            Err(e) => {
                let reason = e.to_string();
                self.audit.record(AuditEvent::QuarantineFailed {
                    path: path.to_path_buf(),
                    reason: reason.clone(),
                });
                QuarantineOutcome::Failed {
                    path: path.to_path_buf(),
                    reason,
                }
            }
        }
    }

    async fn move_into_quarantine(
        &self,
        path: &Path,
        signature: Option<&str>,
    ) -> Result<QuarantineRecord, QuarantineError> {
        let destination = self.destination_for(path)?;

        let file_hash = match self.hasher.hash_file(path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Could not hash file before move");
                None
            }
        };

        move_file(path, &destination).await?;

        Ok(QuarantineRecord {
            id: QuarantineId::new(),
            original_path: path.to_path_buf(),
            destination,
            file_hash,
            signature: signature.map(str::to_string),
            quarantined_at: Utc::now(),
        })
    }
}

/// Renames `from` to `to`, copying across file systems when needed.
///
/// On failure `from` is left in place.
async fn move_file(from: &Path, to: &Path) -> Result<(), QuarantineError> {
    let failed = |reason: String| QuarantineError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        reason,
    };

    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            tracing::debug!(
                from = %from.display(),
                to = %to.display(),
                "Rename crosses file systems, copying instead"
            );
            tokio::fs::copy(from, to)
                .await
                .map_err(|e| failed(e.to_string()))?;

            if let Err(e) = tokio::fs::remove_file(from).await {
                let _ = tokio::fs::remove_file(to).await;
                return Err(failed(format!("copied but could not remove source: {}", e)));
            }
            Ok(())
        }
        Err(e) => Err(failed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScanVerdict;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_new_creates_directory() {
        let dir = TempDir::new().unwrap();
        let qdir = dir.path().join("deep").join("quarantine");
        assert!(!qdir.exists());

        let quarantine = FilesystemQuarantine::new(&qdir, Arc::new(AuditLog::disabled())).unwrap();
        assert!(qdir.is_dir());
        assert_eq!(quarantine.dir(), qdir.as_path());
    }

    #[tokio::test]
    async fn test_new_fails_when_path_is_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        write(&blocker, b"x");

        let err = FilesystemQuarantine::new(blocker.join("q"), Arc::new(AuditLog::disabled()))
            .unwrap_err();
        assert!(matches!(err, QuarantineError::CreateDir { .. }));
    }

    #[tokio::test]
    async fn test_moves_files_and_records_hash() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("incoming").join("INFECTED.exe");
        write(&src, b"payload");

        let audit = Arc::new(AuditLog::in_memory());
        let quarantine = FilesystemQuarantine::new(dir.path().join("q"), audit.clone()).unwrap();
        let outcomes = quarantine.quarantine(&[&src]).await;

        assert_eq!(outcomes.len(), 1);
        let QuarantineOutcome::Moved(record) = &outcomes[0] else {
            panic!("expected a move, got {:?}", outcomes[0]);
        };
        assert!(!src.exists());
        assert_eq!(record.destination, dir.path().join("q").join("INFECTED.exe"));
        assert_eq!(std::fs::read(&record.destination).unwrap(), b"payload");
        assert_eq!(
            record.file_hash.as_ref().unwrap(),
            &FileHasher::new().hash_bytes(b"payload")
        );
        assert_eq!(audit.events()[0].event_type(), "file_quarantined");
    }

    #[tokio::test]
    async fn test_missing_source_fails_without_stopping() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("gone.exe");
        let present = dir.path().join("present.exe");
        write(&present, b"x");

        let audit = Arc::new(AuditLog::in_memory());
        let quarantine = FilesystemQuarantine::new(dir.path().join("q"), audit.clone()).unwrap();
        let outcomes = quarantine.quarantine(&[&gone, &present]).await;

        assert!(!outcomes[0].is_moved());
        assert_eq!(outcomes[0].path(), gone.as_path());
        assert!(outcomes[0].destination().is_none());
        assert!(outcomes[1].is_moved());
        assert!(!present.exists());

        let kinds: Vec<_> = audit.events().iter().map(|e| e.event_type()).collect();
        assert_eq!(kinds, vec!["quarantine_failed", "file_quarantined"]);
    }

    #[tokio::test]
    async fn test_base_name_collision_keeps_last() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a").join("dup.exe");
        let second = dir.path().join("b").join("dup.exe");
        write(&first, b"first");
        write(&second, b"second");

        let qdir = dir.path().join("q");
        let quarantine = FilesystemQuarantine::new(&qdir, Arc::new(AuditLog::disabled())).unwrap();
        let outcomes = quarantine.quarantine(&[&first, &second]).await;

        assert!(outcomes.iter().all(QuarantineOutcome::is_moved));
        let survivors: Vec<_> = std::fs::read_dir(&qdir).unwrap().collect();
        assert_eq!(survivors.len(), 1);
        assert_eq!(std::fs::read(qdir.join("dup.exe")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_quarantine_report_keeps_signatures() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("eicar.com");
        write(&src, b"X5O!");

        let mut report = ScanReport::new(dir.path());
        report.record(src.clone(), ScanVerdict::infected("Eicar-Test-Signature"));
        report.record(dir.path().join("clean.txt"), ScanVerdict::Clean);

        let quarantine =
            FilesystemQuarantine::new(dir.path().join("q"), Arc::new(AuditLog::disabled())).unwrap();
        let outcomes = quarantine.quarantine_report(&report).await;

        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            QuarantineOutcome::Moved(record) => {
                assert_eq!(record.signature.as_deref(), Some("Eicar-Test-Signature"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
