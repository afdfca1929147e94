//! Recursive directory scanning.
//!
//! A sweep walks a directory tree with `walkdir`, sorted by file name so
//! the order of every report list is reproducible, and hands each regular
//! file to the [`ScanClient`]. Nothing short of the process dying aborts a
//! sweep: unreadable entries and failed scans are recorded and the walk
//! moves on.

use crate::audit::{AuditEvent, AuditLog};
use crate::client::ScanClient;
use crate::core::{ScanReport, ScanVerdict};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Walks directory trees and classifies every regular file in them.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    follow_symlinks: bool,
    excluded: Vec<PathBuf>,
    audit: Arc<AuditLog>,
}

impl DirectoryScanner {
    /// Creates a scanner that does not follow symbolic links.
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self {
            follow_symlinks: false,
            excluded: Vec::new(),
            audit,
        }
    }

    /// Follow symbolic links to files and directories.
    ///
    /// A followed link is reported under the path of its target, and each
    /// target is scanned once per pass. Link loops are recorded as failures.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Never descend into `dir`, e.g. a quarantine directory inside the
    /// scanned tree.
    pub fn excluding(mut self, dir: &Path) -> Self {
        let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        if !self.excluded.contains(&dir) {
            self.excluded.push(dir);
        }
        self
    }

    /// Returns whether symbolic links are followed.
    pub fn follows_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// Scans every regular file under `root`, one at a time.
    pub async fn scan(&self, root: &Path, client: &ScanClient) -> ScanReport {
        let start = Instant::now();
        let mut report = ScanReport::new(root);

        self.audit.record(AuditEvent::ScanStarted {
            scan_id: report.id.clone(),
            root: root.to_path_buf(),
        });

        match std::fs::metadata(root) {
            Ok(meta) if meta.is_dir() => self.walk(root, client, &mut report).await,
            Ok(_) => self.fail(&mut report, root.to_path_buf(), "not a directory".into()),
            Err(e) => self.fail(&mut report, root.to_path_buf(), e.to_string()),
        }

        let report = report.finish(start.elapsed());
        self.audit.record(AuditEvent::ScanCompleted {
            scan_id: report.id.clone(),
            root: report.root.clone(),
            clean: report.clean.len(),
            infected: report.infected.len(),
            failed: report.failures.len(),
            duration_ms: report.duration.as_millis() as u64,
        });
        report
    }

    /// Whether `path` (as yielded by the walk under `root`) lies in an
    /// excluded directory.
    fn is_excluded(&self, root: &Path, canonical_root: Option<&Path>, path: &Path) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        let resolved = match (canonical_root, path.strip_prefix(root)) {
            (Some(base), Ok(rel)) => base.join(rel),
            _ => path.to_path_buf(),
        };
        self.excluded.iter().any(|dir| resolved.starts_with(dir))
    }

    async fn walk(&self, root: &Path, client: &ScanClient, report: &mut ScanReport) {
        let canonical_root = std::fs::canonicalize(root).ok();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        let walker = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let skip = self.is_excluded(root, canonical_root.as_deref(), e.path());
                if skip {
                    tracing::debug!(path = %e.path().display(), "Skipping excluded directory");
                }
                !skip
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    self.fail(report, path, e.to_string());
                    continue;
                }
            };

            // With follow_links set, file_type() already describes the target.
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                tracing::debug!(path = %entry.path().display(), "Skipping symbolic link");
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let path = if self.follow_symlinks {
                let target = match std::fs::canonicalize(entry.path()) {
                    Ok(target) => target,
                    Err(e) => {
                        self.fail(report, entry.into_path(), e.to_string());
                        continue;
                    }
                };
                if !seen.insert(target.clone()) {
                    tracing::debug!(path = %entry.path().display(), "Already scanned through another path");
                    continue;
                }
                if entry.path_is_symlink() {
                    // Moving the link would leave the content in place.
                    target
                } else {
                    entry.into_path()
                }
            } else {
                entry.into_path()
            };

            let verdict = client.scan_file(&path).await;
            match &verdict {
                ScanVerdict::Clean => {
                    tracing::trace!(path = %path.display(), "File is clean");
                }
                ScanVerdict::Infected { signature } => {
                    self.audit.record(AuditEvent::FileInfected {
                        scan_id: report.id.clone(),
                        path: path.clone(),
                        signature: signature.clone(),
                    });
                }
                ScanVerdict::Error { reason } => {
                    self.audit.record(AuditEvent::ScanFailed {
                        scan_id: report.id.clone(),
                        path: path.clone(),
                        reason: reason.clone(),
                    });
                }
            }
            report.record(path, verdict);
        }
    }

    fn fail(&self, report: &mut ScanReport, path: PathBuf, reason: String) {
        self.audit.record(AuditEvent::ScanFailed {
            scan_id: report.id.clone(),
            path: path.clone(),
            reason: reason.clone(),
        });
        report.record_failure(path, reason);
    }
}
