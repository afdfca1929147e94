//! Bounded periodic scan-and-quarantine loop.
//!
//! A session scans its target, quarantines whatever was found, then sleeps
//! until the next cycle. The first cycle always runs; after every cycle the
//! deadline is checked, and a sleep never runs past it.

use crate::audit::{AuditEvent, AuditLog};
use crate::client::ScanClient;
use crate::core::ScanReport;
use crate::quarantine::{FilesystemQuarantine, QuarantineOutcome};
use crate::sweep::DirectoryScanner;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Default pause between two cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// What happened in one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    /// The directory pass.
    pub scan: ScanReport,
    /// Moves attempted for the infected files of `scan`.
    pub quarantined: Vec<QuarantineOutcome>,
}

impl CycleReport {
    /// Number of files moved.
    pub fn moved(&self) -> usize {
        self.quarantined.iter().filter(|o| o.is_moved()).count()
    }

    /// Scan failures plus failed moves.
    pub fn failed(&self) -> usize {
        self.scan.failures.len() + (self.quarantined.len() - self.moved())
    }
}

/// Totals over a whole session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorSummary {
    /// Cycles run.
    pub cycles: u64,
    /// Files that reached a verdict, summed over cycles.
    pub files_scanned: usize,
    /// Infected files found, summed over cycles.
    pub infected: usize,
    /// Files moved into quarantine.
    pub quarantined: usize,
    /// Scan failures and failed moves.
    pub failures: usize,
    /// Whether a shutdown signal ended the session early.
    pub interrupted: bool,
}

impl MonitorSummary {
    fn absorb(&mut self, cycle: &CycleReport) {
        self.cycles += 1;
        self.files_scanned += cycle.scan.scanned_count();
        self.infected += cycle.scan.infected.len();
        self.quarantined += cycle.moved();
        self.failures += cycle.failed();
    }
}

/// One `monitor` invocation.
#[derive(Debug)]
pub struct MonitorSession {
    target: PathBuf,
    duration: Duration,
    interval: Duration,
    client: ScanClient,
    sweeper: DirectoryScanner,
    quarantine: FilesystemQuarantine,
    audit: Arc<AuditLog>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl MonitorSession {
    /// Creates a session that watches `target` for `duration`.
    ///
    /// The quarantine directory is left out of every sweep, so files already
    /// moved there are not found again when it lies inside `target`.
    pub fn new(
        target: impl Into<PathBuf>,
        duration: Duration,
        client: ScanClient,
        sweeper: DirectoryScanner,
        quarantine: FilesystemQuarantine,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            target: target.into(),
            duration,
            interval: DEFAULT_INTERVAL,
            client,
            sweeper: sweeper.excluding(quarantine.dir()),
            quarantine,
            audit,
            shutdown: None,
        }
    }

    /// Sets the pause between cycles.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stops the session when `shutdown` turns `true`.
    ///
    /// The signal interrupts a sleep; a cycle in progress is finished first.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Directory being watched.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Pause between cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs cycles until the deadline passes, calling `on_cycle` after each.
    pub async fn run<F>(&mut self, mut on_cycle: F) -> MonitorSummary
    where
        F: FnMut(&CycleReport),
    {
        // A duration past the clock's range means "until shut down".
        let deadline = Instant::now().checked_add(self.duration);
        let mut summary = MonitorSummary::default();

        tracing::info!(
            directory = %self.target.display(),
            quarantine = %self.quarantine.dir().display(),
            duration_secs = self.duration.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Monitoring started"
        );

        loop {
            let cycle = self.cycle(summary.cycles + 1).await;
            summary.absorb(&cycle);
            on_cycle(&cycle);

            let now = Instant::now();
            let nap = match deadline {
                Some(deadline) if now >= deadline => break,
                Some(deadline) => self.interval.min(deadline - now),
                None => self.interval,
            };
            if self.sleep(nap).await {
                tracing::info!(cycles = summary.cycles, "Monitoring interrupted");
                summary.interrupted = true;
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }
        }

        tracing::info!(
            cycles = summary.cycles,
            infected = summary.infected,
            quarantined = summary.quarantined,
            "Monitoring finished"
        );
        summary
    }

    async fn cycle(&self, number: u64) -> CycleReport {
        tracing::debug!(cycle = number, "Starting monitor cycle");
        let scan = self.sweeper.scan(&self.target, &self.client).await;
        let quarantined = if scan.has_infections() {
            self.quarantine.quarantine_report(&scan).await
        } else {
            Vec::new()
        };

        let cycle = CycleReport {
            cycle: number,
            scan,
            quarantined,
        };
        self.audit.record(AuditEvent::MonitorCycle {
            cycle: number,
            infected: cycle.scan.infected.len(),
            quarantined: cycle.moved(),
            failed: cycle.failed(),
        });
        cycle
    }

    /// Sleeps for `duration`. Returns `true` if shutdown was requested.
    async fn sleep(&mut self, duration: Duration) -> bool {
        let wake = Instant::now().checked_add(duration);
        let nap = async move {
            match wake {
                Some(wake) => tokio::time::sleep_until(wake).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(nap);

        if let Some(shutdown) = self.shutdown.as_mut() {
            loop {
                if *shutdown.borrow_and_update() {
                    return true;
                }
                tokio::select! {
                    _ = &mut nap => return false,
                    changed = shutdown.changed() => {
                        // Sender gone: nobody can ask us to stop any more.
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        nap.await;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockScanner;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        audit: Arc<AuditLog>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::create_dir(dir.path().join("watch")).unwrap();
            Self {
                dir,
                audit: Arc::new(AuditLog::in_memory()),
            }
        }

        fn watch_dir(&self) -> PathBuf {
            self.dir.path().join("watch")
        }

        fn quarantine_dir(&self) -> PathBuf {
            self.dir.path().join("quarantine")
        }

        async fn session(&self, duration: Duration) -> MonitorSession {
            let client = ScanClient::connect(MockScanner::new()).await.unwrap();
            MonitorSession::new(
                self.watch_dir(),
                duration,
                client,
                DirectoryScanner::new(self.audit.clone()),
                FilesystemQuarantine::new(self.quarantine_dir(), self.audit.clone()).unwrap(),
                self.audit.clone(),
            )
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_runs_one_cycle() {
        let fx = Fixture::new();
        std::fs::write(fx.watch_dir().join("INFECTED.bin"), b"x").unwrap();

        let mut calls = 0;
        let summary = fx.session(Duration::ZERO).await.run(|_| calls += 1).await;

        assert_eq!(summary.cycles, 1);
        assert_eq!(calls, 1);
        assert_eq!(summary.quarantined, 1);
        assert!(fx.quarantine_dir().join("INFECTED.bin").exists());
        assert!(!fx.watch_dir().join("INFECTED.bin").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_count_and_no_sleep_past_deadline() {
        let fx = Fixture::new();
        let start = Instant::now();

        let summary = fx
            .session(Duration::from_secs(150))
            .await
            .with_interval(Duration::from_secs(60))
            .run(|_| {})
            .await;

        // Cycles at 0s, 60s and 120s; the last sleep is cut to 30s.
        assert_eq!(summary.cycles, 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(150));
        assert!(elapsed < Duration::from_secs(151));
        assert!(!summary.interrupted);

        let cycles = fx
            .audit
            .events()
            .iter()
            .filter(|e| e.event_type() == "monitor_cycle")
            .count();
        assert_eq!(cycles, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_on_interval_boundary() {
        let fx = Fixture::new();
        let summary = fx
            .session(Duration::from_secs(120))
            .await
            .run(|_| {})
            .await;
        assert_eq!(summary.cycles, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_cycle_picks_up_new_infections() {
        let fx = Fixture::new();
        std::fs::write(fx.watch_dir().join("notes.txt"), b"ok").unwrap();
        let late = fx.watch_dir().join("late-INFECTED.exe");

        let mut seen = Vec::new();
        let summary = fx
            .session(Duration::from_secs(90))
            .await
            .run(|cycle| {
                seen.push(cycle.scan.infected.len());
                if cycle.cycle == 1 {
                    std::fs::write(&late, b"payload").unwrap();
                }
            })
            .await;

        assert_eq!(summary.cycles, 2);
        assert_eq!(seen, vec![0, 1]);
        assert_eq!(summary.files_scanned, 3);
        assert_eq!(summary.quarantined, 1);
        assert!(fx.quarantine_dir().join("late-INFECTED.exe").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_sleep() {
        let fx = Fixture::new();
        let (tx, rx) = watch::channel(false);
        let start = Instant::now();

        let summary = fx
            .session(Duration::from_secs(3600))
            .await
            .with_shutdown(rx)
            .run(|_| {
                tx.send(true).unwrap();
            })
            .await;

        assert_eq!(summary.cycles, 1);
        assert!(summary.interrupted);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_duration_runs_until_shutdown() {
        let fx = Fixture::new();
        let (tx, rx) = watch::channel(false);

        let summary = fx
            .session(Duration::from_secs(u64::MAX))
            .await
            .with_shutdown(rx)
            .run(|cycle| {
                if cycle.cycle == 2 {
                    tx.send(true).unwrap();
                }
            })
            .await;

        assert_eq!(summary.cycles, 2);
        assert!(summary.interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_is_interruptible() {
        let fx = Fixture::new();
        let (tx, rx) = watch::channel(false);

        let summary = fx
            .session(Duration::MAX)
            .await
            .with_interval(Duration::MAX)
            .with_shutdown(rx)
            .run(|_| {
                tx.send(true).unwrap();
            })
            .await;

        assert_eq!(summary.cycles, 1);
        assert!(summary.interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quarantine_inside_target_is_not_rescanned() {
        let fx = Fixture::new();
        std::fs::write(fx.watch_dir().join("INFECTED.bin"), b"x").unwrap();
        let inner = fx.watch_dir().join("quarantine");

        let client = ScanClient::connect(MockScanner::new()).await.unwrap();
        let mut session = MonitorSession::new(
            fx.watch_dir(),
            Duration::from_secs(150),
            client,
            DirectoryScanner::new(fx.audit.clone()),
            FilesystemQuarantine::new(&inner, fx.audit.clone()).unwrap(),
            fx.audit.clone(),
        );
        let summary = session.run(|_| {}).await;

        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.infected, 1);
        assert_eq!(summary.quarantined, 1);
        assert!(inner.join("INFECTED.bin").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_shutdown_sender_keeps_running() {
        let fx = Fixture::new();
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let summary = fx
            .session(Duration::from_secs(90))
            .await
            .with_shutdown(rx)
            .run(|_| {})
            .await;

        assert_eq!(summary.cycles, 2);
        assert!(!summary.interrupted);
    }
}
