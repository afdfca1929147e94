//! Command-line interface of the `buddy` binary.

use crate::backends::TransferMode;
use crate::config::Config;
use crate::core::{ConfigError, ScanReport};
use crate::monitor::{CycleReport, MonitorSummary};
use crate::quarantine::QuarantineOutcome;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scan directories with ClamAV and quarantine what it finds.
#[derive(Parser, Debug)]
#[command(name = "buddy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// What to do.
    #[command(subcommand)]
    pub command: Command,

    /// YAML configuration file.
    #[arg(long, global = true, env = "BUDDY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the clamd Unix socket.
    #[arg(long, global = true, conflicts_with = "tcp", env = "BUDDY_CLAMD_SOCKET")]
    pub socket: Option<PathBuf>,

    /// host:port of a clamd TCP listener.
    #[arg(long, global = true)]
    pub tcp: Option<String>,

    /// How files reach clamd: `stream` uploads them, `path` lets clamd read them.
    #[arg(long, global = true)]
    pub transfer: Option<TransferMode>,

    /// Append audit events to this file [default: buddy.log].
    #[arg(long, global = true)]
    pub audit_log: Option<PathBuf>,

    /// Seconds between monitor cycles [default: 60].
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Follow symbolic links while walking.
    #[arg(long, global = true)]
    pub follow_symlinks: bool,

    /// Print reports as JSON.
    #[arg(long, global = true)]
    pub json: bool,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scan a directory for viruses.
    Scan {
        /// Directory to scan.
        directory: PathBuf,
    },

    /// Scan a directory and move infected files into quarantine.
    Quarantine {
        /// Directory to scan.
        directory: PathBuf,
        /// Where infected files go. Created if missing.
        quarantine_directory: PathBuf,
    },

    /// Scan and quarantine repeatedly for a bounded time.
    Monitor {
        /// Directory to watch.
        directory: PathBuf,
        /// How long to keep watching, in seconds.
        duration_seconds: u64,
        /// Where infected files go. Created if missing.
        quarantine_directory: PathBuf,
    },
}

impl Cli {
    /// Loads the configuration file, if any, and applies command-line overrides.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(socket) = &self.socket {
            config.clamd.socket_path = Some(socket.clone());
            config.clamd.tcp_address = None;
        }
        if let Some(tcp) = &self.tcp {
            config.clamd.tcp_address = Some(tcp.clone());
        }
        if let Some(transfer) = self.transfer {
            config.clamd.transfer = transfer;
        }
        if let Some(path) = &self.audit_log {
            config.audit.log_path = path.clone();
            config.audit.enabled = true;
        }
        if let Some(interval) = self.interval {
            config.monitor.interval_secs = interval;
        }
        if self.follow_symlinks {
            config.scan.follow_symlinks = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Prints the result of a directory pass.
pub fn print_scan(report: &ScanReport) {
    if report.has_infections() {
        println!("{} infected file(s) found:", report.infected.len());
        for detection in &report.infected {
            println!("{} ({})", detection.path.display(), detection.signature);
        }
    } else {
        println!("No infected files found.");
    }
    for failure in &report.failures {
        eprintln!("Error scanning {}: {}", failure.path.display(), failure.reason);
    }
    println!("{} clean file(s) scanned.", report.clean.len());
}

/// Prints the result of each move.
pub fn print_quarantine(outcomes: &[QuarantineOutcome]) {
    for outcome in outcomes {
        match outcome {
            QuarantineOutcome::Moved(record) => println!(
                "Infected file moved to quarantine: {}",
                record.original_path.display()
            ),
            QuarantineOutcome::Failed { path, reason } => {
                eprintln!("Error quarantining {}: {}", path.display(), reason)
            }
        }
    }
}

/// Prints one monitor cycle.
pub fn print_cycle(cycle: &CycleReport) {
    println!("Cycle {}:", cycle.cycle);
    if cycle.scan.has_infections() {
        println!("Infected file(s) found:");
        for detection in &cycle.scan.infected {
            println!("{}", detection.path.display());
        }
        print_quarantine(&cycle.quarantined);
    } else {
        println!("No infected files found.");
    }
    for failure in &cycle.scan.failures {
        eprintln!("Error scanning {}: {}", failure.path.display(), failure.reason);
    }
}

/// Prints the end-of-session totals.
pub fn print_summary(summary: &MonitorSummary) {
    println!(
        "Monitoring finished after {} cycle(s): {} file(s) scanned, {} infected, {} quarantined, {} failure(s).",
        summary.cycles,
        summary.files_scanned,
        summary.infected,
        summary.quarantined,
        summary.failures
    );
    if summary.interrupted {
        println!("Monitoring was interrupted.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ClamdEndpoint;
    use clap::error::ErrorKind;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("buddy").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_commands() {
        let cli = parse(&["scan", "/srv"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Scan {
                directory: "/srv".into()
            }
        );

        let cli = parse(&["quarantine", "/srv", "/q"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Quarantine {
                directory: "/srv".into(),
                quarantine_directory: "/q".into()
            }
        );

        let cli = parse(&["monitor", "/srv", "300", "/q", "--interval", "5"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Monitor {
                directory: "/srv".into(),
                duration_seconds: 300,
                quarantine_directory: "/q".into()
            }
        );
        assert_eq!(cli.interval, Some(5));
    }

    #[test]
    fn test_usage_errors() {
        assert!(parse(&[]).unwrap_err().use_stderr());
        assert!(parse(&["scan"]).unwrap_err().use_stderr());
        assert!(parse(&["quarantine", "/srv"]).unwrap_err().use_stderr());
        assert!(parse(&["monitor", "/srv", "soon", "/q"]).unwrap_err().use_stderr());
        assert!(parse(&["extract", "file"]).unwrap_err().use_stderr());
        assert!(parse(&["scan", "/srv", "--socket", "/s", "--tcp", "h:1"])
            .unwrap_err()
            .use_stderr());
        assert!(parse(&["scan", "/srv", "--transfer", "carrier-pigeon"])
            .unwrap_err()
            .use_stderr());
    }

    #[test]
    fn test_help_is_not_an_error() {
        let err = parse(&["help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert!(!err.use_stderr());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("buddy.yaml");
        std::fs::write(
            &path,
            "clamd:\n  tcp_address: \"10.0.0.1:3310\"\nmonitor:\n  interval_secs: 30\n",
        )
        .unwrap();
        let config_arg = path.to_str().unwrap();

        let cli = parse(&["scan", "/srv", "--config", config_arg]).unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.endpoint().unwrap(), ClamdEndpoint::Tcp("10.0.0.1:3310".into()));
        assert_eq!(config.monitor.interval_secs, 30);

        let cli = parse(&[
            "scan",
            "/srv",
            "--config",
            config_arg,
            "--socket",
            "/run/clamd.sock",
            "--transfer",
            "path",
            "--interval",
            "10",
            "--follow-symlinks",
            "--audit-log",
            "/tmp/audit.log",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(
            config.endpoint().unwrap(),
            ClamdEndpoint::Unix("/run/clamd.sock".into())
        );
        assert_eq!(config.clamd.transfer, TransferMode::Path);
        assert_eq!(config.monitor.interval_secs, 10);
        assert!(config.scan.follow_symlinks);
        assert_eq!(config.audit.log_path, PathBuf::from("/tmp/audit.log"));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let cli = parse(&["scan", "/srv", "--interval", "0"]).unwrap();
        assert!(matches!(cli.load_config(), Err(ConfigError::Invalid(_))));
    }
}
