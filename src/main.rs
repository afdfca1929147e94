//! `buddy`: scan a directory with ClamAV, quarantine infected files, or
//! keep watching a directory for a while.

use anyhow::{Context, Result};
use buddy_cleaner::audit::AuditLog;
use buddy_cleaner::backends::ClamAvScanner;
use buddy_cleaner::cli::{self, Cli, Command};
use buddy_cleaner::{Config, DirectoryScanner, FilesystemQuarantine, MonitorSession, ScanClient};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Help and version go to stdout and are not failures.
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config().context("Invalid configuration")?;
    let audit = Arc::new(open_audit(&config)?);

    let scanner = ClamAvScanner::new(config.to_clamav_config()?)?;
    let client = ScanClient::connect(scanner)
        .await
        .context("Failed to initialize ClamAV")?;

    let sweeper = DirectoryScanner::new(audit.clone())
        .with_follow_symlinks(config.scan.follow_symlinks);

    match &cli.command {
        Command::Scan { directory } => {
            if !cli.json {
                println!("Scanning directory for viruses...");
            }
            let report = sweeper.scan(directory, &client).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                cli::print_scan(&report);
            }
        }

        Command::Quarantine {
            directory,
            quarantine_directory,
        } => {
            let quarantine = FilesystemQuarantine::new(quarantine_directory, audit.clone())?;
            if !cli.json {
                println!("Scanning directory for viruses...");
            }
            let report = sweeper.scan(directory, &client).await;
            let outcomes = quarantine.quarantine_report(&report).await;

            if cli.json {
                let output = serde_json::json!({ "report": report, "quarantine": outcomes });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                if report.has_infections() {
                    println!("Quarantining infected files...");
                    cli::print_quarantine(&outcomes);
                }
                cli::print_scan(&report);
            }
        }

        Command::Monitor {
            directory,
            duration_seconds,
            quarantine_directory,
        } => {
            let quarantine = FilesystemQuarantine::new(quarantine_directory, audit.clone())?;

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, stopping after the current cycle");
                    let _ = shutdown_tx.send(true);
                }
            });

            let json = cli.json;
            let mut session = MonitorSession::new(
                directory,
                Duration::from_secs(*duration_seconds),
                client,
                sweeper,
                quarantine,
                audit.clone(),
            )
            .with_interval(config.monitor_interval())
            .with_shutdown(shutdown_rx);

            let summary = session
                .run(|cycle| {
                    if json {
                        match serde_json::to_string(cycle) {
                            Ok(line) => println!("{}", line),
                            Err(e) => tracing::warn!(error = %e, "Failed to serialize cycle"),
                        }
                    } else {
                        cli::print_cycle(cycle);
                    }
                })
                .await;

            if json {
                println!("{}", serde_json::to_string(&summary)?);
            } else {
                cli::print_summary(&summary);
            }
        }
    }

    Ok(())
}

fn open_audit(config: &Config) -> Result<AuditLog> {
    if !config.audit.enabled {
        return Ok(AuditLog::disabled());
    }
    AuditLog::open(&config.audit.log_path).with_context(|| {
        format!(
            "Failed to open audit log {}",
            config.audit.log_path.display()
        )
    })
}
