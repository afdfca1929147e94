//! # Buddy Cleaner
//!
//! Walk a directory, have a ClamAV daemon judge every file, and move the
//! infected ones into a quarantine directory. The same pass can be repeated
//! on an interval for a bounded time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use buddy_cleaner::audit::AuditLog;
//! use buddy_cleaner::backends::ClamAvScanner;
//! use buddy_cleaner::{DirectoryScanner, FilesystemQuarantine, ScanClient};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let audit = Arc::new(AuditLog::open("buddy.log")?);
//!     let client = ScanClient::connect(ClamAvScanner::with_defaults()?).await?;
//!
//!     let report = DirectoryScanner::new(audit.clone())
//!         .scan(Path::new("/srv/uploads"), &client)
//!         .await;
//!
//!     let quarantine = FilesystemQuarantine::new("/srv/quarantine", audit)?;
//!     for outcome in quarantine.quarantine_report(&report).await {
//!         println!("{:?}", outcome);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: verdicts, reports, errors, and the `Scanner` trait
//! - **Backends**: clamd over a Unix or TCP socket, and a mock for tests
//! - **Client**: a verified session that turns scan errors into verdicts
//! - **Sweep**: the recursive directory walk
//! - **Quarantine**: moves infected files away
//! - **Monitor**: the bounded scan-and-quarantine loop
//! - **Audit**: JSON-lines record of detections, failures and moves

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod monitor;
pub mod quarantine;
pub mod sweep;

// Re-export commonly used types at the crate root
pub use crate::client::ScanClient;
pub use crate::config::Config;
pub use crate::core::{
    ConfigError, ConnectionError, Detection, FileHash, QuarantineError, ScanError, ScanFailure,
    ScanReport, ScanVerdict, Scanner,
};
pub use crate::monitor::{CycleReport, MonitorSession, MonitorSummary};
pub use crate::quarantine::{FilesystemQuarantine, QuarantineOutcome, QuarantineRecord};
pub use crate::sweep::DirectoryScanner;

/// Prelude module for convenient imports.
///
/// ```rust
/// use buddy_cleaner::prelude::*;
/// ```
pub mod prelude {
    pub use crate::audit::{AuditEvent, AuditLog};
    pub use crate::client::ScanClient;
    pub use crate::core::{ScanError, ScanReport, ScanVerdict, Scanner};
    pub use crate::monitor::{MonitorSession, MonitorSummary};
    pub use crate::quarantine::{FilesystemQuarantine, QuarantineOutcome};
    pub use crate::sweep::DirectoryScanner;
}
