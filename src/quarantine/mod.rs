//! Quarantine for infected files.
//!
//! Infected files are moved, not copied, into a flat directory. Every move
//! and every failed move is written to the audit log.

mod filesystem;
mod record;

pub use filesystem::FilesystemQuarantine;
pub use record::{QuarantineId, QuarantineOutcome, QuarantineRecord};
