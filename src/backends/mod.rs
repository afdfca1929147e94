//! Scanning backend implementations.
//!
//! This module contains implementations of the `Scanner` trait.
//!
//! ## Available Backends
//!
//! - [`mock`] - A name-based mock scanner for testing
//! - [`clamav`] - ClamAV via the clamd socket protocol

pub mod clamav;
pub mod mock;

// Re-exports
pub use clamav::{ClamAvConfig, ClamAvScanner, ClamdEndpoint, TransferMode};
pub use mock::MockScanner;
