//!
//! Utility module for the index marker.
//!
//! Re-exports formatting helpers used in logs and command output.
/// Formatting helpers for index ranges
pub mod index;

pub use index::format_ranges;
