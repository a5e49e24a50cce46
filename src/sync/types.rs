use crate::marker::MarkerError;

use serde::{Deserialize, Serialize};

/// Errors raised while tracking or persisting sync progress
#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Marker error: {0}")]
	MarkerError(#[from] MarkerError),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Configuration error: {0}")]
	ConfigError(String),

	#[error("Sync error: {0}")]
	SyncError(String),
}

/// Metadata written next to a persisted marker state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStateMetadata {
	pub sync_height: u64,
	pub timestamp: String,
	pub range_count: usize,
	pub inverted: bool,
}
