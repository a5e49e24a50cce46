use crate::sync::SyncError;

/// Configuration for a sync session
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// First height the session is responsible for
	pub start_index: u64,
	/// Number of heights checked per range query when planning work
	pub batch_size: u64,
	/// Log progress every N heights
	pub log_interval: u64,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			start_index: 0,
			batch_size: 1000,
			log_interval: 1000,
		}
	}
}

impl SyncConfig {
	pub fn validate(&self) -> Result<(), SyncError> {
		if self.batch_size == 0 {
			return Err(SyncError::ConfigError("batch_size must be positive".to_string()));
		}
		if self.log_interval == 0 {
			return Err(SyncError::ConfigError("log_interval must be positive".to_string()));
		}
		Ok(())
	}
}
