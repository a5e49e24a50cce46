//! State persistence service for index synchronization.
//!
//! This module provides the `StatePersistenceService`, which saves and restores marker states
//! and rolling checkpoints. Repository traits hide the file layout, so sync sessions can be
//! resumed after a restart.
//!
//! The service only ever sees owned [`MarkerState`] snapshots, never a live marker.

use crate::marker::{IndexMarker, MarkerState, MarkerStateHandle};
use crate::sync::SyncError;
use crate::sync::repositories::{
	CheckpointRepository, FileCheckpointRepository, FileMarkerStateRepository,
	MarkerStateRepository,
};

use std::path::PathBuf;
use tracing::{debug, info};

/// Service for managing state persistence operations.
pub struct StatePersistenceService {
	marker_repo: Box<dyn MarkerStateRepository + Send + Sync>,
	checkpoint_repo: Box<dyn CheckpointRepository + Send + Sync>,
}

impl StatePersistenceService {
	/// Create a new state persistence service for the given data directory.
	pub fn new(data_dir: PathBuf) -> Self {
		Self {
			marker_repo: Box::new(FileMarkerStateRepository::new(data_dir.clone())),
			checkpoint_repo: Box::new(FileCheckpointRepository::new(data_dir)),
		}
	}

	/// Create a service on top of custom repositories.
	pub fn with_repositories(
		marker_repo: Box<dyn MarkerStateRepository + Send + Sync>,
		checkpoint_repo: Box<dyn CheckpointRepository + Send + Sync>,
	) -> Self {
		Self {
			marker_repo,
			checkpoint_repo,
		}
	}

	/// Save a marker state under `name` at the given height.
	pub async fn save_marker(
		&self,
		name: &str,
		state: &MarkerState,
		height: u64,
	) -> Result<(), SyncError> {
		self.marker_repo.save(name, state, height).await
	}

	/// Restore the marker saved under `name`, returning it with its height if available.
	pub async fn restore_marker(&self, name: &str) -> Result<Option<(IndexMarker, u64)>, SyncError> {
		let restored = self.marker_repo.load(name).await?;

		Ok(restored.map(|(state, height)| {
			info!(
				"Restored marker {:?} with {} ranges from height {}",
				name,
				state.ranges().len(),
				height
			);
			(IndexMarker::with_state(MarkerStateHandle::from_state(state)), height)
		}))
	}

	/// Save a checkpoint of the marker state at the given height.
	pub async fn save_checkpoint(&self, state: &MarkerState, height: u64) -> Result<(), SyncError> {
		self.checkpoint_repo.save(state, height).await
	}

	/// Find and load the latest checkpoint, returning the state and height if found.
	pub async fn load_latest_checkpoint(&self) -> Result<Option<(MarkerState, u64)>, SyncError> {
		if let Some((path, _)) = self.checkpoint_repo.find_latest().await? {
			let (state, height) = self.checkpoint_repo.load(&path).await?;
			Ok(Some((state, height)))
		} else {
			Ok(None)
		}
	}

	/// Clean up old checkpoints, keeping only the most recent N.
	pub async fn cleanup_checkpoints(&self, keep_count: usize) -> Result<(), SyncError> {
		self.checkpoint_repo.cleanup_old(keep_count).await
	}

	/// Save a checkpoint and prune old ones when `height` falls on the configured interval.
	///
	/// Returns whether a checkpoint was written.
	pub async fn checkpoint_if_due(
		&self,
		state: &MarkerState,
		height: u64,
		config: &CheckpointConfig,
	) -> Result<bool, SyncError> {
		if !config.is_due(height) {
			debug!("No checkpoint due at height {}", height);
			return Ok(false);
		}

		self.save_checkpoint(state, height).await?;
		self.cleanup_checkpoints(config.keep_count).await?;
		Ok(true)
	}
}

/// Configuration for checkpoint saving.
///
/// This struct controls how often checkpoints are saved and how many are retained.
#[derive(Debug, Clone)]
pub struct CheckpointConfig {
	/// Save checkpoint every N blocks.
	pub interval: u64,
	/// Number of checkpoints to keep.
	pub keep_count: usize,
}

impl CheckpointConfig {
	/// Whether a checkpoint should be written at `height`.
	pub fn is_due(&self, height: u64) -> bool {
		self.interval > 0 && height > 0 && height % self.interval == 0
	}
}

impl Default for CheckpointConfig {
	fn default() -> Self {
		Self {
			interval: 1000,
			keep_count: 2,
		}
	}
}
