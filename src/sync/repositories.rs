use crate::marker::MarkerState;
use crate::sync::{MarkerStateMetadata, SyncError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CHECKPOINT_PREFIX: &str = "checkpoint_marker_height_";
const CHECKPOINT_SUFFIX: &str = ".json";

/// Repository for named marker state persistence
#[async_trait::async_trait]
pub trait MarkerStateRepository {
	async fn save(&self, name: &str, state: &MarkerState, height: u64) -> Result<(), SyncError>;
	async fn load(&self, name: &str) -> Result<Option<(MarkerState, u64)>, SyncError>;
}

/// Repository for checkpoint management
#[async_trait::async_trait]
pub trait CheckpointRepository {
	async fn save(&self, state: &MarkerState, height: u64) -> Result<(), SyncError>;
	async fn find_latest(&self) -> Result<Option<(PathBuf, u64)>, SyncError>;
	async fn load(&self, path: &Path) -> Result<(MarkerState, u64), SyncError>;
	async fn cleanup_old(&self, keep_count: usize) -> Result<(), SyncError>;
}

/// File-based implementation of MarkerStateRepository
///
/// The state is written as bincode to `marker_state_<name>.bin`, with a JSON metadata file
/// alongside it carrying the sync height.
pub struct FileMarkerStateRepository {
	data_dir: PathBuf,
}

impl FileMarkerStateRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	/// Marker names become part of a file name, so only `[A-Za-z0-9_-]` is accepted.
	fn validate_name(name: &str) -> Result<(), SyncError> {
		let valid = !name.is_empty()
			&& name
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
		if valid {
			Ok(())
		} else {
			Err(SyncError::ConfigError(format!(
				"Invalid marker name {:?}: only letters, digits, '_' and '-' are allowed",
				name
			)))
		}
	}

	fn get_state_filename(&self, name: &str) -> PathBuf {
		self.data_dir.join(format!("marker_state_{}.bin", name))
	}

	fn get_metadata_filename(&self, name: &str) -> PathBuf {
		self.data_dir.join(format!("marker_state_{}.meta.json", name))
	}
}

#[async_trait::async_trait]
impl MarkerStateRepository for FileMarkerStateRepository {
	async fn save(&self, name: &str, state: &MarkerState, height: u64) -> Result<(), SyncError> {
		Self::validate_name(name)?;
		tokio::fs::create_dir_all(&self.data_dir).await?;

		// Create metadata
		let metadata = MarkerStateMetadata {
			sync_height: height,
			timestamp: chrono::Utc::now().to_rfc3339(),
			range_count: state.ranges().len(),
			inverted: state.is_inverted(),
		};
		let metadata_json = serde_json::to_string_pretty(&metadata).map_err(|e| {
			SyncError::ParseError(format!("Failed to serialize marker state metadata: {}", e))
		})?;

		// Save metadata
		let metadata_filename = self.get_metadata_filename(name);
		tokio::fs::write(&metadata_filename, metadata_json)
			.await
			.map_err(|e| {
				SyncError::ParseError(format!("Failed to write marker state metadata: {}", e))
			})?;

		// Serialize marker state
		let state_bytes = bincode::serialize(state).map_err(|e| {
			SyncError::ParseError(format!("Failed to serialize marker state: {}", e))
		})?;

		// Write state file
		let filename = self.get_state_filename(name);
		tokio::fs::write(&filename, &state_bytes)
			.await
			.map_err(|e| SyncError::ParseError(format!("Failed to write marker state file: {}", e)))?;

		info!("Saved marker state to {:?} at height {}", filename, height);
		Ok(())
	}

	async fn load(&self, name: &str) -> Result<Option<(MarkerState, u64)>, SyncError> {
		Self::validate_name(name)?;
		let filename = self.get_state_filename(name);
		let metadata_filename = self.get_metadata_filename(name);

		// Check if files exist
		if !tokio::fs::try_exists(&filename).await? {
			return Ok(None);
		}

		// Load metadata; a missing or unreadable file only loses the height
		let mut height = 0u64;
		match tokio::fs::read_to_string(&metadata_filename).await {
			Ok(meta_content) => match serde_json::from_str::<MarkerStateMetadata>(&meta_content) {
				Ok(metadata) => height = metadata.sync_height,
				Err(e) => warn!("Ignoring unreadable metadata {:?}: {}", metadata_filename, e),
			},
			Err(e) => warn!("No metadata at {:?}: {}", metadata_filename, e),
		}

		// Load state
		let state_bytes = tokio::fs::read(&filename)
			.await
			.map_err(|e| SyncError::ParseError(format!("Failed to read marker state file: {}", e)))?;

		let state: MarkerState = bincode::deserialize(&state_bytes).map_err(|e| {
			SyncError::ParseError(format!("Failed to deserialize marker state: {}", e))
		})?;

		info!("Loaded marker state from {:?} at height {}", filename, height);
		Ok(Some((state, height)))
	}
}

/// File-based implementation of CheckpointRepository
pub struct FileCheckpointRepository {
	data_dir: PathBuf,
}

impl FileCheckpointRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn get_checkpoint_filename(&self, height: u64) -> PathBuf {
		self.data_dir
			.join(format!("{}{}{}", CHECKPOINT_PREFIX, height, CHECKPOINT_SUFFIX))
	}

	/// Every checkpoint file in the data directory with its height.
	async fn list_checkpoints(&self) -> Result<Vec<(PathBuf, u64)>, SyncError> {
		if !tokio::fs::try_exists(&self.data_dir).await? {
			return Ok(Vec::new());
		}

		let mut entries = tokio::fs::read_dir(&self.data_dir)
			.await
			.map_err(|e| SyncError::ParseError(format!("Failed to read directory: {}", e)))?;

		let mut checkpoints = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| SyncError::ParseError(format!("Failed to read directory entry: {}", e)))?
		{
			let path = entry.path();
			if let Some(height) = checkpoint_height(&path) {
				checkpoints.push((path, height));
			}
		}

		Ok(checkpoints)
	}
}

fn checkpoint_height(path: &Path) -> Option<u64> {
	path.file_name()
		.and_then(|f| f.to_str())
		.and_then(|f| f.strip_prefix(CHECKPOINT_PREFIX))
		.and_then(|s| s.strip_suffix(CHECKPOINT_SUFFIX))
		.and_then(|s| s.parse::<u64>().ok())
}

#[async_trait::async_trait]
impl CheckpointRepository for FileCheckpointRepository {
	async fn save(&self, state: &MarkerState, height: u64) -> Result<(), SyncError> {
		tokio::fs::create_dir_all(&self.data_dir).await?;
		let checkpoint_file_path = self.get_checkpoint_filename(height);

		let content = serde_json::to_string_pretty(state)
			.map_err(|e| SyncError::ParseError(format!("Failed to serialize checkpoint: {}", e)))?;

		tokio::fs::write(&checkpoint_file_path, content)
			.await
			.map_err(|e| SyncError::ParseError(format!("Failed to write checkpoint file: {}", e)))?;

		info!(
			"Checkpoint saved: {} ranges written to {:?}",
			state.ranges().len(),
			checkpoint_file_path
		);
		Ok(())
	}

	async fn find_latest(&self) -> Result<Option<(PathBuf, u64)>, SyncError> {
		Ok(self
			.list_checkpoints()
			.await?
			.into_iter()
			.max_by_key(|(_, height)| *height))
	}

	async fn load(&self, path: &Path) -> Result<(MarkerState, u64), SyncError> {
		let content = tokio::fs::read_to_string(path)
			.await
			.map_err(|e| SyncError::ParseError(format!("Failed to read checkpoint file: {}", e)))?;

		let state: MarkerState = serde_json::from_str(&content)
			.map_err(|e| SyncError::ParseError(format!("Failed to parse checkpoint file: {}", e)))?;

		// Extract height from filename
		let height = checkpoint_height(path).ok_or_else(|| {
			SyncError::ParseError("Invalid checkpoint filename format".to_string())
		})?;

		info!(
			"Loaded {} ranges from checkpoint at height {}",
			state.ranges().len(),
			height
		);
		Ok((state, height))
	}

	async fn cleanup_old(&self, keep_count: usize) -> Result<(), SyncError> {
		let mut checkpoints = self.list_checkpoints().await?;

		if checkpoints.len() <= keep_count {
			return Ok(());
		}

		// Sort by height in descending order
		checkpoints.sort_by_key(|(_, height)| std::cmp::Reverse(*height));

		// Remove old checkpoints
		for (path, _) in checkpoints.into_iter().skip(keep_count) {
			if let Err(e) = tokio::fs::remove_file(&path).await {
				warn!("Failed to remove old checkpoint {:?}: {}", path, e);
			} else {
				info!("Removed old checkpoint: {:?}", path);
			}
		}

		Ok(())
	}
}
