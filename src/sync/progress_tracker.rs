//! Progress tracking for index synchronization.
//!
//! This module provides the `SyncProgressTracker`, which records the block heights (or output
//! indices) a sync session has processed in an [`IndexMarker`]. It counts transactions and
//! outputs, rolls back on reorgs, and decides which batches still need processing.
//!
//! Batches are first checked with a single range query. Only a batch that comes back
//! [`RangeStatus::Mixed`] is broken down further into its unprocessed sub-ranges.

use crate::marker::{IndexMarker, IndexRange, MAX_INDEX, RangeStatus};
use crate::sync::SyncError;
use crate::sync::config::SyncConfig;
use crate::utils::format_ranges;

use tracing::{debug, info, warn};

/// Service for tracking synchronization progress
///
/// Processed heights live in an [`IndexMarker`], so gaps and pending work are answered from a
/// handful of ranges instead of a set of every height seen.
#[derive(Debug)]
pub struct SyncProgressTracker {
	/// Heights we've processed
	processed: IndexMarker,
	/// Starting height for this sync session
	start_index: u64,
	/// Total transactions processed
	transactions_processed: usize,
	/// Total wallet outputs processed
	outputs_processed: usize,
	/// Last height at which we logged progress
	last_logged_index: u64,
	/// Log every N heights
	log_interval: u64,
	/// Heights checked per range query when planning work
	batch_size: u64,
}

impl SyncProgressTracker {
	/// Create a new progress tracker starting from the given height.
	pub fn new(start_index: u64) -> Self {
		Self::with_marker(start_index, IndexMarker::new())
	}

	/// Create a tracker from a validated sync configuration.
	pub fn from_config(config: &SyncConfig, processed: IndexMarker) -> Result<Self, SyncError> {
		config.validate()?;
		let mut tracker = Self::with_marker(config.start_index, processed);
		tracker.log_interval = config.log_interval;
		tracker.batch_size = config.batch_size;
		Ok(tracker)
	}

	/// Resume tracking on top of an existing marker, e.g. one restored from disk.
	pub fn with_marker(start_index: u64, processed: IndexMarker) -> Self {
		let defaults = SyncConfig::default();
		Self {
			processed,
			start_index,
			transactions_processed: 0,
			outputs_processed: 0,
			last_logged_index: start_index,
			log_interval: defaults.log_interval,
			batch_size: defaults.batch_size,
		}
	}

	/// The marker holding processed heights.
	pub fn marker(&self) -> &IndexMarker {
		&self.processed
	}

	/// Highest processed height, read from the marker so that changes made through a shared
	/// state are seen.
	pub fn highest_processed(&self) -> Option<u64> {
		self.processed.last_marked()
	}

	/// Record that we processed data at a specific height
	pub fn record_processed(&mut self, index: u64) -> Result<(), SyncError> {
		self.record_processed_range(index, index)
	}

	/// Record that every height in `[start, end]` was processed
	pub fn record_processed_range(&mut self, start: u64, end: u64) -> Result<(), SyncError> {
		self.processed.mark_range(start, end)?;
		Ok(())
	}

	/// Record a processed transaction at the given height
	pub fn record_transaction(&mut self, index: u64) -> Result<(), SyncError> {
		self.record_processed(index)?;
		self.transactions_processed += 1;
		Ok(())
	}

	/// Record a processed wallet output at the given height
	pub fn record_output(&mut self, index: u64) -> Result<(), SyncError> {
		self.record_processed(index)?;
		self.outputs_processed += 1;
		Ok(())
	}

	/// Forget every height from `height` upwards, e.g. after a chain reorganisation.
	pub fn rollback_from(&mut self, height: u64) -> Result<(), SyncError> {
		if height > MAX_INDEX {
			return Ok(());
		}
		self.processed.unmark_range(height, MAX_INDEX)?;
		self.last_logged_index = self.last_logged_index.min(height);

		info!("Rolled back processed heights from {}", height);
		Ok(())
	}

	/// First height at or after the session start that still needs processing.
	pub fn next_unprocessed(&self) -> Option<u64> {
		self.processed.first_unmarked(self.start_index)
	}

	/// Processing status of `[start, end]`.
	pub fn batch_status(&self, start: u64, end: u64) -> Result<RangeStatus, SyncError> {
		Ok(self.processed.range_status(start, end)?)
	}

	/// Sub-ranges of `[start, end]` that still need processing, using the configured batch size.
	pub fn pending(&self, start: u64, end: u64) -> Result<Vec<IndexRange>, SyncError> {
		self.pending_batches(start, end, self.batch_size)
	}

	/// Split `[start, end]` into batches of `batch_size` heights and return the sub-ranges that
	/// still need processing.
	pub fn pending_batches(
		&self,
		start: u64,
		end: u64,
		batch_size: u64,
	) -> Result<Vec<IndexRange>, SyncError> {
		if batch_size == 0 {
			return Err(SyncError::ConfigError("batch size must be positive".to_string()));
		}
		let window = IndexRange::new(start, end)?;

		let mut pending = Vec::new();
		let mut batch_start = window.start;
		loop {
			let batch_end = batch_start.saturating_add(batch_size - 1).min(window.end);

			match self.processed.range_status(batch_start, batch_end)? {
				RangeStatus::NoneMarked => pending.push(IndexRange {
					start: batch_start,
					end: batch_end,
				}),
				RangeStatus::AllMarked => {}
				RangeStatus::Mixed => {
					let gaps = self.processed.unmarked_ranges(batch_start, batch_end)?;
					debug!(
						"Batch {}-{} partially processed, pending: {}",
						batch_start,
						batch_end,
						format_ranges(&gaps)
					);
					pending.extend(gaps);
				}
			}

			if batch_end >= window.end {
				break;
			}
			batch_start = batch_end + 1;
		}

		Ok(pending)
	}

	/// Check if sync is complete up to `chain_height`
	///
	/// Returns true if every height from the session start to `chain_height` has been processed.
	pub fn is_sync_complete(&self, chain_height: u64) -> bool {
		if chain_height < self.start_index {
			return self.highest_processed().is_some();
		}
		matches!(
			self.processed.range_status(self.start_index, chain_height),
			Ok(RangeStatus::AllMarked)
		)
	}

	/// Check for gaps in processed heights
	///
	/// Returns the unprocessed runs between the session start and the highest processed height.
	pub fn check_for_gaps(&self) -> Vec<IndexRange> {
		match self.highest_processed() {
			Some(highest) if highest >= self.start_index => self
				.processed
				.unmarked_ranges(self.start_index, highest)
				.unwrap_or_default(),
			_ => Vec::new(),
		}
	}

	/// Log progress at regular intervals or when forced
	///
	/// Returns whether a progress line was logged.
	pub fn log_progress(&mut self, force: bool) -> bool {
		let Some(highest) = self.highest_processed() else {
			return false;
		};

		let since_last_log = highest.saturating_sub(self.last_logged_index);
		if !force && since_last_log < self.log_interval {
			return false;
		}

		info!(
			"Sync progress: {} transactions, {} outputs processed up to height {}",
			self.transactions_processed, self.outputs_processed, highest
		);
		self.last_logged_index = highest;
		true
	}

	/// Get sync statistics as a SyncStats struct
	pub fn get_stats(&self) -> SyncStats {
		let highest_processed_index = self.highest_processed();
		let processed_ranges = match highest_processed_index {
			Some(highest) if highest >= self.start_index => self
				.processed
				.marked_ranges(self.start_index, highest)
				.unwrap_or_default(),
			_ => Vec::new(),
		};

		SyncStats {
			start_index: self.start_index,
			highest_processed_index,
			total_indices_processed: processed_ranges.iter().map(IndexRange::len).sum(),
			transactions_processed: self.transactions_processed,
			outputs_processed: self.outputs_processed,
			gaps: self.check_for_gaps(),
		}
	}

	/// Validate sync completion, returning an error if nothing was processed
	pub fn validate_completion(&self) -> Result<(), SyncError> {
		if self.highest_processed().is_none() {
			return Err(SyncError::SyncError(
				"Sync completed without processing any data".to_string(),
			));
		}

		let gaps = self.check_for_gaps();
		if !gaps.is_empty() {
			warn!("Sync completed with {} gaps in processed heights", gaps.len());
			for gap in &gaps {
				warn!("Gap detected: missing heights {}", gap);
			}
		}

		Ok(())
	}
}

/// Statistics about the sync progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
	pub start_index: u64,
	pub highest_processed_index: Option<u64>,
	pub total_indices_processed: u64,
	pub transactions_processed: usize,
	pub outputs_processed: usize,
	pub gaps: Vec<IndexRange>,
}

impl SyncStats {
	/// Get a human-readable summary of the sync statistics
	pub fn summary(&self) -> String {
		let highest = self
			.highest_processed_index
			.map_or_else(|| "-".to_string(), |h| h.to_string());
		format!(
			"Sync from {} to {}: {} transactions, {} outputs, {} total heights{}",
			self.start_index,
			highest,
			self.transactions_processed,
			self.outputs_processed,
			self.total_indices_processed,
			if self.gaps.is_empty() {
				String::new()
			} else {
				format!(" ({} gaps: {})", self.gaps.len(), format_ranges(&self.gaps))
			}
		)
	}
}
