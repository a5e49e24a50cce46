//! Index Synchronization Module
//!
//! This module wires the index marker into a sync session. It is composed of several submodules:
//!
//! - `progress_tracker`: Records processed heights in an `IndexMarker`, detects gaps, rolls back
//!   on reorgs and plans which batches still need processing.
//! - `repositories`: File-backed storage for marker states and checkpoints.
//! - `state_persistence`: Saves and restores marker states and rolling checkpoints.
//! - `config`: Session configuration.
//! - `types`: Error and metadata types shared by the other submodules.

/// Session configuration
pub mod config;
/// Tracks synchronization progress and statistics
pub mod progress_tracker;
/// File-backed repositories for marker state
pub mod repositories;
/// Marker state persistence service
pub mod state_persistence;
/// Errors and persisted metadata
pub mod types;

pub use config::SyncConfig;
pub use progress_tracker::{SyncProgressTracker, SyncStats};
pub use state_persistence::{CheckpointConfig, StatePersistenceService};
pub use types::*;
