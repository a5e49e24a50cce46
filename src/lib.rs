//! Index marking for wallet and chain synchronization.
//!
//! The [`marker`] module holds the engine: an [`IndexMarker`] records which
//! indices of the unbounded domain `0..=MAX_INDEX` are marked, using a sorted
//! list of disjoint ranges plus a global invert flag. The [`sync`] module
//! builds a progress tracker and state persistence on top of it.

pub mod marker;
pub mod sync;
pub mod utils;

pub use marker::{
	IndexMarker, IndexRange, IndexSelection, MAX_INDEX, MarkerError, MarkerState,
	MarkerStateHandle, RangeStatus,
};
pub use sync::{SyncError, SyncProgressTracker};
