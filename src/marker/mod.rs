//! Index marking engine
//!
//! An [`IndexMarker`] tracks which indices (block heights, output indices, ...)
//! of the unbounded non-negative domain are marked. Marked indices are stored
//! as a sorted list of disjoint, non-adjacent ranges, so memory grows with the
//! number of mark/unmark transitions rather than with the domain. A global
//! invert flag swaps the status of every index in O(1).
//!
//! Markers are single-threaded. Their state lives behind a
//! [`MarkerStateHandle`] that can be shared by several markers; see the
//! [`state`] module for the threading contract.

/// Stored ranges and the shareable state handle
pub mod state;
/// Ranges, range status, selections and errors
pub mod types;

pub use state::{MarkerState, MarkerStateHandle};
pub use types::*;

use tracing::debug;

/// Tracks marked and unmarked indices over `0..=MAX_INDEX`.
///
/// All ranges are inclusive on both ends. Mutations act on the effective
/// status: after `mark(i)`, `is_marked(i)` holds whether or not the marker is
/// inverted.
///
/// Markers are not `Clone`; share state with
/// [`Self::with_state`] or copy it with [`Self::detached`].
#[derive(Debug, Default)]
pub struct IndexMarker {
	state: MarkerStateHandle,
}

impl IndexMarker {
	/// Create a marker with nothing marked and its own state.
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a marker that shares `state`. No copy is made.
	pub fn with_state(state: MarkerStateHandle) -> Self {
		Self { state }
	}

	/// Create a marker holding an independent deep copy of this marker's state.
	pub fn detached(&self) -> Self {
		Self::with_state(self.state.deep_copy())
	}

	/// The handle to this marker's state (aliased, not copied).
	pub fn state(&self) -> MarkerStateHandle {
		self.state.clone()
	}

	/// Adopt `state`, sharing it with whoever else holds it.
	pub fn set_state(&mut self, state: MarkerStateHandle) {
		debug!(holders = state.holders(), "Marker adopting shared state");
		self.state = state;
	}

	/// Owned copy of the current state, suitable for persisting or sending
	/// to another thread.
	pub fn snapshot(&self) -> MarkerState {
		self.state.snapshot()
	}

	pub fn is_inverted(&self) -> bool {
		self.state.read().is_inverted()
	}

	/// Mark a single index.
	pub fn mark(&mut self, index: u64) -> Result<(), MarkerError> {
		self.mark_range(index, index)
	}

	/// Mark every index in `indices`. Order and duplicates do not matter.
	pub fn mark_all<I>(&mut self, indices: I) -> Result<(), MarkerError>
	where
		I: IntoIterator<Item = u64>,
	{
		let runs = coalesce(indices)?;
		self.apply_runs(&runs, true);
		Ok(())
	}

	/// Mark the closed range `[start, end]`.
	pub fn mark_range(&mut self, start: u64, end: u64) -> Result<(), MarkerError> {
		let range = IndexRange::new(start, end)?;
		self.apply_runs(&[range], true);
		Ok(())
	}

	/// Unmark a single index.
	pub fn unmark(&mut self, index: u64) -> Result<(), MarkerError> {
		self.unmark_range(index, index)
	}

	/// Unmark every index in `indices`. Order and duplicates do not matter.
	pub fn unmark_all<I>(&mut self, indices: I) -> Result<(), MarkerError>
	where
		I: IntoIterator<Item = u64>,
	{
		let runs = coalesce(indices)?;
		self.apply_runs(&runs, false);
		Ok(())
	}

	/// Unmark the closed range `[start, end]`.
	pub fn unmark_range(&mut self, start: u64, end: u64) -> Result<(), MarkerError> {
		let range = IndexRange::new(start, end)?;
		self.apply_runs(&[range], false);
		Ok(())
	}

	/// Mark whatever `selection` describes.
	pub fn mark_selection(&mut self, selection: &IndexSelection) -> Result<(), MarkerError> {
		match selection {
			IndexSelection::Index(index) => self.mark(*index),
			IndexSelection::Set(indices) => self.mark_all(indices.iter().copied()),
			IndexSelection::Range(range) => self.mark_range(range.start, range.end),
		}
	}

	/// Unmark whatever `selection` describes.
	pub fn unmark_selection(&mut self, selection: &IndexSelection) -> Result<(), MarkerError> {
		match selection {
			IndexSelection::Index(index) => self.unmark(*index),
			IndexSelection::Set(indices) => self.unmark_all(indices.iter().copied()),
			IndexSelection::Range(range) => self.unmark_range(range.start, range.end),
		}
	}

	/// Clear every marking and the invert flag.
	pub fn reset(&mut self) {
		debug!("Resetting index marker");
		self.state.write().clear();
	}

	/// Swap marked and unmarked status across the whole domain.
	pub fn invert(&mut self) {
		let mut state = self.state.write();
		state.toggle_inverted();
		debug!(inverted = state.is_inverted(), "Inverted index marker");
	}

	/// Whether `index` is marked.
	pub fn is_marked(&self, index: u64) -> bool {
		let state = self.state.read();
		state.contains(index) ^ state.is_inverted()
	}

	/// Whether every index in `indices` is marked.
	///
	/// This is an "all marked" check: a collection with any unmarked index
	/// yields `false`. An empty collection yields `true`.
	pub fn is_marked_all<I>(&self, indices: I) -> bool
	where
		I: IntoIterator<Item = u64>,
	{
		let state = self.state.read();
		let inverted = state.is_inverted();
		indices
			.into_iter()
			.all(|index| state.contains(index) ^ inverted)
	}

	/// Evaluate the closed range `[start, end]`.
	pub fn range_status(&self, start: u64, end: u64) -> Result<RangeStatus, MarkerError> {
		let range = IndexRange::new(start, end)?;
		let state = self.state.read();
		let status = state.recorded_status(range);
		Ok(if state.is_inverted() {
			status.inverted()
		} else {
			status
		})
	}

	/// Evaluate whatever `selection` describes. Sets are `AllMarked` when
	/// every index is marked, `NoneMarked` when none is, `Mixed` otherwise.
	pub fn selection_status(&self, selection: &IndexSelection) -> Result<RangeStatus, MarkerError> {
		match selection {
			IndexSelection::Index(index) => Ok(if self.is_marked(*index) {
				RangeStatus::AllMarked
			} else {
				RangeStatus::NoneMarked
			}),
			IndexSelection::Set(indices) => {
				let marked = indices.iter().filter(|&&i| self.is_marked(i)).count();
				Ok(match marked {
					n if n == indices.len() => RangeStatus::AllMarked,
					0 => RangeStatus::NoneMarked,
					_ => RangeStatus::Mixed,
				})
			}
			IndexSelection::Range(range) => self.range_status(range.start, range.end),
		}
	}

	/// Smallest marked index `>= from`.
	pub fn first_marked(&self, from: u64) -> Option<u64> {
		let state = self.state.read();
		if state.is_inverted() {
			state.next_unrecorded(from)
		} else {
			state.next_recorded(from)
		}
	}

	/// Smallest unmarked index `>= from`.
	pub fn first_unmarked(&self, from: u64) -> Option<u64> {
		let state = self.state.read();
		if state.is_inverted() {
			state.next_recorded(from)
		} else {
			state.next_unrecorded(from)
		}
	}

	/// Largest marked index, if any.
	pub fn last_marked(&self) -> Option<u64> {
		let state = self.state.read();
		if state.is_inverted() {
			state.last_unrecorded()
		} else {
			state.highest_recorded()
		}
	}

	/// Largest unmarked index, if any.
	pub fn last_unmarked(&self) -> Option<u64> {
		let state = self.state.read();
		if state.is_inverted() {
			state.highest_recorded()
		} else {
			state.last_unrecorded()
		}
	}

	/// Maximal runs of marked indices inside `[start, end]`.
	pub fn marked_ranges(&self, start: u64, end: u64) -> Result<Vec<IndexRange>, MarkerError> {
		let window = IndexRange::new(start, end)?;
		let state = self.state.read();
		Ok(if state.is_inverted() {
			state.gaps_within(window)
		} else {
			state.recorded_within(window)
		})
	}

	/// Maximal runs of unmarked indices inside `[start, end]`.
	pub fn unmarked_ranges(&self, start: u64, end: u64) -> Result<Vec<IndexRange>, MarkerError> {
		let window = IndexRange::new(start, end)?;
		let state = self.state.read();
		Ok(if state.is_inverted() {
			state.recorded_within(window)
		} else {
			state.gaps_within(window)
		})
	}

	/// Make `runs` effectively marked (`mark == true`) or unmarked.
	fn apply_runs(&mut self, runs: &[IndexRange], mark: bool) {
		let mut state = self.state.write();
		let record = mark ^ state.is_inverted();
		for &run in runs {
			if record {
				state.insert(run);
			} else {
				state.remove(run);
			}
		}
	}
}

/// Validate `indices` and collapse them into sorted runs of consecutive
/// values.
fn coalesce<I>(indices: I) -> Result<Vec<IndexRange>, MarkerError>
where
	I: IntoIterator<Item = u64>,
{
	let mut sorted: Vec<u64> = indices.into_iter().collect();
	sorted.sort_unstable();
	sorted.dedup();

	if let Some(&last) = sorted.last() {
		if last > MAX_INDEX {
			return Err(MarkerError::InvalidIndex(last));
		}
	}

	let mut runs: Vec<IndexRange> = Vec::new();
	for index in sorted {
		match runs.last_mut() {
			Some(run) if run.end + 1 == index => run.end = index,
			_ => runs.push(IndexRange {
				start: index,
				end: index,
			}),
		}
	}
	Ok(runs)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn coalesce_builds_sorted_runs() {
		let runs = coalesce([9, 3, 4, 5, 3, 11, 10]).unwrap();
		assert_eq!(
			runs,
			vec![
				IndexRange { start: 3, end: 5 },
				IndexRange { start: 9, end: 11 },
			]
		);
		assert_eq!(coalesce([u64::MAX, 1]), Err(MarkerError::InvalidIndex(u64::MAX)));
		assert!(coalesce(std::iter::empty()).unwrap().is_empty());
	}

	#[test]
	fn failed_mutation_leaves_state_untouched() {
		let mut marker = IndexMarker::new();
		marker.mark_range(5, 10).unwrap();
		let before = marker.snapshot();

		assert!(marker.mark_range(20, 10).is_err());
		assert!(marker.unmark_all([7, u64::MAX]).is_err());
		assert_eq!(marker.snapshot(), before);
	}

	#[test]
	fn mark_while_inverted_removes_recorded_range() {
		let mut marker = IndexMarker::new();
		marker.mark_range(0, 9).unwrap();
		marker.invert();
		marker.mark_range(3, 4).unwrap();

		assert_eq!(
			marker.snapshot().ranges(),
			&[IndexRange { start: 0, end: 2 }, IndexRange { start: 5, end: 9 }]
		);
		assert!(marker.is_marked(3));
		assert!(!marker.is_marked(2));
		assert!(marker.is_marked(10));
	}

	#[test]
	fn last_marked_follows_inversion() {
		let mut marker = IndexMarker::new();
		assert_eq!(marker.last_marked(), None);
		assert_eq!(marker.last_unmarked(), Some(MAX_INDEX));

		marker.mark_range(4, 8).unwrap();
		assert_eq!(marker.last_marked(), Some(8));

		marker.invert();
		assert_eq!(marker.last_marked(), Some(MAX_INDEX));
		assert_eq!(marker.last_unmarked(), Some(8));

		marker.unmark_range(100, MAX_INDEX).unwrap();
		assert_eq!(marker.last_marked(), Some(99));
	}

	#[test]
	fn set_status_reports_mixed() {
		let mut marker = IndexMarker::new();
		marker.mark_all([1, 2]).unwrap();

		let mixed = IndexSelection::Set(vec![1, 3]);
		assert_eq!(marker.selection_status(&mixed), Ok(RangeStatus::Mixed));
		let all = IndexSelection::Set(vec![2, 1, 2]);
		assert_eq!(marker.selection_status(&all), Ok(RangeStatus::AllMarked));
	}
}
