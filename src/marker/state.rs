//! Stored representation of a marker and the handle used to share it.
//!
//! A [`MarkerState`] holds the sorted, maximally merged list of recorded
//! ranges plus the global invert flag. It knows nothing about effective
//! marking; [`crate::marker::IndexMarker`] combines both.
//!
//! Sharing is explicit through [`MarkerStateHandle`]. The handle is
//! `Rc`-based and therefore neither `Send` nor `Sync`: a caller that wants to
//! use one state from several threads must put the marker behind its own
//! lock, or move owned [`MarkerState`] snapshots between threads instead.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::types::{IndexRange, MAX_INDEX, MarkerError, RangeStatus};

/// Recorded ranges and invert flag of a marker.
///
/// The effective status of index `i` is `(i in ranges) XOR inverted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMarkerState")]
pub struct MarkerState {
	ranges: Vec<IndexRange>,
	inverted: bool,
}

/// Unvalidated form used while deserializing.
#[derive(Deserialize)]
struct RawMarkerState {
	ranges: Vec<IndexRange>,
	inverted: bool,
}

impl TryFrom<RawMarkerState> for MarkerState {
	type Error = MarkerError;

	fn try_from(raw: RawMarkerState) -> Result<Self, Self::Error> {
		MarkerState::from_parts(raw.ranges, raw.inverted)
	}
}

impl MarkerState {
	/// Empty state: nothing recorded, not inverted.
	pub fn new() -> Self {
		Self::default()
	}

	/// Build a state from its parts, rejecting unsorted, overlapping or
	/// adjacent ranges.
	pub fn from_parts(ranges: Vec<IndexRange>, inverted: bool) -> Result<Self, MarkerError> {
		validate_ranges(&ranges)?;
		Ok(Self { ranges, inverted })
	}

	pub fn ranges(&self) -> &[IndexRange] {
		&self.ranges
	}

	pub fn is_inverted(&self) -> bool {
		self.inverted
	}

	/// End of the last recorded range, if any.
	pub fn highest_recorded(&self) -> Option<u64> {
		self.ranges.last().map(|r| r.end)
	}

	pub(crate) fn clear(&mut self) {
		self.ranges.clear();
		self.inverted = false;
	}

	pub(crate) fn toggle_inverted(&mut self) {
		self.inverted = !self.inverted;
	}

	/// Record `range`, absorbing every stored range it overlaps or touches.
	pub(crate) fn insert(&mut self, range: IndexRange) {
		let IndexRange { mut start, mut end } = range;

		let lo = self.ranges.partition_point(|r| r.end + 1 < start);
		let hi = self.ranges.partition_point(|r| r.start <= end + 1);
		if lo < hi {
			start = start.min(self.ranges[lo].start);
			end = end.max(self.ranges[hi - 1].end);
		}

		self.ranges
			.splice(lo..hi, std::iter::once(IndexRange { start, end }));
	}

	/// Forget `range`, keeping the parts of stored ranges that stick out of it.
	pub(crate) fn remove(&mut self, range: IndexRange) {
		let IndexRange { start, end } = range;

		let lo = self.ranges.partition_point(|r| r.end < start);
		let hi = self.ranges.partition_point(|r| r.start <= end);
		if lo >= hi {
			return;
		}

		let first = self.ranges[lo];
		let last = self.ranges[hi - 1];
		let left = (first.start < start).then(|| IndexRange {
			start: first.start,
			end: start - 1,
		});
		let right = (last.end > end).then(|| IndexRange {
			start: end + 1,
			end: last.end,
		});

		self.ranges.splice(lo..hi, left.into_iter().chain(right));
	}

	/// Whether `index` is recorded, ignoring the invert flag.
	pub(crate) fn contains(&self, index: u64) -> bool {
		let idx = self.ranges.partition_point(|r| r.end < index);
		self.ranges.get(idx).is_some_and(|r| r.start <= index)
	}

	/// Status of `range` against the recorded ranges, ignoring the invert flag.
	pub(crate) fn recorded_status(&self, range: IndexRange) -> RangeStatus {
		// Ranges are maximally merged, so if the first one reaching into
		// `range` does not cover it entirely there is an unrecorded gap.
		let idx = self.ranges.partition_point(|r| r.end < range.start);
		match self.ranges.get(idx) {
			Some(r) if r.start <= range.start && r.end >= range.end => RangeStatus::AllMarked,
			Some(r) if r.start <= range.end => RangeStatus::Mixed,
			_ => RangeStatus::NoneMarked,
		}
	}

	/// Smallest recorded index `>= from`.
	pub(crate) fn next_recorded(&self, from: u64) -> Option<u64> {
		let idx = self.ranges.partition_point(|r| r.end < from);
		self.ranges.get(idx).map(|r| r.start.max(from))
	}

	/// Smallest unrecorded index `>= from` that is still within the domain.
	pub(crate) fn next_unrecorded(&self, from: u64) -> Option<u64> {
		if from > MAX_INDEX {
			return None;
		}
		let idx = self.ranges.partition_point(|r| r.end < from);
		match self.ranges.get(idx) {
			Some(r) if r.start <= from => (r.end < MAX_INDEX).then(|| r.end + 1),
			_ => Some(from),
		}
	}

	/// Largest unrecorded index within the domain.
	pub(crate) fn last_unrecorded(&self) -> Option<u64> {
		match self.ranges.last() {
			Some(r) if r.end == MAX_INDEX => r.start.checked_sub(1),
			_ => Some(MAX_INDEX),
		}
	}

	/// Recorded ranges clipped to `window`.
	pub(crate) fn recorded_within(&self, window: IndexRange) -> Vec<IndexRange> {
		let lo = self.ranges.partition_point(|r| r.end < window.start);
		self.ranges[lo..]
			.iter()
			.take_while(|r| r.start <= window.end)
			.map(|r| IndexRange {
				start: r.start.max(window.start),
				end: r.end.min(window.end),
			})
			.collect()
	}

	/// Unrecorded runs inside `window`.
	pub(crate) fn gaps_within(&self, window: IndexRange) -> Vec<IndexRange> {
		let mut gaps = Vec::new();
		let mut cursor = window.start;

		for r in self.recorded_within(window) {
			if r.start > cursor {
				gaps.push(IndexRange {
					start: cursor,
					end: r.start - 1,
				});
			}
			if r.end >= window.end {
				return gaps;
			}
			cursor = r.end + 1;
		}

		gaps.push(IndexRange {
			start: cursor,
			end: window.end,
		});
		gaps
	}
}

fn validate_ranges(ranges: &[IndexRange]) -> Result<(), MarkerError> {
	for r in ranges {
		if r.start > r.end {
			return Err(MarkerError::CorruptState(format!(
				"range {}..={} is reversed",
				r.start, r.end
			)));
		}
		if r.end > MAX_INDEX {
			return Err(MarkerError::CorruptState(format!(
				"range {} exceeds the maximum index",
				r
			)));
		}
	}

	if let Some((a, b)) = ranges
		.iter()
		.tuple_windows()
		.find(|(a, b)| a.end + 1 >= b.start)
	{
		return Err(MarkerError::CorruptState(format!(
			"ranges {} and {} are unsorted, overlapping or adjacent",
			a, b
		)));
	}

	Ok(())
}

/// Shared-ownership handle to a [`MarkerState`].
///
/// Cloning a handle aliases the state: a mutation made through any marker
/// holding it is visible through every other. Use [`Self::deep_copy`] for an
/// independent state.
#[derive(Debug, Clone, Default)]
pub struct MarkerStateHandle(Rc<RefCell<MarkerState>>);

impl MarkerStateHandle {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_state(state: MarkerState) -> Self {
		Self(Rc::new(RefCell::new(state)))
	}

	/// Whether both handles point at the same state.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// A new handle to an independent copy of the current state.
	pub fn deep_copy(&self) -> Self {
		Self::from_state(self.snapshot())
	}

	/// Owned copy of the current state.
	pub fn snapshot(&self) -> MarkerState {
		self.0.borrow().clone()
	}

	/// Number of handles currently sharing this state.
	pub fn holders(&self) -> usize {
		Rc::strong_count(&self.0)
	}

	pub(crate) fn read(&self) -> Ref<'_, MarkerState> {
		self.0.borrow()
	}

	pub(crate) fn write(&self) -> RefMut<'_, MarkerState> {
		self.0.borrow_mut()
	}
}

impl From<MarkerState> for MarkerStateHandle {
	fn from(state: MarkerState) -> Self {
		Self::from_state(state)
	}
}
