//! Behavioural tests for the index marker: single indices, index sets, ranges, shared state and
//! inversion, exercised over randomly chosen indices.

use index_marker_sync::{
	IndexMarker, IndexRange, IndexSelection, MAX_INDEX, MarkerError, RangeStatus,
};
use rand::Rng;
use std::collections::HashSet;

const TEST_MAX_INDEX: u64 = 10_000;
const NUM_MARKINGS: usize = 5_000;

fn random_indices(max: u64, count: usize) -> Vec<u64> {
	let mut rng = rand::rng();
	(0..count).map(|_| rng.random_range(0..=max)).collect()
}

fn random_range(max: u64) -> (u64, u64) {
	let mut rng = rand::rng();
	let a = rng.random_range(0..=max);
	let b = rng.random_range(0..=max);
	(a.min(b), a.max(b))
}

#[test]
fn starts_with_nothing_marked() {
	let marker = IndexMarker::new();
	assert_eq!(marker.range_status(0, TEST_MAX_INDEX), Ok(RangeStatus::NoneMarked));
	assert!(!marker.is_marked(0));
	assert!(!marker.is_inverted());
}

#[test]
fn can_be_reset_so_nothing_is_marked() {
	let mut marker = IndexMarker::new();
	assert!(!marker.is_marked(1));

	marker.mark_all([0]).unwrap();
	assert!(marker.is_marked_all([0]));
	assert_eq!(marker.range_status(0, TEST_MAX_INDEX), Ok(RangeStatus::Mixed));

	marker.invert();
	marker.reset();

	assert_eq!(marker.range_status(0, TEST_MAX_INDEX), Ok(RangeStatus::NoneMarked));
	assert!(!marker.is_inverted());
}

#[test]
fn can_mark_single_indices() {
	let mut marker = IndexMarker::new();
	let indices = random_indices(TEST_MAX_INDEX, NUM_MARKINGS);

	for &idx in &indices {
		marker.mark(idx).unwrap();
	}

	assert!(marker.is_marked_all(indices.iter().copied()));
	assert!(indices.iter().all(|&idx| marker.is_marked(idx)));

	let marked: HashSet<u64> = indices.iter().copied().collect();
	let not_marked: Vec<u64> = (0..=TEST_MAX_INDEX).filter(|i| !marked.contains(i)).collect();
	assert!(!not_marked.is_empty());
	assert!(!marker.is_marked_all(not_marked.iter().copied()));
	assert!(not_marked.iter().all(|&idx| !marker.is_marked(idx)));

	assert_eq!(marker.range_status(0, TEST_MAX_INDEX), Ok(RangeStatus::Mixed));
}

#[test]
fn can_mark_a_set_of_indices() {
	let mut marker = IndexMarker::new();
	let indices = random_indices(TEST_MAX_INDEX, NUM_MARKINGS);

	marker.mark_all(indices.iter().copied()).unwrap();
	let marked: HashSet<u64> = indices.iter().copied().collect();

	assert!(marker.is_marked_all(indices.iter().copied()));
	for idx in 0..=TEST_MAX_INDEX {
		assert_eq!(marker.is_marked(idx), marked.contains(&idx), "index {}", idx);
	}
	assert_eq!(marker.range_status(0, TEST_MAX_INDEX), Ok(RangeStatus::Mixed));
}

#[test]
fn can_mark_a_range_of_indices() {
	const MAX_IDX: u64 = 99;

	for _ in 0..1_000 {
		let mut marker = IndexMarker::new();
		let (start, end) = random_range(MAX_IDX);

		marker.mark_range(start, end).unwrap();

		assert_eq!(marker.range_status(start, end), Ok(RangeStatus::AllMarked));
		assert!((start..=end).all(|idx| marker.is_marked(idx)));
		if start > 0 {
			assert_eq!(marker.range_status(0, start - 1), Ok(RangeStatus::NoneMarked));
		}
		if end < MAX_IDX {
			assert_eq!(marker.range_status(end + 1, MAX_IDX), Ok(RangeStatus::NoneMarked));
		}
	}
}

#[test]
fn can_unmark_single_indices() {
	let mut marker = IndexMarker::new();
	let indices = random_indices(TEST_MAX_INDEX, NUM_MARKINGS);
	marker.mark_all(indices.iter().copied()).unwrap();

	for &idx in &indices {
		marker.unmark(idx).unwrap();
	}

	assert!(indices.iter().all(|&idx| !marker.is_marked(idx)));
	assert!(!marker.is_marked_all(indices.iter().copied()));
	assert_eq!(marker.range_status(0, TEST_MAX_INDEX), Ok(RangeStatus::NoneMarked));
	assert!(marker.snapshot().ranges().is_empty());
}

#[test]
fn can_unmark_a_set_of_indices() {
	let mut marker = IndexMarker::new();
	let indices = random_indices(TEST_MAX_INDEX, NUM_MARKINGS);
	marker.mark_all(indices.iter().copied()).unwrap();

	marker.unmark_all(indices.iter().copied()).unwrap();

	assert!(indices.iter().all(|&idx| !marker.is_marked(idx)));
	assert_eq!(marker.range_status(0, TEST_MAX_INDEX), Ok(RangeStatus::NoneMarked));
}

#[test]
fn can_unmark_a_range_of_indices() {
	const MAX_IDX: u64 = 99;

	for _ in 0..1_000 {
		let mut marker = IndexMarker::new();
		let (start, end) = random_range(MAX_IDX);

		marker.mark_range(start, end).unwrap();
		assert_eq!(marker.range_status(start, end), Ok(RangeStatus::AllMarked));

		marker.unmark_range(start, end).unwrap();

		assert!((start..=end).all(|idx| !marker.is_marked(idx)));
		assert!(!marker.is_marked_all(start..=end));
		assert_eq!(marker.range_status(start, end), Ok(RangeStatus::NoneMarked));
		assert_eq!(marker.range_status(0, MAX_IDX), Ok(RangeStatus::NoneMarked));
	}
}

#[test]
fn exposes_and_can_be_built_from_shared_state() {
	let mut marker = IndexMarker::new();
	marker.mark_all(random_indices(TEST_MAX_INDEX, NUM_MARKINGS)).unwrap();

	let state = marker.state();
	let marker2 = IndexMarker::with_state(state.clone());
	assert!(state.ptr_eq(&marker2.state()));

	let idx = TEST_MAX_INDEX + 5;
	marker.mark(idx).unwrap();
	assert!(marker2.is_marked(idx));
	marker.unmark(idx).unwrap();
	assert!(!marker2.is_marked(idx));
}

#[test]
fn can_set_shared_state() {
	let mut marker = IndexMarker::new();
	let indices = random_indices(TEST_MAX_INDEX, NUM_MARKINGS);
	marker.mark_all(indices.iter().copied()).unwrap();

	let mut marker2 = IndexMarker::new();
	marker2.mark_all(random_indices(TEST_MAX_INDEX, NUM_MARKINGS)).unwrap();

	marker2.set_state(marker.state());

	assert!(marker.state().ptr_eq(&marker2.state()));
	assert!(marker2.is_marked_all(indices.iter().copied()));

	marker2.invert();
	assert!(marker.is_inverted());
}

#[test]
fn detached_marker_never_observes_changes() {
	let mut marker = IndexMarker::new();
	marker.mark_range(10, 20).unwrap();

	let detached = marker.detached();
	assert!(!detached.state().ptr_eq(&marker.state()));

	marker.mark(50).unwrap();
	marker.invert();

	assert!(!detached.is_marked(50));
	assert!(!detached.is_inverted());
	assert_eq!(detached.range_status(10, 20), Ok(RangeStatus::AllMarked));
}

#[test]
fn can_invert_marked_indices() {
	let mut marker = IndexMarker::new();

	marker.invert();
	assert_eq!(marker.range_status(0, TEST_MAX_INDEX * 2), Ok(RangeStatus::AllMarked));
	assert_eq!(
		marker.range_status(0, MAX_INDEX),
		Ok(RangeStatus::AllMarked)
	);

	marker.invert();
	assert_eq!(marker.range_status(0, TEST_MAX_INDEX * 2), Ok(RangeStatus::NoneMarked));

	let indices = random_indices(TEST_MAX_INDEX, NUM_MARKINGS);
	marker.mark_all(indices.iter().copied()).unwrap();
	marker.invert();
	let unmarked: HashSet<u64> = indices.iter().copied().collect();

	assert!(!marker.is_marked_all(indices.iter().copied()));
	for idx in 0..TEST_MAX_INDEX {
		assert_eq!(marker.is_marked(idx), !unmarked.contains(&idx), "index {}", idx);
	}
	assert_eq!(marker.range_status(0, TEST_MAX_INDEX), Ok(RangeStatus::Mixed));

	let more = random_indices(TEST_MAX_INDEX, NUM_MARKINGS);
	marker.mark_all(more.iter().copied()).unwrap();
	assert!(more.iter().all(|&idx| marker.is_marked(idx)));
}

#[test]
fn sparse_set_makes_enclosing_range_mixed() {
	let mut marker = IndexMarker::new();
	marker.mark_all([3, 7, 42]).unwrap();

	assert!(marker.is_marked(3));
	assert!(!marker.is_marked(5));
	assert!(marker.is_marked_all([3, 7, 42]));
	assert_eq!(marker.range_status(0, 100), Ok(RangeStatus::Mixed));
}

#[test]
fn unmarking_a_marked_range_clears_it() {
	let mut marker = IndexMarker::new();
	marker.mark_range(10, 20).unwrap();
	marker.unmark_range(10, 20).unwrap();

	assert_eq!(marker.range_status(10, 20), Ok(RangeStatus::NoneMarked));
	assert_eq!(marker.range_status(0, 1000), Ok(RangeStatus::NoneMarked));
}

#[test]
fn inverting_empty_marker_marks_everything_without_storing() {
	let mut marker = IndexMarker::new();
	marker.invert();

	assert_eq!(marker.range_status(0, 1_000_000), Ok(RangeStatus::AllMarked));
	assert!(marker.snapshot().ranges().is_empty());
}

#[test]
fn reversed_ranges_are_rejected() {
	let mut marker = IndexMarker::new();
	let err = MarkerError::InvalidRange { start: 9, end: 3 };

	assert_eq!(marker.mark_range(9, 3), Err(err.clone()));
	assert_eq!(marker.unmark_range(9, 3), Err(err.clone()));
	assert_eq!(marker.range_status(9, 3), Err(err.clone()));
	assert_eq!(marker.marked_ranges(9, 3), Err(err));
	assert_eq!(marker.mark(u64::MAX), Err(MarkerError::InvalidIndex(u64::MAX)));
}

#[test]
fn first_marked_and_unmarked_follow_inversion() {
	let mut marker = IndexMarker::new();
	assert_eq!(marker.first_marked(0), None);
	assert_eq!(marker.first_unmarked(0), Some(0));

	marker.mark_range(5, 9).unwrap();
	marker.mark(20).unwrap();
	assert_eq!(marker.first_marked(0), Some(5));
	assert_eq!(marker.first_marked(7), Some(7));
	assert_eq!(marker.first_marked(10), Some(20));
	assert_eq!(marker.first_unmarked(5), Some(10));

	marker.invert();
	assert_eq!(marker.first_marked(5), Some(10));
	assert_eq!(marker.first_marked(0), Some(0));
	assert_eq!(marker.first_unmarked(0), Some(5));
	assert_eq!(marker.first_unmarked(10), Some(20));
	assert_eq!(marker.first_unmarked(21), None);
}

#[test]
fn enumerates_runs_inside_a_window() {
	let mut marker = IndexMarker::new();
	marker.mark_range(5, 9).unwrap();
	marker.mark_range(15, 30).unwrap();

	let marked = marker.marked_ranges(0, 20).unwrap();
	assert_eq!(
		marked,
		vec![IndexRange { start: 5, end: 9 }, IndexRange { start: 15, end: 20 }]
	);

	marker.invert();
	let unmarked = marker.unmarked_ranges(0, 20).unwrap();
	assert_eq!(unmarked, marked);
	assert_eq!(
		marker.marked_ranges(0, 20).unwrap(),
		vec![
			IndexRange { start: 0, end: 4 },
			IndexRange { start: 10, end: 14 },
		]
	);
}

#[test]
fn selections_dispatch_to_matching_operation() {
	let mut marker = IndexMarker::new();

	marker.mark_selection(&"10-20".parse().unwrap()).unwrap();
	marker.unmark_selection(&IndexSelection::Index(15)).unwrap();
	marker.mark_selection(&IndexSelection::Set(vec![40, 41])).unwrap();

	assert_eq!(
		marker.selection_status(&"10-14".parse().unwrap()),
		Ok(RangeStatus::AllMarked)
	);
	assert_eq!(
		marker.selection_status(&"10-20".parse().unwrap()),
		Ok(RangeStatus::Mixed)
	);
	assert_eq!(
		marker.selection_status(&IndexSelection::Index(15)),
		Ok(RangeStatus::NoneMarked)
	);
	assert_eq!(
		marker.selection_status(&"40,41".parse().unwrap()),
		Ok(RangeStatus::AllMarked)
	);
}
