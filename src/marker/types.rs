use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Largest index a marker can record.
///
/// `u64::MAX` is kept out of the domain so that `end + 1` is always
/// representable when neighbouring ranges are merged.
pub const MAX_INDEX: u64 = u64::MAX - 1;

/// Errors raised by marker operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkerError {
	#[error("Invalid range: start {start} is greater than end {end}")]
	InvalidRange { start: u64, end: u64 },

	#[error("Invalid index: {0} exceeds the maximum index")]
	InvalidIndex(u64),

	#[error("Invalid index selection: {0}")]
	InvalidSelection(String),

	#[error("Corrupt marker state: {0}")]
	CorruptState(String),
}

/// A closed interval `[start, end]` of indices. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexRange {
	pub start: u64,
	pub end: u64,
}

impl IndexRange {
	/// Build a range, validating ordering and bounds.
	pub fn new(start: u64, end: u64) -> Result<Self, MarkerError> {
		if start > end {
			return Err(MarkerError::InvalidRange { start, end });
		}
		if end > MAX_INDEX {
			return Err(MarkerError::InvalidIndex(end));
		}
		Ok(Self { start, end })
	}

	/// A range covering exactly one index.
	pub fn single(index: u64) -> Result<Self, MarkerError> {
		Self::new(index, index)
	}

	pub fn contains(&self, index: u64) -> bool {
		self.start <= index && index <= self.end
	}

	/// Number of indices covered by the range.
	pub fn len(&self) -> u64 {
		self.end - self.start + 1
	}

	/// A range always covers at least one index.
	pub fn is_empty(&self) -> bool {
		false
	}
}

impl fmt::Display for IndexRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.start == self.end {
			write!(f, "{}", self.start)
		} else {
			write!(f, "{}-{}", self.start, self.end)
		}
	}
}

/// Result of evaluating a closed range against a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeStatus {
	/// Every index in the range is marked
	AllMarked,
	/// No index in the range is marked
	NoneMarked,
	/// The range contains both marked and unmarked indices
	Mixed,
}

impl RangeStatus {
	/// Swap `AllMarked` and `NoneMarked`, leaving `Mixed` untouched.
	pub fn inverted(self) -> Self {
		match self {
			RangeStatus::AllMarked => RangeStatus::NoneMarked,
			RangeStatus::NoneMarked => RangeStatus::AllMarked,
			RangeStatus::Mixed => RangeStatus::Mixed,
		}
	}

	/// `Some(true)` if all marked, `Some(false)` if none, `None` if mixed.
	pub fn as_bool(self) -> Option<bool> {
		match self {
			RangeStatus::AllMarked => Some(true),
			RangeStatus::NoneMarked => Some(false),
			RangeStatus::Mixed => None,
		}
	}
}

impl fmt::Display for RangeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			RangeStatus::AllMarked => "all marked",
			RangeStatus::NoneMarked => "none marked",
			RangeStatus::Mixed => "mixed",
		};
		f.write_str(label)
	}
}

/// The three call shapes accepted by mark, unmark and status queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSelection {
	/// A single index
	Index(u64),
	/// An unordered collection of indices; duplicates are harmless
	Set(Vec<u64>),
	/// A closed range of indices
	Range(IndexRange),
}

impl FromStr for IndexSelection {
	type Err = MarkerError;

	/// Parses `"5"`, `"3,7,42"` or `"10-20"`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		let parse = |part: &str| {
			part.trim().parse::<u64>().map_err(|e| {
				MarkerError::InvalidSelection(format!("Failed to parse index {:?}: {}", part, e))
			})
		};

		if s.contains(',') {
			let indices = s.split(',').map(parse).collect::<Result<Vec<_>, _>>()?;
			return Ok(IndexSelection::Set(indices));
		}
		if let Some((start, end)) = s.split_once('-') {
			return Ok(IndexSelection::Range(IndexRange::new(parse(start)?, parse(end)?)?));
		}
		Ok(IndexSelection::Index(parse(s)?))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn range_rejects_reversed_bounds() {
		assert_eq!(
			IndexRange::new(5, 4),
			Err(MarkerError::InvalidRange { start: 5, end: 4 })
		);
		assert_eq!(IndexRange::new(0, u64::MAX), Err(MarkerError::InvalidIndex(u64::MAX)));
		assert_eq!(IndexRange::new(3, 3).map(|r| r.len()), Ok(1));
	}

	#[test]
	fn status_inversion_keeps_mixed() {
		assert_eq!(RangeStatus::AllMarked.inverted(), RangeStatus::NoneMarked);
		assert_eq!(RangeStatus::NoneMarked.inverted(), RangeStatus::AllMarked);
		assert_eq!(RangeStatus::Mixed.inverted(), RangeStatus::Mixed);
		assert_eq!(RangeStatus::Mixed.as_bool(), None);
	}

	#[test]
	fn parses_selections() {
		assert_eq!("42".parse(), Ok(IndexSelection::Index(42)));
		assert_eq!("3, 7,42".parse(), Ok(IndexSelection::Set(vec![3, 7, 42])));
		assert_eq!(
			"10-20".parse(),
			Ok(IndexSelection::Range(IndexRange { start: 10, end: 20 }))
		);
		assert!("20-10".parse::<IndexSelection>().is_err());
		assert!("ten".parse::<IndexSelection>().is_err());
	}
}
