use crate::marker::IndexRange;

use itertools::Itertools;

/// Render ranges as `"3, 7-9, 42"`.
pub fn format_ranges(ranges: &[IndexRange]) -> String {
	if ranges.is_empty() {
		return "none".to_string();
	}
	ranges.iter().join(", ")
}
