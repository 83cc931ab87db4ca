//! Record id allocation.
//!
//! Ids are creation timestamps in milliseconds. When the clock has not moved
//! past an id already in the list, the next id is bumped to stay unique and
//! increasing.

use chrono::Utc;

/// Allocate an id greater than every id in `existing`.
#[must_use]
pub fn next_id(existing: impl IntoIterator<Item = i64>) -> i64 {
    next_id_at(Utc::now().timestamp_millis(), existing)
}

/// Allocate an id at `now_ms`, bumped past the largest id in `existing`.
#[must_use]
pub fn next_id_at(now_ms: i64, existing: impl IntoIterator<Item = i64>) -> i64 {
    match existing.into_iter().max() {
        Some(max) if max >= now_ms => max.saturating_add(1),
        _ => now_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uses_clock_when_ahead() {
        assert_eq!(next_id_at(1_000, [10, 20]), 1_000);
    }

    #[test]
    fn test_bumps_past_existing() {
        assert_eq!(next_id_at(1_000, [1_000]), 1_001);
        assert_eq!(next_id_at(1_000, [5_000, 3]), 5_001);
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(next_id_at(42, []), 42);
    }

    #[test]
    fn test_next_id_is_increasing() {
        let first = next_id([]);
        let second = next_id([first]);
        assert!(second > first);
    }
}
