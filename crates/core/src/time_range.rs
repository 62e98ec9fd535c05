//! # Time Range Utilities
//!
//! Pure functions for comparing lesson time windows. All comparisons in the
//! scheduling core operate on half-open `[start, end)` intervals in UTC, so
//! back-to-back slots (one ending exactly when the next starts) never count
//! as overlapping.
//!
//! Every sub-case of interval intersection (new start inside existing, new
//! end inside existing, new range fully containing the existing one) reduces
//! to the single predicate in [`overlaps`]. Callers must not special-case
//! them separately — naive three-branch checks miss the containment case.

use chrono::{DateTime, Duration, FixedOffset, Utc};

/// Minimum notice, in hours, required to cancel a booking before the lesson
/// starts.
pub const CANCELLATION_NOTICE_HOURS: i64 = 24;

/// Returns true if the half-open intervals `[a_start, a_end)` and
/// `[b_start, b_end)` share at least one instant.
///
/// Two ranges overlap unless one ends at or before the other starts:
/// `a_start < b_end && b_start < a_end`. The predicate is symmetric in its
/// arguments.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Converts a timestamp carrying an explicit offset to UTC.
///
/// Request payloads deserialize with whatever offset the client sent; all
/// persisted and compared timestamps carry UTC semantics, so every inbound
/// timestamp passes through here before the scheduling rules see it.
pub fn normalize_to_utc(timestamp: DateTime<FixedOffset>) -> DateTime<Utc> {
    timestamp.with_timezone(&Utc)
}

/// Returns true if a booking on a slot starting at `slot_start` may still be
/// cancelled at `now`.
///
/// Cancellation requires strictly more than [`CANCELLATION_NOTICE_HOURS`]
/// hours of notice, for students and teachers alike.
pub fn cancellation_window_open(now: DateTime<Utc>, slot_start: DateTime<Utc>) -> bool {
    slot_start.signed_duration_since(now) > Duration::hours(CANCELLATION_NOTICE_HOURS)
}
