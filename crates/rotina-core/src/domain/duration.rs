//! Duration accumulator: resting durations from timestamped transitions.
//!
//! Everything here is a pure function of its inputs and `now`. Persisted
//! durations are whole seconds; every elapsed span is rounded to the nearest
//! second (never truncated) at the moment it is folded into a resting value.

use chrono::{DateTime, Utc};

/// Whole seconds between `since` and `now`, rounded half up.
///
/// A negative span (clock skew between clients) counts as zero so resting
/// durations never decrease.
pub fn elapsed_seconds(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (now - since).num_milliseconds().max(0);
    (millis + 500) / 1000
}

/// Timer fields of a task after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accumulated {
    /// Task-start timestamp; `None` means no timer is currently counting.
    pub started_at: Option<DateTime<Utc>>,
    pub resting_seconds: i64,
    pub resting_pause_seconds: i64,
}

/// Fresh start: history is reset.
pub fn on_start(now: DateTime<Utc>) -> Accumulated {
    Accumulated {
        started_at: Some(now),
        resting_seconds: 0,
        resting_pause_seconds: 0,
    }
}

/// Fold the active span into the resting duration and stop the timer.
///
/// Returns `None` when no timer is running (double pause).
pub fn on_pause(
    resting_seconds: i64,
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<i64> {
    started_at.map(|start| resting_seconds + elapsed_seconds(start, now))
}

/// Restart the timer. Resting duration is untouched (additive model).
pub fn on_resume(now: DateTime<Utc>) -> DateTime<Utc> {
    now
}

/// Final duration of a completed task.
pub fn on_complete(
    resting_seconds: i64,
    started_at: Option<DateTime<Utc>>,
    currently_active: bool,
    now: DateTime<Utc>,
) -> i64 {
    match started_at {
        Some(start) if currently_active => resting_seconds + elapsed_seconds(start, now),
        _ => resting_seconds,
    }
}

/// Fold an open pause span into the resting pause duration.
pub fn close_pause(
    resting_pause_seconds: i64,
    paused_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    match paused_at {
        Some(since) => resting_pause_seconds + elapsed_seconds(since, now),
        None => resting_pause_seconds,
    }
}
