//! Task record: one independently timed unit of work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::duration::elapsed_seconds;
use super::ids::{OwnerId, RoutineId, TaskId};
use super::state::TaskState;

/// A closed pause interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseSpan {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl PauseSpan {
    pub fn seconds(&self) -> i64 {
        elapsed_seconds(self.started_at, self.ended_at)
    }
}

/// Persisted task.
///
/// Design:
/// - Records are replaced whole on every transition (last write wins).
/// - Transitions are computed by `task_machine`, never by poking fields from
///   the outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub routine_id: RoutineId,
    pub owner_id: OwnerId,
    pub name: String,

    #[serde(flatten)]
    pub state: TaskState,

    /// Set while running/active only.
    pub started_at: Option<DateTime<Utc>>,

    /// Set while running/paused only.
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,

    /// Time accumulated by previous active spans (current span excluded).
    pub resting_seconds: i64,

    /// Time accumulated by closed pause spans.
    pub resting_pause_seconds: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pauses: Vec<PauseSpan>,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// New pending task with zeroed durations.
    pub fn pending(
        task_id: TaskId,
        routine_id: RoutineId,
        owner_id: OwnerId,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            routine_id,
            owner_id,
            name: name.into(),
            state: TaskState::Pending,
            started_at: None,
            paused_at: None,
            resting_seconds: 0,
            resting_pause_seconds: 0,
            pauses: Vec::new(),
            created_at,
            completed_at: None,
        }
    }

    /// Resting duration plus the current active span, if any.
    pub fn live_seconds(&self, now: DateTime<Utc>) -> i64 {
        match self.started_at {
            Some(start) if self.state.is_active() => {
                self.resting_seconds + elapsed_seconds(start, now)
            }
            _ => self.resting_seconds,
        }
    }

    /// Resting pause duration plus the current pause span, if any.
    pub fn live_pause_seconds(&self, now: DateTime<Utc>) -> i64 {
        match self.paused_at {
            Some(since) if self.state.is_paused() => {
                self.resting_pause_seconds + elapsed_seconds(since, now)
            }
            _ => self.resting_pause_seconds,
        }
    }
}
