//! Routine record and its counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::duration::elapsed_seconds;
use super::ids::{OwnerId, RoutineId};
use super::state::RoutineStatus;

/// Timing half of a routine record.
///
/// Written as a unit by the routine state machine. Counters live apart so that
/// a timing write never clobbers a concurrent counter increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineTiming {
    pub status: RoutineStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Authoritative only while status != running.
    pub resting_seconds: i64,
}

impl RoutineTiming {
    pub fn created() -> Self {
        Self {
            status: RoutineStatus::Created,
            started_at: None,
            ended_at: None,
            resting_seconds: 0,
        }
    }
}

/// Task counters kept on the routine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounters {
    pub total_tasks: u32,
    pub completed_tasks: u32,
}

impl TaskCounters {
    /// Apply an increment/decrement. Counters never go below zero.
    pub fn apply(&mut self, delta: CounterDelta) {
        self.total_tasks = self.total_tasks.saturating_add_signed(delta.total);
        self.completed_tasks = self.completed_tasks.saturating_add_signed(delta.completed);
    }
}

/// Atomic counter adjustment requested from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDelta {
    pub total: i32,
    pub completed: i32,
}

impl CounterDelta {
    pub const NONE: Self = Self {
        total: 0,
        completed: 0,
    };

    pub fn total(total: i32) -> Self {
        Self { total, completed: 0 }
    }

    pub fn completed(completed: i32) -> Self {
        Self {
            total: 0,
            completed,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::NONE
    }
}

/// Routine record: a bounded work session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineRecord {
    pub routine_id: RoutineId,
    pub owner_id: OwnerId,
    pub created_on: DateTime<Utc>,

    #[serde(flatten)]
    pub timing: RoutineTiming,

    #[serde(flatten)]
    pub counters: TaskCounters,
}

impl RoutineRecord {
    pub fn new(routine_id: RoutineId, owner_id: OwnerId, created_on: DateTime<Utc>) -> Self {
        Self {
            routine_id,
            owner_id,
            created_on,
            timing: RoutineTiming::created(),
            counters: TaskCounters::default(),
        }
    }

    pub fn status(&self) -> RoutineStatus {
        self.timing.status
    }

    pub fn is_open(&self) -> bool {
        self.timing.status.is_open()
    }

    /// True elapsed seconds: live while running, resting otherwise.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        match (self.timing.status, self.timing.started_at) {
            (RoutineStatus::Running, Some(start)) => {
                self.timing.resting_seconds + elapsed_seconds(start, now)
            }
            _ => self.timing.resting_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use ulid::Ulid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap()
    }

    fn routine() -> RoutineRecord {
        RoutineRecord::new(RoutineId::from_ulid(Ulid::new()), OwnerId::new("u1"), t0())
    }

    #[test]
    fn new_routine_starts_created_with_zero_counters() {
        let r = routine();
        assert_eq!(r.status(), RoutineStatus::Created);
        assert!(r.is_open());
        assert_eq!(r.counters, TaskCounters::default());
        assert_eq!(r.timing.resting_seconds, 0);
    }

    #[test]
    fn counters_never_underflow() {
        let mut counters = TaskCounters::default();
        counters.apply(CounterDelta::total(2));
        counters.apply(CounterDelta::completed(1));
        counters.apply(CounterDelta {
            total: -3,
            completed: -2,
        });
        assert_eq!(counters, TaskCounters::default());
    }

    #[test]
    fn elapsed_is_live_only_while_running() {
        let mut r = routine();
        let later = t0() + Duration::seconds(500);
        assert_eq!(r.elapsed_seconds(later), 0);

        r.timing.status = RoutineStatus::Running;
        r.timing.started_at = Some(t0());
        assert_eq!(r.elapsed_seconds(later), 500);

        r.timing.status = RoutineStatus::Completed;
        r.timing.resting_seconds = 420;
        assert_eq!(r.elapsed_seconds(later), 420);
    }

    #[test]
    fn record_serializes_flat() {
        let r = routine();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "created");
        assert_eq!(json["total_tasks"], 0);
        assert_eq!(json["resting_seconds"], 0);

        let back: RoutineRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
