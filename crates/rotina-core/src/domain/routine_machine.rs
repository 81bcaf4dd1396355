//! Routine state machine.
//!
//! ```text
//! (none) ──create──▶ created ──start──▶ running ──complete──▶ completed
//! ```
//!
//! Creating a second open routine and completing a routine while a task is
//! still running are user-facing guard violations. Events sent from the
//! wrong state are skipped silently.

use chrono::{DateTime, Utc};

use super::duration::elapsed_seconds;
use super::errors::{GuardViolation, Rejection, SkipReason};
use super::ids::{OwnerId, RoutineId};
use super::routine::{RoutineRecord, RoutineTiming};
use super::state::RoutineStatus;
use super::task::TaskRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineEvent {
    Start,
    Complete,
}

impl RoutineEvent {
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
        }
    }
}

/// Build a new routine unless the owner still has an open one.
pub fn create(
    open: Option<&RoutineRecord>,
    routine_id: RoutineId,
    owner_id: OwnerId,
    now: DateTime<Utc>,
) -> Result<RoutineRecord, GuardViolation> {
    if let Some(existing) = open.filter(|r| r.is_open()) {
        return Err(GuardViolation::RoutineAlreadyOpen {
            routine_id: existing.routine_id,
        });
    }
    Ok(RoutineRecord::new(routine_id, owner_id, now))
}

/// Validate `event` against the routine and its tasks and return the new timing.
pub fn apply(
    routine: &RoutineRecord,
    tasks: &[TaskRecord],
    event: RoutineEvent,
    now: DateTime<Utc>,
) -> Result<RoutineTiming, Rejection> {
    let status = routine.status();
    let target = match event {
        RoutineEvent::Start => RoutineStatus::Running,
        RoutineEvent::Complete => RoutineStatus::Completed,
    };
    if !status.can_transition_to(target) {
        return Err(SkipReason::InvalidRoutineStatus {
            event: event.name(),
            status,
        }
        .into());
    }

    let mut timing = routine.timing;
    match event {
        RoutineEvent::Start => {
            timing.status = RoutineStatus::Running;
            timing.started_at = Some(now);
        }
        RoutineEvent::Complete => {
            // Active or paused both block completion.
            if let Some(running) = tasks
                .iter()
                .find(|t| t.routine_id == routine.routine_id && t.state.is_running())
            {
                return Err(GuardViolation::TaskStillRunning {
                    task_id: running.task_id,
                }
                .into());
            }
            let started_at = timing.started_at.ok_or(SkipReason::NoRunningTimer)?;
            timing.status = RoutineStatus::Completed;
            timing.ended_at = Some(now);
            timing.resting_seconds = elapsed_seconds(started_at, now);
        }
    }
    Ok(timing)
}
