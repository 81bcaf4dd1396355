//! Task state machine.
//!
//! ```text
//! pending ──start──▶ running/active ◀──resume── running/paused
//!                         │  └────────pause────────▶ │
//!                         └──────complete──────┬─────┘
//!                                              ▼
//!             running/active ◀──reopen── completed
//! ```
//!
//! `apply` is pure: it looks at the current task list, decides whether the
//! event is allowed and returns the record to persist together with the
//! counter adjustment for the owning routine. Rejections are `SkipReason`s;
//! the caller ignores them without writing anything.

use chrono::{DateTime, Utc};

use super::duration;
use super::errors::SkipReason;
use super::ids::{RoutineId, TaskId};
use super::routine::CounterDelta;
use super::state::TaskState;
use super::task::{PauseSpan, TaskRecord};

/// Events accepted by a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Start,
    Pause,
    Resume,
    Complete,
    Reopen,
    Delete,
    Rename(String),
}

impl TaskEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Complete => "complete",
            Self::Reopen => "reopen",
            Self::Delete => "delete",
            Self::Rename(_) => "rename",
        }
    }
}

/// What the caller must persist after an accepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEffect {
    Update {
        task: TaskRecord,
        counters: CounterDelta,
    },
    Remove {
        task_id: TaskId,
        routine_id: RoutineId,
        counters: CounterDelta,
    },
}

impl TaskEffect {
    pub fn counters(&self) -> CounterDelta {
        match self {
            Self::Update { counters, .. } | Self::Remove { counters, .. } => *counters,
        }
    }
}

/// The task currently running/active among `tasks`, if any.
pub fn active_task(tasks: &[TaskRecord]) -> Option<&TaskRecord> {
    tasks.iter().find(|t| t.state.is_active())
}

/// Validate `event` for `task_id` against the task list and compute its effect.
pub fn apply(
    tasks: &[TaskRecord],
    task_id: TaskId,
    event: &TaskEvent,
    now: DateTime<Utc>,
) -> Result<TaskEffect, SkipReason> {
    let current = tasks
        .iter()
        .find(|t| t.task_id == task_id)
        .ok_or(SkipReason::TaskNotFound(task_id))?;

    let invalid = || SkipReason::InvalidTaskState {
        event: event.name(),
        state: current.state,
    };

    // At most one running/active task per routine.
    let ensure_none_active = || match active_task(tasks) {
        Some(other) if other.task_id != task_id => Err(SkipReason::AnotherTaskActive(other.task_id)),
        _ => Ok(()),
    };

    let mut task = current.clone();
    let mut counters = CounterDelta::NONE;

    match event {
        TaskEvent::Start => {
            if current.state != TaskState::Pending {
                return Err(invalid());
            }
            ensure_none_active()?;
            let acc = duration::on_start(now);
            task.state = TaskState::ACTIVE;
            task.started_at = acc.started_at;
            task.resting_seconds = acc.resting_seconds;
            task.resting_pause_seconds = acc.resting_pause_seconds;
            task.paused_at = None;
            task.pauses.clear();
        }
        TaskEvent::Pause => {
            if !current.state.is_active() {
                return Err(invalid());
            }
            task.resting_seconds =
                duration::on_pause(current.resting_seconds, current.started_at, now)
                    .ok_or(SkipReason::NoRunningTimer)?;
            task.state = TaskState::PAUSED;
            task.started_at = None;
            task.paused_at = Some(now);
        }
        TaskEvent::Resume => {
            if !current.state.is_paused() {
                return Err(invalid());
            }
            ensure_none_active()?;
            close_open_pause(&mut task, now);
            task.state = TaskState::ACTIVE;
            task.started_at = Some(duration::on_resume(now));
        }
        TaskEvent::Complete => {
            if !current.state.is_running() {
                return Err(invalid());
            }
            task.resting_seconds = duration::on_complete(
                current.resting_seconds,
                current.started_at,
                current.state.is_active(),
                now,
            );
            close_open_pause(&mut task, now);
            task.state = TaskState::Completed;
            task.started_at = None;
            task.completed_at = Some(now);
            counters = CounterDelta::completed(1);
        }
        TaskEvent::Reopen => {
            if !current.state.is_completed() {
                return Err(invalid());
            }
            ensure_none_active()?;
            task.state = TaskState::ACTIVE;
            task.started_at = Some(now);
            task.completed_at = None;
            counters = CounterDelta::completed(-1);
        }
        TaskEvent::Delete => {
            let completed = if current.state.is_completed() { -1 } else { 0 };
            return Ok(TaskEffect::Remove {
                task_id,
                routine_id: current.routine_id,
                counters: CounterDelta {
                    total: -1,
                    completed,
                },
            });
        }
        TaskEvent::Rename(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(SkipReason::EmptyName);
            }
            task.name = trimmed.to_string();
        }
    }

    Ok(TaskEffect::Update { task, counters })
}

fn close_open_pause(task: &mut TaskRecord, now: DateTime<Utc>) {
    if let Some(since) = task.paused_at.take() {
        task.resting_pause_seconds = duration::close_pause(task.resting_pause_seconds, Some(since), now);
        task.pauses.push(PauseSpan {
            started_at: since,
            ended_at: now,
        });
    }
}
