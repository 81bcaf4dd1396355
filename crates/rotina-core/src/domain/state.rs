//! State - ルーティンとタスクの状態
//!
//! 永続化スキーマ上は `status` と `sub_status` の 2 フィールドですが、
//! sub_status は status = running のときだけ意味を持つので、
//! Rust 側では 1 つの enum にまとめて不正な組み合わせを表現不能にしています。

use serde::{Deserialize, Serialize};
use std::fmt;

/// RoutineStatus はルーティンのライフサイクル
///
/// ```text
/// created → running → completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineStatus {
    Created,
    Running,
    Completed,
}

impl RoutineStatus {
    /// Valid next states from the current state.
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Created => &[Self::Running],
            Self::Running => &[Self::Completed],
            Self::Completed => &[],
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Created or running: the routine still occupies the owner's single open slot.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Completed)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RoutineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SubStatus は running 中のタスクの細分状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubStatus {
    /// Timer is counting (task-start timestamp present).
    Active,
    /// Timer is stopped but the task is not finished.
    Paused,
}

/// TaskState はタスクの状態
///
/// State transitions:
/// - Pending -> Running(Active)
/// - Running(Active) <-> Running(Paused)
/// - Running(_) -> Completed
/// - Completed -> Running(Active) (reopen)
///
/// Serialized adjacently tagged, e.g. `{"status":"running","sub_status":"paused"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "sub_status", rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running(SubStatus),
    Completed,
}

impl TaskState {
    pub const ACTIVE: Self = Self::Running(SubStatus::Active);
    pub const PAUSED: Self = Self::Running(SubStatus::Paused);

    /// Running with the timer counting.
    pub fn is_active(self) -> bool {
        self == Self::ACTIVE
    }

    pub fn is_paused(self) -> bool {
        self == Self::PAUSED
    }

    /// Running, either active or paused.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running(_))
    }

    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn sub_status(self) -> Option<SubStatus> {
        match self {
            Self::Running(sub) => Some(sub),
            Self::Pending | Self::Completed => None,
        }
    }

    /// Ordering bucket of the task list: running first, then pending, then completed.
    pub(crate) fn list_rank(self) -> u8 {
        match self {
            Self::Running(_) => 0,
            Self::Pending => 1,
            Self::Completed => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running(SubStatus::Active) => "running/active",
            Self::Running(SubStatus::Paused) => "running/paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
