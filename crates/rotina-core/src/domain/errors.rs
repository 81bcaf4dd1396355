//! Errors - ガード違反とスキップ理由
//!
//! 状態機械が遷移を拒否する理由は 2 種類あります。
//! - **GuardViolation**: ユーザーに警告として見せるもの（ルーティンの作成・完了）
//! - **SkipReason**: 黙って無視するもの（タスク操作のガード、存在しない ID、空の名前）
//!
//! どちらも書き込みの前に判定され、永続化には一切触れません。

use thiserror::Error;

use super::ids::{RoutineId, TaskId};
use super::state::{RoutineStatus, TaskState};

/// User-facing guard violations. The operation is aborted before any write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardViolation {
    #[error("routine {routine_id} is still open; complete it before creating a new one")]
    RoutineAlreadyOpen { routine_id: RoutineId },

    #[error("task {task_id} is still running; complete it before completing the routine")]
    TaskStillRunning { task_id: TaskId },
}

/// Reasons a transition was silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("no open routine")]
    NoOpenRoutine,

    #[error("task {0} is already active")]
    AnotherTaskActive(TaskId),

    #[error("cannot {event} a task in state {state}")]
    InvalidTaskState {
        event: &'static str,
        state: TaskState,
    },

    #[error("cannot {event} a routine in state {status}")]
    InvalidRoutineStatus {
        event: &'static str,
        status: RoutineStatus,
    },

    #[error("no timer is running")]
    NoRunningTimer,

    #[error("task name is empty")]
    EmptyName,
}

/// Rejection from the routine state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Guard(GuardViolation),
    Skip(SkipReason),
}

impl From<GuardViolation> for Rejection {
    fn from(value: GuardViolation) -> Self {
        Self::Guard(value)
    }
}

impl From<SkipReason> for Rejection {
    fn from(value: SkipReason) -> Self {
        Self::Skip(value)
    }
}
