//! RoutineStore port - 永続化レイヤーの抽象化
//!
//! RoutineStore はルーティンとタスクのレコードの正本（source of truth）です。
//!
//! # 設計原則
//! - タスクはレコード単位で置き換え（last write wins）
//! - ルーティンのカウンタは `adjust_counters` によるアトミックな増減のみ
//!   （read-modify-write の競合を避ける）
//! - 購読は差分ではなく「フィルタに一致する全件のスナップショット」を配送する

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::{
    CounterDelta, OwnerId, RoutineId, RoutineRecord, RoutineTiming, TaskId, TaskRecord,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn routine_not_found(id: RoutineId) -> Self {
        Self::NotFound {
            entity: "routine",
            id: id.to_string(),
        }
    }

    pub fn task_not_found(id: TaskId) -> Self {
        Self::NotFound {
            entity: "task",
            id: id.to_string(),
        }
    }
}

/// Routines of one owner, optionally restricted to created/running ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineFilter {
    pub owner_id: OwnerId,
    pub open_only: bool,
}

impl RoutineFilter {
    pub fn open(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            open_only: true,
        }
    }

    pub fn matches(&self, routine: &RoutineRecord) -> bool {
        routine.owner_id == self.owner_id && (!self.open_only || routine.is_open())
    }
}

/// Tasks of one routine belonging to one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub routine_id: RoutineId,
    pub owner_id: OwnerId,
}

impl TaskFilter {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        task.routine_id == self.routine_id && task.owner_id == self.owner_id
    }
}

/// RoutineStore は状態の正本
///
/// すべての書き込みは失敗しうる（`StoreError`）。呼び出し側は失敗時に
/// ローカル状態を変更せず、次のスナップショットを待つ。
#[async_trait]
pub trait RoutineStore: Send + Sync {
    async fn insert_routine(&self, routine: RoutineRecord) -> Result<(), StoreError>;

    /// Replace status/start/end/resting of a routine; counters are untouched.
    async fn update_routine_timing(
        &self,
        routine_id: RoutineId,
        timing: RoutineTiming,
    ) -> Result<(), StoreError>;

    /// Atomic increment/decrement of the task counters.
    async fn adjust_counters(
        &self,
        routine_id: RoutineId,
        delta: CounterDelta,
    ) -> Result<(), StoreError>;

    async fn routines(&self, filter: &RoutineFilter) -> Result<Vec<RoutineRecord>, StoreError>;

    /// The created/running routine of `owner_id`, if any.
    async fn open_routine(&self, owner_id: &OwnerId) -> Result<Option<RoutineRecord>, StoreError> {
        let filter = RoutineFilter::open(owner_id.clone());
        Ok(self.routines(&filter).await?.into_iter().next())
    }

    /// Most recently ended completed routine of `owner_id`.
    async fn last_completed_routine(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Option<RoutineRecord>, StoreError>;

    async fn insert_task(&self, task: TaskRecord) -> Result<(), StoreError>;

    /// Replace a whole task record. Fails with `NotFound` if it was deleted.
    async fn put_task(&self, task: TaskRecord) -> Result<(), StoreError>;

    async fn delete_task(&self, task_id: TaskId) -> Result<(), StoreError>;

    async fn tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError>;

    /// Push subscription: the receiver always holds the full matching set.
    async fn watch_routines(
        &self,
        filter: RoutineFilter,
    ) -> Result<watch::Receiver<Vec<RoutineRecord>>, StoreError>;

    async fn watch_tasks(
        &self,
        filter: TaskFilter,
    ) -> Result<watch::Receiver<Vec<TaskRecord>>, StoreError>;
}
