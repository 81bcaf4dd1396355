//! InMemoryRoutineStore - 開発用・テスト用の正本
//!
//! # 実装詳細
//! - `tokio::sync::Mutex` で状態全体を排他制御
//! - 購読者ごとに `watch::Sender` とフィルタを保持し、書き込みのたびに
//!   フィルタに一致する全件を再計算して配送する
//! - `set_failing(true)` で書き込みを失敗させられる（永続化エラーの再現用）
//! - `fail_only(op)` なら指定した書き込みだけが失敗する（途中失敗の再現用）
//!
//! # 使用例
//! ```ignore
//! let store = Arc::new(InMemoryRoutineStore::new());
//! let mut rx = store.watch_tasks(filter).await?;
//! store.insert_task(task).await?;
//! rx.changed().await?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tracing::{debug, trace};

use crate::domain::{
    CounterDelta, OwnerId, RoutineId, RoutineRecord, RoutineStatus, RoutineTiming, TaskId,
    TaskRecord,
};
use crate::ports::{RoutineFilter, RoutineStore, StoreError, TaskFilter};

struct StoreState {
    routines: HashMap<RoutineId, RoutineRecord>,
    tasks: HashMap<TaskId, TaskRecord>,
    routine_watchers: Vec<(RoutineFilter, watch::Sender<Vec<RoutineRecord>>)>,
    task_watchers: Vec<(TaskFilter, watch::Sender<Vec<TaskRecord>>)>,
}

impl StoreState {
    fn new() -> Self {
        Self {
            routines: HashMap::new(),
            tasks: HashMap::new(),
            routine_watchers: Vec::new(),
            task_watchers: Vec::new(),
        }
    }

    fn select_routines(&self, filter: &RoutineFilter) -> Vec<RoutineRecord> {
        let mut out: Vec<RoutineRecord> = self
            .routines
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.created_on
                .cmp(&b.created_on)
                .then(a.routine_id.cmp(&b.routine_id))
        });
        out
    }

    fn select_tasks(&self, filter: &TaskFilter) -> Vec<TaskRecord> {
        let mut out: Vec<TaskRecord> = self
            .tasks
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.task_id.cmp(&b.task_id)));
        out
    }

    /// Push the current snapshot to every live subscriber and drop the closed ones.
    fn publish(&mut self) {
        let routine_watchers = std::mem::take(&mut self.routine_watchers);
        self.routine_watchers = routine_watchers
            .into_iter()
            .filter(|(_, tx)| !tx.is_closed())
            .collect();
        for (filter, tx) in &self.routine_watchers {
            let snapshot = self.select_routines(filter);
            tx.send_if_modified(|current| replace_if_changed(current, snapshot));
        }

        let task_watchers = std::mem::take(&mut self.task_watchers);
        self.task_watchers = task_watchers
            .into_iter()
            .filter(|(_, tx)| !tx.is_closed())
            .collect();
        for (filter, tx) in &self.task_watchers {
            let snapshot = self.select_tasks(filter);
            tx.send_if_modified(|current| replace_if_changed(current, snapshot));
        }
    }

    fn routine_mut(&mut self, routine_id: RoutineId) -> Result<&mut RoutineRecord, StoreError> {
        self.routines
            .get_mut(&routine_id)
            .ok_or_else(|| StoreError::routine_not_found(routine_id))
    }
}

fn replace_if_changed<T: PartialEq>(current: &mut Vec<T>, next: Vec<T>) -> bool {
    if *current == next {
        return false;
    }
    *current = next;
    true
}

/// InMemoryRoutineStore はプロセス内の RoutineStore 実装
///
/// 同じ `Arc<InMemoryRoutineStore>` を複数の Session に渡すと、
/// 複数クライアントが同じ文書を購読する状況を再現できます。
pub struct InMemoryRoutineStore {
    state: Mutex<StoreState>,
    failing: AtomicBool,
    failing_op: std::sync::Mutex<Option<&'static str>>,
}

impl InMemoryRoutineStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::new()),
            failing: AtomicBool::new(false),
            failing_op: std::sync::Mutex::new(None),
        }
    }

    /// While set, every write fails with `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// While set, only the write named `op` (e.g. `"adjust_counters"`) fails.
    pub fn fail_only(&self, op: Option<&'static str>) {
        *self.failing_op.lock().unwrap_or_else(|e| e.into_inner()) = op;
    }

    fn check_writable(&self, op: &'static str) -> Result<(), StoreError> {
        let targeted = *self.failing_op.lock().unwrap_or_else(|e| e.into_inner()) == Some(op);
        if targeted || self.failing.load(Ordering::SeqCst) {
            debug!(op, "injected store failure");
            return Err(StoreError::Unavailable(format!("{op}: store is offline")));
        }
        Ok(())
    }

    pub async fn routine(&self, routine_id: RoutineId) -> Option<RoutineRecord> {
        self.state.lock().await.routines.get(&routine_id).cloned()
    }

    pub async fn task(&self, task_id: TaskId) -> Option<TaskRecord> {
        self.state.lock().await.tasks.get(&task_id).cloned()
    }
}

impl Default for InMemoryRoutineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoutineStore for InMemoryRoutineStore {
    async fn insert_routine(&self, routine: RoutineRecord) -> Result<(), StoreError> {
        self.check_writable("insert_routine")?;
        let mut state = self.state.lock().await;
        if state.routines.contains_key(&routine.routine_id) {
            return Err(StoreError::AlreadyExists {
                entity: "routine",
                id: routine.routine_id.to_string(),
            });
        }
        trace!(routine_id = %routine.routine_id, "insert routine");
        state.routines.insert(routine.routine_id, routine);
        state.publish();
        Ok(())
    }

    async fn update_routine_timing(
        &self,
        routine_id: RoutineId,
        timing: RoutineTiming,
    ) -> Result<(), StoreError> {
        self.check_writable("update_routine_timing")?;
        let mut state = self.state.lock().await;
        state.routine_mut(routine_id)?.timing = timing;
        trace!(%routine_id, status = %timing.status, "update routine timing");
        state.publish();
        Ok(())
    }

    async fn adjust_counters(
        &self,
        routine_id: RoutineId,
        delta: CounterDelta,
    ) -> Result<(), StoreError> {
        self.check_writable("adjust_counters")?;
        let mut state = self.state.lock().await;
        state.routine_mut(routine_id)?.counters.apply(delta);
        trace!(%routine_id, total = delta.total, completed = delta.completed, "adjust counters");
        state.publish();
        Ok(())
    }

    async fn routines(&self, filter: &RoutineFilter) -> Result<Vec<RoutineRecord>, StoreError> {
        Ok(self.state.lock().await.select_routines(filter))
    }

    async fn last_completed_routine(
        &self,
        owner_id: &OwnerId,
    ) -> Result<Option<RoutineRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .routines
            .values()
            .filter(|r| &r.owner_id == owner_id && r.status() == RoutineStatus::Completed)
            .max_by_key(|r| (r.timing.ended_at, r.routine_id))
            .cloned())
    }

    async fn insert_task(&self, task: TaskRecord) -> Result<(), StoreError> {
        self.check_writable("insert_task")?;
        let mut state = self.state.lock().await;
        if state.tasks.contains_key(&task.task_id) {
            return Err(StoreError::AlreadyExists {
                entity: "task",
                id: task.task_id.to_string(),
            });
        }
        trace!(task_id = %task.task_id, routine_id = %task.routine_id, "insert task");
        state.tasks.insert(task.task_id, task);
        state.publish();
        Ok(())
    }

    async fn put_task(&self, task: TaskRecord) -> Result<(), StoreError> {
        self.check_writable("put_task")?;
        let mut state = self.state.lock().await;
        let slot = state
            .tasks
            .get_mut(&task.task_id)
            .ok_or_else(|| StoreError::task_not_found(task.task_id))?;
        trace!(task_id = %task.task_id, state = %task.state, "put task");
        *slot = task;
        state.publish();
        Ok(())
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), StoreError> {
        self.check_writable("delete_task")?;
        let mut state = self.state.lock().await;
        state
            .tasks
            .remove(&task_id)
            .ok_or_else(|| StoreError::task_not_found(task_id))?;
        trace!(%task_id, "delete task");
        state.publish();
        Ok(())
    }

    async fn tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError> {
        Ok(self.state.lock().await.select_tasks(filter))
    }

    async fn watch_routines(
        &self,
        filter: RoutineFilter,
    ) -> Result<watch::Receiver<Vec<RoutineRecord>>, StoreError> {
        let mut state = self.state.lock().await;
        let (tx, rx) = watch::channel(state.select_routines(&filter));
        debug!(owner_id = %filter.owner_id, open_only = filter.open_only, "routine subscription");
        state.routine_watchers.push((filter, tx));
        Ok(rx)
    }

    async fn watch_tasks(
        &self,
        filter: TaskFilter,
    ) -> Result<watch::Receiver<Vec<TaskRecord>>, StoreError> {
        let mut state = self.state.lock().await;
        let (tx, rx) = watch::channel(state.select_tasks(&filter));
        debug!(routine_id = %filter.routine_id, "task subscription");
        state.task_watchers.push((filter, tx));
        Ok(rx)
    }
}
