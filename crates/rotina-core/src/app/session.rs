//! Session - 1 ユーザー分の作業コンテキスト
//!
//! # 責務
//! - ストアの購読（開いているルーティンと、そのタスク群）を保持する
//! - 状態機械でガードを判定し、許可された遷移だけを永続化する
//! - 書き込み後は購読スナップショットから状態を再構築する（差分は持たない）
//!
//! # 設計原則
//! - グローバル状態を持たない。Session はいくつでも並べられる
//! - 書き込みが失敗したらローカル状態は変えない（次のスナップショットを待つ）
//! - タスク操作のガード違反はエラーではなく `ActionOutcome::Skipped`

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::app::dashboard::{self, Dashboard};
use crate::app::live_clock::LiveInput;
use crate::domain::task_machine::{self, active_task};
use crate::domain::{
    routine_machine, CounterDelta, OwnerId, Rejection, RoutineEvent, RoutineId, RoutineRecord,
    SkipReason, StatsMemo, TaskEffect, TaskEvent, TaskId, TaskRecord,
};
use crate::error::{ActionOutcome, RotinaError};
use crate::ports::{Clock, IdGenerator, RoutineFilter, RoutineStore, StoreError, TaskFilter};

pub struct Session {
    store: Arc<dyn RoutineStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    owner_id: OwnerId,

    routine_rx: watch::Receiver<Vec<RoutineRecord>>,
    task_rx: Option<(RoutineId, watch::Receiver<Vec<TaskRecord>>)>,

    /// Open routine of the owner, as last seen.
    routine: Option<RoutineRecord>,
    /// Tasks of `routine`, kept sorted for display.
    tasks: Vec<TaskRecord>,

    /// Last completed routine and its tasks; shown when nothing is open.
    history: Option<(RoutineRecord, Vec<TaskRecord>)>,

    memo: StatsMemo,
    monitor_memo: StatsMemo,
}

impl Session {
    /// Subscribe to the owner's open routine and load the first snapshot.
    pub async fn open(
        store: Arc<dyn RoutineStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        owner_id: OwnerId,
    ) -> Result<Self, StoreError> {
        let routine_rx = store
            .watch_routines(RoutineFilter::open(owner_id.clone()))
            .await?;
        let mut session = Self {
            store,
            clock,
            ids,
            owner_id,
            routine_rx,
            task_rx: None,
            routine: None,
            tasks: Vec::new(),
            history: None,
            memo: StatsMemo::new(),
            monitor_memo: StatsMemo::new(),
        };
        session.sync().await?;
        debug!(owner_id = %session.owner_id, "session opened");
        Ok(session)
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn routine(&self) -> Option<&RoutineRecord> {
        self.routine.as_ref()
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn task(&self, task_id: TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn is_any_task_active(&self) -> bool {
        active_task(&self.tasks).is_some()
    }

    pub fn routine_live_input(&self) -> LiveInput {
        self.routine
            .as_ref()
            .map(LiveInput::for_routine)
            .unwrap_or_default()
    }

    pub fn task_live_input(&self) -> LiveInput {
        dashboard::live_task_input(&self.tasks)
    }

    /// View of the open routine at the current instant.
    pub fn dashboard(&mut self) -> Dashboard {
        let now = self.clock.now();
        Dashboard::build(self.routine.as_ref(), &self.tasks, now, &mut self.memo)
    }

    /// Open routine, or the last completed one when nothing is open.
    pub fn display_routine(&self) -> Option<&RoutineRecord> {
        self.routine
            .as_ref()
            .or(self.history.as_ref().map(|(r, _)| r))
    }

    /// Like `dashboard`, falling back to the last completed routine.
    pub fn monitoring(&mut self) -> Dashboard {
        let now = self.clock.now();
        let memo = &mut self.monitor_memo;
        match (&self.routine, &self.history) {
            (None, Some((routine, tasks))) => Dashboard::build(Some(routine), tasks, now, memo),
            _ => Dashboard::build(self.routine.as_ref(), &self.tasks, now, memo),
        }
    }

    /// Fetch the owner's last completed routine and its tasks.
    pub async fn load_history(&mut self) -> Result<(), StoreError> {
        self.history = match self.store.last_completed_routine(&self.owner_id).await? {
            Some(routine) => {
                let filter = TaskFilter {
                    routine_id: routine.routine_id,
                    owner_id: self.owner_id.clone(),
                };
                let tasks = self.store.tasks(&filter).await?;
                Some((routine, tasks))
            }
            None => None,
        };
        Ok(())
    }

    /// Re-derive local state from the latest snapshots.
    ///
    /// When the open routine changes, the task subscription moves with it.
    /// With no routine open, the last completed one is re-fetched, since
    /// any client may have closed a routine since the previous snapshot.
    pub async fn sync(&mut self) -> Result<(), StoreError> {
        let routine = self.routine_rx.borrow_and_update().first().cloned();
        let wanted = routine.as_ref().map(|r| r.routine_id);

        if self.task_rx.as_ref().map(|(id, _)| *id) != wanted {
            self.task_rx = match wanted {
                Some(routine_id) => {
                    let filter = TaskFilter {
                        routine_id,
                        owner_id: self.owner_id.clone(),
                    };
                    Some((routine_id, self.store.watch_tasks(filter).await?))
                }
                None => None,
            };
        }

        let mut tasks = match &mut self.task_rx {
            Some((_, rx)) => rx.borrow_and_update().clone(),
            None => Vec::new(),
        };
        dashboard::sort_tasks(&mut tasks);

        self.routine = routine;
        self.tasks = tasks;
        if self.routine.is_none() {
            self.load_history().await?;
        }
        Ok(())
    }

    /// Wait for the next pushed snapshot, then `sync`.
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        let result = match &mut self.task_rx {
            Some((_, task_rx)) => tokio::select! {
                r = self.routine_rx.changed() => r,
                r = task_rx.changed() => r,
            },
            None => self.routine_rx.changed().await,
        };
        result.map_err(|_| StoreError::Unavailable("subscription closed".to_string()))?;
        self.sync().await
    }

    pub async fn create_routine(&mut self) -> Result<ActionOutcome, RotinaError> {
        let now = self.clock.now();
        let routine = match routine_machine::create(
            self.routine.as_ref(),
            self.ids.generate_routine_id(),
            self.owner_id.clone(),
            now,
        ) {
            Ok(routine) => routine,
            Err(guard) => {
                warn!(owner_id = %self.owner_id, reason = %guard, "create routine rejected");
                return Err(guard.into());
            }
        };

        let routine_id = routine.routine_id;
        self.store
            .insert_routine(routine)
            .await
            .map_err(|e| store_failure("create_routine", e))?;
        info!(%routine_id, owner_id = %self.owner_id, "routine created");
        self.sync().await?;
        Ok(ActionOutcome::Applied)
    }

    pub async fn start_routine(&mut self) -> Result<ActionOutcome, RotinaError> {
        self.routine_action(RoutineEvent::Start).await
    }

    pub async fn complete_routine(&mut self) -> Result<ActionOutcome, RotinaError> {
        self.routine_action(RoutineEvent::Complete).await
    }

    async fn routine_action(&mut self, event: RoutineEvent) -> Result<ActionOutcome, RotinaError> {
        let Some(routine) = self.routine.as_ref() else {
            return Ok(skipped(event.name(), SkipReason::NoOpenRoutine));
        };
        let routine_id = routine.routine_id;
        let timing = match routine_machine::apply(routine, &self.tasks, event, self.clock.now()) {
            Ok(timing) => timing,
            Err(Rejection::Guard(guard)) => {
                warn!(%routine_id, event = event.name(), reason = %guard, "routine guard violated");
                return Err(guard.into());
            }
            Err(Rejection::Skip(reason)) => return Ok(skipped(event.name(), reason)),
        };

        self.store
            .update_routine_timing(routine_id, timing)
            .await
            .map_err(|e| store_failure(event.name(), e))?;
        info!(
            %routine_id,
            event = event.name(),
            status = %timing.status,
            resting_seconds = timing.resting_seconds,
            "routine transition"
        );
        self.sync().await?;
        Ok(ActionOutcome::Applied)
    }

    /// New pending task in the open routine; total count +1.
    ///
    /// If the counter write fails after the insert, the task is deleted
    /// again before the error is returned.
    pub async fn add_task(&mut self, name: &str) -> Result<ActionOutcome, RotinaError> {
        let Some(routine) = self.routine.as_ref() else {
            return Ok(skipped("add", SkipReason::NoOpenRoutine));
        };
        let name = name.trim();
        if name.is_empty() {
            return Ok(skipped("add", SkipReason::EmptyName));
        }

        let routine_id = routine.routine_id;
        let task = TaskRecord::pending(
            self.ids.generate_task_id(),
            routine_id,
            self.owner_id.clone(),
            name,
            self.clock.now(),
        );
        let task_id = task.task_id;

        self.store
            .insert_task(task)
            .await
            .map_err(|e| store_failure("add_task", e))?;
        if let Err(err) = self
            .store
            .adjust_counters(routine_id, CounterDelta::total(1))
            .await
        {
            if let Err(undo) = self.store.delete_task(task_id).await {
                warn!(%task_id, error = %undo, "orphan task left after counter failure");
            }
            return Err(store_failure("add_task", err));
        }
        info!(%task_id, %routine_id, task_name = name, "task added");
        self.sync().await?;
        Ok(ActionOutcome::Applied)
    }

    pub async fn start_task(&mut self, task_id: TaskId) -> Result<ActionOutcome, RotinaError> {
        self.task_action(task_id, TaskEvent::Start).await
    }

    pub async fn pause_task(&mut self, task_id: TaskId) -> Result<ActionOutcome, RotinaError> {
        self.task_action(task_id, TaskEvent::Pause).await
    }

    pub async fn resume_task(&mut self, task_id: TaskId) -> Result<ActionOutcome, RotinaError> {
        self.task_action(task_id, TaskEvent::Resume).await
    }

    pub async fn complete_task(&mut self, task_id: TaskId) -> Result<ActionOutcome, RotinaError> {
        self.task_action(task_id, TaskEvent::Complete).await
    }

    pub async fn reopen_task(&mut self, task_id: TaskId) -> Result<ActionOutcome, RotinaError> {
        self.task_action(task_id, TaskEvent::Reopen).await
    }

    pub async fn delete_task(&mut self, task_id: TaskId) -> Result<ActionOutcome, RotinaError> {
        self.task_action(task_id, TaskEvent::Delete).await
    }

    pub async fn rename_task(
        &mut self,
        task_id: TaskId,
        name: &str,
    ) -> Result<ActionOutcome, RotinaError> {
        self.task_action(task_id, TaskEvent::Rename(name.to_string()))
            .await
    }

    /// A task deleted elsewhere but still in the local snapshot is skipped
    /// as `TaskNotFound`. A counter write failing after the task write is
    /// returned as a store error and the counters keep their old values.
    async fn task_action(
        &mut self,
        task_id: TaskId,
        event: TaskEvent,
    ) -> Result<ActionOutcome, RotinaError> {
        let effect = match task_machine::apply(&self.tasks, task_id, &event, self.clock.now()) {
            Ok(effect) => effect,
            Err(reason) => return Ok(skipped(event.name(), reason)),
        };
        let counters = effect.counters();

        let routine_id = match effect {
            TaskEffect::Update { task, .. } => {
                let routine_id = task.routine_id;
                let state = task.state;
                let resting_seconds = task.resting_seconds;
                match self.store.put_task(task).await {
                    Ok(()) => {}
                    Err(StoreError::NotFound { entity: "task", .. }) => {
                        return self.vanished(task_id, event.name()).await;
                    }
                    Err(err) => return Err(store_failure(event.name(), err)),
                }
                info!(%task_id, event = event.name(), %state, resting_seconds, "task transition");
                routine_id
            }
            TaskEffect::Remove { routine_id, .. } => {
                match self.store.delete_task(task_id).await {
                    Ok(()) => {}
                    Err(StoreError::NotFound { entity: "task", .. }) => {
                        return self.vanished(task_id, event.name()).await;
                    }
                    Err(err) => return Err(store_failure(event.name(), err)),
                }
                info!(%task_id, %routine_id, "task deleted");
                routine_id
            }
        };

        if !counters.is_zero() {
            self.store
                .adjust_counters(routine_id, counters)
                .await
                .map_err(|e| store_failure(event.name(), e))?;
        }
        self.sync().await?;
        Ok(ActionOutcome::Applied)
    }

    async fn vanished(
        &mut self,
        task_id: TaskId,
        event: &'static str,
    ) -> Result<ActionOutcome, RotinaError> {
        debug!(%task_id, event, "task already gone from store");
        self.sync().await?;
        Ok(skipped(event, SkipReason::TaskNotFound(task_id)))
    }
}

fn skipped(event: &'static str, reason: SkipReason) -> ActionOutcome {
    debug!(event, %reason, "action skipped");
    ActionOutcome::Skipped(reason)
}

fn store_failure(op: &'static str, err: StoreError) -> RotinaError {
    error!(op, error = %err, "store write failed");
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GuardViolation, RoutineStatus, TaskState};
    use crate::impls::InMemoryRoutineStore;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    struct Harness {
        store: Arc<InMemoryRoutineStore>,
        clock: FixedClock,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Arc::new(InMemoryRoutineStore::new()),
                clock: FixedClock::new(t0()),
            }
        }

        async fn session(&self, owner: &str) -> Session {
            Session::open(
                self.store.clone(),
                Arc::new(self.clock.clone()),
                Arc::new(UlidGenerator::new(self.clock.clone())),
                OwnerId::new(owner),
            )
            .await
            .unwrap()
        }

        fn advance(&self, seconds: i64) {
            self.clock.advance(Duration::seconds(seconds));
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    fn id_of(session: &Session, name: &str) -> TaskId {
        session
            .tasks()
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.task_id)
            .unwrap()
    }

    /// Routine created and started with the given pending tasks.
    async fn running_session(h: &Harness, names: &[&str]) -> Session {
        let mut s = h.session("alice").await;
        s.create_routine().await.unwrap();
        for name in names {
            s.add_task(name).await.unwrap();
        }
        s.start_routine().await.unwrap();
        s
    }

    #[tokio::test]
    async fn pause_resume_complete_accumulates() {
        let h = Harness::new();
        let mut s = h.session("alice").await;
        s.create_routine().await.unwrap();
        s.add_task("Estudar").await.unwrap();
        assert_eq!(s.tasks()[0].state, TaskState::Pending);

        s.start_routine().await.unwrap();
        assert_eq!(s.routine().unwrap().status(), RoutineStatus::Running);

        let id = id_of(&s, "Estudar");
        s.start_task(id).await.unwrap();
        assert_eq!(s.task(id).unwrap().state, TaskState::ACTIVE);

        h.advance(125);
        s.pause_task(id).await.unwrap();
        let task = s.task(id).unwrap();
        assert_eq!(task.state, TaskState::PAUSED);
        assert_eq!(task.resting_seconds, 125);

        h.advance(20);
        s.resume_task(id).await.unwrap();
        assert_eq!(s.task(id).unwrap().state, TaskState::ACTIVE);

        h.advance(35);
        s.complete_task(id).await.unwrap();
        let task = s.task(id).unwrap();
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.resting_seconds, 160);
        assert_eq!(task.resting_pause_seconds, 20);
        assert_eq!(s.routine().unwrap().counters.completed_tasks, 1);
    }

    #[tokio::test]
    async fn second_task_cannot_start_while_one_is_active() {
        let h = Harness::new();
        let mut s = running_session(&h, &["one", "two"]).await;
        let one = id_of(&s, "one");
        let two = id_of(&s, "two");

        assert_eq!(s.start_task(one).await.unwrap(), ActionOutcome::Applied);
        let outcome = s.start_task(two).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Skipped(SkipReason::AnotherTaskActive(one)));
        assert_eq!(s.task(two).unwrap().state, TaskState::Pending);
        assert!(s.is_any_task_active());
    }

    #[tokio::test]
    async fn deleting_updates_counters_by_state() {
        let h = Harness::new();
        let mut s = running_session(&h, &["pending", "done", "kept"]).await;
        let done = id_of(&s, "done");
        s.start_task(done).await.unwrap();
        h.advance(10);
        s.complete_task(done).await.unwrap();
        assert_eq!(s.routine().unwrap().counters.total_tasks, 3);
        assert_eq!(s.routine().unwrap().counters.completed_tasks, 1);

        s.delete_task(id_of(&s, "pending")).await.unwrap();
        let counters = s.routine().unwrap().counters;
        assert_eq!((counters.total_tasks, counters.completed_tasks), (2, 1));

        s.delete_task(done).await.unwrap();
        let counters = s.routine().unwrap().counters;
        assert_eq!((counters.total_tasks, counters.completed_tasks), (1, 0));
        assert_eq!(s.tasks().len(), 1);
    }

    #[tokio::test]
    async fn reopen_keeps_duration_and_decrements_completed() {
        let h = Harness::new();
        let mut s = running_session(&h, &["task"]).await;
        let id = id_of(&s, "task");
        s.start_task(id).await.unwrap();
        h.advance(90);
        s.complete_task(id).await.unwrap();

        h.advance(15);
        s.reopen_task(id).await.unwrap();

        let task = s.task(id).unwrap();
        assert_eq!(task.state, TaskState::ACTIVE);
        assert_eq!(task.started_at, Some(t0() + Duration::seconds(105)));
        assert_eq!(task.resting_seconds, 90);
        assert_eq!(task.completed_at, None);
        assert_eq!(s.routine().unwrap().counters.completed_tasks, 0);
    }

    #[tokio::test]
    async fn second_open_routine_is_a_guard_violation() {
        let h = Harness::new();
        let mut s = h.session("alice").await;
        s.create_routine().await.unwrap();
        let first = s.routine().unwrap().routine_id;

        let err = s.create_routine().await.unwrap_err();
        assert!(matches!(
            err,
            RotinaError::Guard(GuardViolation::RoutineAlreadyOpen { routine_id }) if routine_id == first
        ));
    }

    #[tokio::test]
    async fn routine_completion_waits_for_running_tasks() {
        let h = Harness::new();
        let mut s = running_session(&h, &["task"]).await;
        let id = id_of(&s, "task");
        s.start_task(id).await.unwrap();
        h.advance(30);
        s.pause_task(id).await.unwrap();

        let err = s.complete_routine().await.unwrap_err();
        assert!(matches!(
            err,
            RotinaError::Guard(GuardViolation::TaskStillRunning { task_id }) if task_id == id
        ));
        assert_eq!(s.routine().unwrap().status(), RoutineStatus::Running);

        s.complete_task(id).await.unwrap();
        h.advance(70);
        assert_eq!(s.complete_routine().await.unwrap(), ActionOutcome::Applied);

        assert!(s.routine().is_none());
        assert!(s.tasks().is_empty());
        let shown = s.display_routine().unwrap();
        assert_eq!(shown.status(), RoutineStatus::Completed);
        assert_eq!(shown.timing.resting_seconds, 100);
    }

    #[tokio::test]
    async fn monitoring_falls_back_to_last_completed_routine() {
        let h = Harness::new();
        let mut s = running_session(&h, &["task"]).await;
        let id = id_of(&s, "task");
        s.start_task(id).await.unwrap();
        h.advance(300);
        s.complete_task(id).await.unwrap();
        h.advance(200);
        s.complete_routine().await.unwrap();

        h.advance(1000);
        let view = s.monitoring();
        let stats = view.stats.unwrap();
        assert_eq!(view.live_routine_seconds, 500);
        assert_eq!(stats.total_task_seconds, 300);
        assert_eq!(stats.time_lost_seconds, 200);
        assert_eq!(stats.completion_percent, 100.0);

        assert!(s.dashboard().stats.is_none());
    }

    #[tokio::test]
    async fn start_routine_twice_is_skipped() {
        let h = Harness::new();
        let mut s = running_session(&h, &[]).await;

        let outcome = s.start_routine().await.unwrap();
        assert!(matches!(
            outcome,
            ActionOutcome::Skipped(SkipReason::InvalidRoutineStatus { event: "start", .. })
        ));
    }

    #[tokio::test]
    async fn task_actions_without_routine_are_skipped() {
        let h = Harness::new();
        let mut s = h.session("alice").await;

        assert_eq!(
            s.add_task("orphan").await.unwrap(),
            ActionOutcome::Skipped(SkipReason::NoOpenRoutine)
        );
        assert_eq!(
            s.complete_routine().await.unwrap(),
            ActionOutcome::Skipped(SkipReason::NoOpenRoutine)
        );
    }

    #[tokio::test]
    async fn blank_names_are_skipped() {
        let h = Harness::new();
        let mut s = running_session(&h, &["task"]).await;
        let id = id_of(&s, "task");

        assert_eq!(s.add_task("   ").await.unwrap(), ActionOutcome::Skipped(SkipReason::EmptyName));
        assert_eq!(
            s.rename_task(id, "  ").await.unwrap(),
            ActionOutcome::Skipped(SkipReason::EmptyName)
        );
        s.rename_task(id, "  Ler  ").await.unwrap();
        assert_eq!(s.task(id).unwrap().name, "Ler");
        assert_eq!(s.routine().unwrap().counters.total_tasks, 1);
    }

    #[tokio::test]
    async fn store_failure_leaves_state_unchanged() {
        let h = Harness::new();
        let mut s = running_session(&h, &["task"]).await;
        let id = id_of(&s, "task");
        let before = s.tasks().to_vec();

        h.store.set_failing(true);
        let err = s.start_task(id).await.unwrap_err();
        assert!(matches!(err, RotinaError::Store(StoreError::Unavailable(_))));
        assert_eq!(s.tasks(), before.as_slice());

        h.store.set_failing(false);
        assert_eq!(s.start_task(id).await.unwrap(), ActionOutcome::Applied);
    }

    #[tokio::test]
    async fn unknown_task_is_skipped() {
        let h = Harness::new();
        let mut s = running_session(&h, &[]).await;
        let ghost = TaskId::from_ulid(ulid::Ulid::new());

        assert_eq!(
            s.pause_task(ghost).await.unwrap(),
            ActionOutcome::Skipped(SkipReason::TaskNotFound(ghost))
        );
    }

    #[tokio::test]
    async fn sessions_share_one_store() {
        let h = Harness::new();
        let mut writer = running_session(&h, &["shared"]).await;
        let mut reader = h.session("alice").await;
        let mut stranger = h.session("bob").await;
        assert_eq!(reader.tasks().len(), 1);

        let id = id_of(&writer, "shared");
        writer.start_task(id).await.unwrap();
        reader.changed().await.unwrap();
        assert!(reader.is_any_task_active());

        stranger.sync().await.unwrap();
        assert!(stranger.routine().is_none());
    }

    /// Routine of `seconds` length, started and completed by `s`.
    async fn complete_empty_routine(h: &Harness, s: &mut Session, seconds: i64) {
        s.create_routine().await.unwrap();
        s.start_routine().await.unwrap();
        h.advance(seconds);
        assert_eq!(s.complete_routine().await.unwrap(), ActionOutcome::Applied);
    }

    #[tokio::test]
    async fn fresh_session_shows_last_completed_routine() {
        let h = Harness::new();
        let mut first = h.session("alice").await;
        complete_empty_routine(&h, &mut first, 100).await;

        let mut s = h.session("alice").await;
        assert!(s.routine().is_none());
        assert_eq!(s.display_routine().unwrap().timing.resting_seconds, 100);
        assert_eq!(s.monitoring().stats.unwrap().routine_seconds, 100);
    }

    #[tokio::test]
    async fn history_follows_routines_completed_elsewhere() {
        let h = Harness::new();
        let mut a = h.session("alice").await;
        complete_empty_routine(&h, &mut a, 100).await;

        let mut b = h.session("alice").await;
        complete_empty_routine(&h, &mut b, 777).await;

        a.changed().await.unwrap();
        assert!(a.routine().is_none());
        assert_eq!(a.display_routine().unwrap().timing.resting_seconds, 777);
        assert_eq!(a.monitoring().stats.unwrap().routine_seconds, 777);
    }

    #[tokio::test]
    async fn task_deleted_elsewhere_is_skipped() {
        for event in [
            TaskEvent::Rename("y".to_string()),
            TaskEvent::Pause,
            TaskEvent::Delete,
        ] {
            let h = Harness::new();
            let mut a = running_session(&h, &["x"]).await;
            let id = id_of(&a, "x");
            a.start_task(id).await.unwrap();

            let mut b = h.session("alice").await;
            assert_eq!(b.delete_task(id).await.unwrap(), ActionOutcome::Applied);
            assert!(a.task(id).is_some());

            let outcome = a.task_action(id, event).await.unwrap();
            assert_eq!(outcome, ActionOutcome::Skipped(SkipReason::TaskNotFound(id)));
            assert!(a.task(id).is_none());
            assert_eq!(a.routine().unwrap().counters.total_tasks, 0);
        }
    }

    #[tokio::test]
    async fn failed_counter_write_removes_added_task() {
        let h = Harness::new();
        let mut s = running_session(&h, &[]).await;

        h.store.fail_only(Some("adjust_counters"));
        let err = s.add_task("x").await.unwrap_err();
        assert!(matches!(err, RotinaError::Store(StoreError::Unavailable(_))));
        h.store.fail_only(None);

        s.sync().await.unwrap();
        assert!(s.tasks().is_empty());
        assert_eq!(s.routine().unwrap().counters.total_tasks, 0);

        assert_eq!(s.add_task("x").await.unwrap(), ActionOutcome::Applied);
        assert_eq!(s.routine().unwrap().counters.total_tasks, 1);
    }

    #[tokio::test]
    async fn dashboard_and_monitoring_keep_separate_memos() {
        let h = Harness::new();
        let mut done = h.session("alice").await;
        complete_empty_routine(&h, &mut done, 100).await;

        let mut s = h.session("alice").await;
        s.create_routine().await.unwrap();
        s.add_task("x").await.unwrap();
        let now = h.clock.now();
        let open = s.routine().cloned().unwrap();
        let input = dashboard::stats_input(&open, s.tasks(), now);

        s.dashboard();
        s.monitoring();
        s.dashboard();
        assert!(s.memo.is_cached(&input));
        assert!(s.monitor_memo.is_cached(&input));
    }

    #[tokio::test]
    async fn live_inputs_follow_snapshot() {
        let h = Harness::new();
        let mut s = running_session(&h, &["task"]).await;
        let id = id_of(&s, "task");
        s.start_task(id).await.unwrap();
        h.advance(40);

        let now = h.clock.now();
        assert_eq!(s.routine_live_input().project(now), 40);
        assert_eq!(s.task_live_input().project(now), 40);

        s.pause_task(id).await.unwrap();
        h.advance(10);
        let now = h.clock.now();
        assert!(!s.task_live_input().is_ticking());
        assert_eq!(s.task_live_input().project(now), 40);
        assert_eq!(s.routine_live_input().project(now), 50);
    }
}
