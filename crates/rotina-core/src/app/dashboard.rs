//! Dashboard - 画面に出す読み取り専用ビュー
//!
//! スナップショット（ルーティン 1 件とそのタスク群）と現在時刻から、
//! 並び替え済みのタスク一覧・ライブ秒数・統計を組み立てます。

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::live_clock::LiveInput;
use crate::domain::task_machine::active_task;
use crate::domain::{RoutineRecord, RoutineStats, StatsInput, StatsMemo, TaskRecord, TaskTime};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub routine: Option<RoutineRecord>,
    pub tasks: Vec<TaskRecord>,
    pub live_routine_seconds: i64,
    pub live_task_seconds: i64,
    pub is_any_task_active: bool,
    pub stats: Option<RoutineStats>,
}

/// Running first, then pending oldest first, then completed newest first.
pub fn sort_tasks(tasks: &mut [TaskRecord]) {
    tasks.sort_by(compare_tasks);
}

fn compare_tasks(a: &TaskRecord, b: &TaskRecord) -> Ordering {
    a.state
        .list_rank()
        .cmp(&b.state.list_rank())
        .then_with(|| {
            if a.state.is_completed() {
                b.completed_at.cmp(&a.completed_at)
            } else {
                a.created_at.cmp(&b.created_at)
            }
        })
        .then_with(|| a.task_id.cmp(&b.task_id))
}

/// Single "current task" timer: the active task ticks; otherwise a paused
/// task shows its frozen duration; otherwise zero.
pub fn live_task_input(tasks: &[TaskRecord]) -> LiveInput {
    if let Some(active) = active_task(tasks) {
        return LiveInput::for_task(active);
    }
    tasks
        .iter()
        .find(|t| t.state.is_paused())
        .map(|t| LiveInput::stopped(t.resting_seconds))
        .unwrap_or_default()
}

pub fn stats_input(routine: &RoutineRecord, tasks: &[TaskRecord], now: DateTime<Utc>) -> StatsInput {
    StatsInput {
        routine_seconds: routine.elapsed_seconds(now),
        total_tasks: routine.counters.total_tasks,
        completed_tasks: routine.counters.completed_tasks,
        tasks: tasks
            .iter()
            .map(|t| TaskTime {
                task_id: t.task_id,
                resting_seconds: t.resting_seconds,
                counted_seconds: t.live_seconds(now),
                pause_seconds: t.live_pause_seconds(now),
            })
            .collect(),
    }
}

impl Dashboard {
    /// `tasks` must already belong to `routine`.
    pub fn build(
        routine: Option<&RoutineRecord>,
        tasks: &[TaskRecord],
        now: DateTime<Utc>,
        memo: &mut StatsMemo,
    ) -> Self {
        let mut sorted = tasks.to_vec();
        sort_tasks(&mut sorted);

        let live_routine_seconds = routine
            .map(|r| LiveInput::for_routine(r).project(now))
            .unwrap_or(0);
        let stats = routine.map(|r| memo.get(stats_input(r, &sorted, now)).clone());

        Self {
            routine: routine.cloned(),
            live_task_seconds: live_task_input(&sorted).project(now),
            is_any_task_active: active_task(&sorted).is_some(),
            live_routine_seconds,
            tasks: sorted,
            stats,
        }
    }
}
