//! Live Projection Clock - 表示用の経過秒数
//!
//! 永続化された resting duration に「今走っている区間」を足した値を
//! 毎秒再計算します。ストアには一切書き込みません。
//!
//! # 実装
//! - **LiveInput**: 射影の入力（running か、基準時刻、resting 秒数）
//! - **LiveTicker**: 入力ごとに 1 本の tokio タスク。入力が変わると
//!   古いタスクを abort して張り直す（古いタイマーが残らない）

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

use crate::domain::duration::elapsed_seconds;
use crate::domain::{RoutineRecord, RoutineStatus, TaskRecord};
use crate::ports::Clock;

/// Inputs of one live projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveInput {
    pub is_running: bool,
    pub reference_start: Option<DateTime<Utc>>,
    pub resting_seconds: i64,
}

impl LiveInput {
    pub fn stopped(resting_seconds: i64) -> Self {
        Self {
            is_running: false,
            reference_start: None,
            resting_seconds,
        }
    }

    pub fn running(reference_start: DateTime<Utc>, resting_seconds: i64) -> Self {
        Self {
            is_running: true,
            reference_start: Some(reference_start),
            resting_seconds,
        }
    }

    /// Routine projection, ticking only while the routine is running.
    pub fn for_routine(routine: &RoutineRecord) -> Self {
        Self {
            is_running: routine.status() == RoutineStatus::Running,
            reference_start: routine.timing.started_at,
            resting_seconds: routine.timing.resting_seconds,
        }
    }

    /// Task projection, ticking only while the task is running/active.
    pub fn for_task(task: &TaskRecord) -> Self {
        Self {
            is_running: task.state.is_active(),
            reference_start: task.started_at,
            resting_seconds: task.resting_seconds,
        }
    }

    pub fn project(&self, now: DateTime<Utc>) -> i64 {
        match self.reference_start {
            Some(start) if self.is_running => self.resting_seconds + elapsed_seconds(start, now),
            _ => self.resting_seconds,
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.is_running && self.reference_start.is_some()
    }
}

impl Default for LiveInput {
    fn default() -> Self {
        Self::stopped(0)
    }
}

/// LiveTicker は 1 つの射影値を watch チャネルで配信する
///
/// tokio ランタイム上でのみ `rearm` できます。Drop 時にタスクは止まります。
pub struct LiveTicker {
    clock: Arc<dyn Clock>,
    period: Duration,
    input: LiveInput,
    tx: Arc<watch::Sender<i64>>,
    handle: Option<JoinHandle<()>>,
}

impl LiveTicker {
    pub fn new(clock: Arc<dyn Clock>, period: Duration) -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            clock,
            period,
            input: LiveInput::default(),
            tx: Arc::new(tx),
            handle: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.tx.subscribe()
    }

    pub fn value(&self) -> i64 {
        *self.tx.borrow()
    }

    pub fn input(&self) -> LiveInput {
        self.input
    }

    pub fn is_ticking(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Bind the ticker to `input`. Returns `false` when nothing changed.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime when `input.is_ticking()`, since the
    /// tick loop is spawned with `tokio::spawn`. A stopped input never spawns.
    pub fn rearm(&mut self, input: LiveInput) -> bool {
        if input == self.input && (self.is_ticking() || !input.is_ticking()) {
            return false;
        }
        self.cancel();
        self.input = input;
        publish(&self.tx, input.project(self.clock.now()));

        if input.is_ticking() {
            let clock = Arc::clone(&self.clock);
            let tx = Arc::clone(&self.tx);
            let period = self.period;
            self.handle = Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    publish(&tx, input.project(clock.now()));
                }
            }));
            trace!(resting = input.resting_seconds, "ticker armed");
        }
        true
    }

    /// Stop ticking; the last published value stays.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for LiveTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn publish(tx: &watch::Sender<i64>, value: i64) {
    tx.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    });
}
