//! Domain model: records, states, and the pure time-accounting rules.
//!
//! - **ids / state / routine / task**: 永続化されるレコードと状態
//! - **duration**: resting duration の計算（Duration Accumulator）
//! - **task_machine / routine_machine**: 状態機械（ガード判定と副作用の算出）
//! - **stats**: 利用率・完了率・ロスタイムの集計
//!
//! このモジュールは I/O を一切持ちません。現在時刻は常に引数で受け取ります。

pub mod duration;
pub mod errors;
pub mod ids;
pub mod routine;
pub mod routine_machine;
pub mod state;
pub mod stats;
pub mod task;
pub mod task_machine;

pub use self::errors::{GuardViolation, Rejection, SkipReason};
pub use self::ids::{OwnerId, RoutineId, TaskId};
pub use self::routine::{CounterDelta, RoutineRecord, RoutineTiming, TaskCounters};
pub use self::routine_machine::RoutineEvent;
pub use self::state::{RoutineStatus, SubStatus, TaskState};
pub use self::stats::{RoutineStats, StatsInput, StatsMemo, TaskShare, TaskTime};
pub use self::task::{PauseSpan, TaskRecord};
pub use self::task_machine::{TaskEffect, TaskEvent};
