//! rotina-core
//!
//! Time accounting for routines and their tasks.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, duration, routine, task, 状態機械, stats, errors）
//! - **ports**: 抽象化レイヤー（RoutineStore, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryRoutineStore）
//! - **app**: アプリケーションロジック（Session, LiveTicker, Dashboard, SessionBuilder）
//! - **config**: figment による設定読み込み
//! - **error**: アクションの結果とエラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

pub use self::error::{ActionOutcome, RotinaError};
