//! App - アプリケーション層
//!
//! ドメインの状態機械とポートを組み合わせて、1 ユーザー分の
//! 作業セッションとして提供します。
//!
//! # 含まれるもの
//! - **session**: Session（購読の保持・アクションの入口）
//! - **live_clock**: LiveInput / LiveTicker（毎秒のライブ射影）
//! - **dashboard**: Dashboard（並び替え済み一覧・ライブ秒数・統計）
//! - **builder**: SessionBuilder（起動時検証つきの構築）

pub mod builder;
pub mod dashboard;
pub mod live_clock;
pub mod session;

pub use self::builder::{BuildError, SessionBuilder};
pub use self::dashboard::Dashboard;
pub use self::live_clock::{LiveInput, LiveTicker};
pub use self::session::Session;
