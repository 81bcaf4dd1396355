//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryRoutineStore**: プロセス内の正本（購読・障害注入つき）
//!
//! 実際のドキュメントデータベースへのアダプタは別クレートに置く想定です。

pub mod inmem_store;

pub use self::inmem_store::InMemoryRoutineStore;
