//! SessionBuilder - Session の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 省略した協調者はデフォルト実装で埋める（SystemClock, UlidGenerator）

use std::sync::Arc;

use crate::app::session::Session;
use crate::config::RotinaConfig;
use crate::domain::OwnerId;
use crate::ports::{Clock, IdGenerator, RoutineStore, StoreError, SystemClock, UlidGenerator};

/// SessionBuilder は Session を構築
///
/// # 使用例
/// ```ignore
/// let session = SessionBuilder::new()
///     .store(Arc::new(InMemoryRoutineStore::new()))
///     .owner(OwnerId::new("alice"))
///     .build()
///     .await?;
/// ```
///
/// # Fail-fast 設計
/// - ストアとオーナーは必須。欠けていれば build() が BuildError を返す
/// - 最初の購読もここで行うので、ストアに届かなければ build() で失敗する
#[derive(Default)]
pub struct SessionBuilder {
    store: Option<Arc<dyn RoutineStore>>,
    clock: Option<Arc<dyn Clock>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
    owner_id: Option<OwnerId>,
}

/// BuildError は Session 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no RoutineStore configured")]
    MissingStore,

    #[error("no owner configured")]
    MissingOwner,

    #[error("initial subscription failed: {0}")]
    Store(#[from] StoreError),
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner taken from the loaded configuration.
    pub fn from_config(config: &RotinaConfig) -> Self {
        Self::new().owner(config.owner())
    }

    pub fn store(mut self, store: Arc<dyn RoutineStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = Some(id_generator);
        self
    }

    pub fn owner(mut self, owner_id: OwnerId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// # 検証
    /// - store / owner が設定されているか
    /// - owner が空文字列でないか
    pub async fn build(self) -> Result<Session, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        let owner_id = self
            .owner_id
            .filter(|o| !o.as_str().trim().is_empty())
            .ok_or(BuildError::MissingOwner)?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let id_generator = self
            .id_generator
            .unwrap_or_else(|| {
                Arc::new(UlidGenerator::new(Arc::clone(&clock))) as Arc<dyn IdGenerator>
            });

        Ok(Session::open(store, clock, id_generator, owner_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionOutcome;
    use crate::impls::InMemoryRoutineStore;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_build_success() {
        let session = SessionBuilder::new()
            .store(Arc::new(InMemoryRoutineStore::new()))
            .owner(OwnerId::new("alice"))
            .build()
            .await;
        assert!(session.is_ok());
    }

    #[tokio::test]
    async fn test_build_missing_store() {
        let session = SessionBuilder::new()
            .owner(OwnerId::new("alice"))
            .build()
            .await;
        assert!(matches!(session, Err(BuildError::MissingStore)));
    }

    #[tokio::test]
    async fn test_build_blank_owner() {
        let session = SessionBuilder::new()
            .store(Arc::new(InMemoryRoutineStore::new()))
            .owner(OwnerId::new("  "))
            .build()
            .await;
        assert!(matches!(session, Err(BuildError::MissingOwner)));
    }

    #[tokio::test]
    async fn test_build_from_config_uses_injected_clock() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let config = RotinaConfig {
            owner_id: "carol".to_string(),
            ..RotinaConfig::default()
        };
        let mut session = SessionBuilder::from_config(&config)
            .store(Arc::new(InMemoryRoutineStore::new()))
            .clock(Arc::new(FixedClock::new(t0)))
            .build()
            .await
            .unwrap();

        assert_eq!(session.owner_id(), &OwnerId::new("carol"));
        assert_eq!(session.create_routine().await.unwrap(), ActionOutcome::Applied);
        let routine = session.routine().unwrap();
        assert_eq!(routine.created_on, t0);
        assert_eq!(routine.routine_id.as_ulid().timestamp_ms(), t0.timestamp_millis() as u64);
    }
}
