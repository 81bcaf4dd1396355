//! Config - figment による段階的な設定読み込み
//!
//! 優先順位（後勝ち）:
//! 1. 組み込みのデフォルト値
//! 2. カレントディレクトリの `rotina.toml`（存在する場合のみ）
//! 3. 環境変数 `ROTINA_*`（`__` でネスト区切り）
//!
//! 例: `ROTINA_OWNER_ID=alice` → `owner_id = "alice"`

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::OwnerId;

pub const CONFIG_FILE: &str = "rotina.toml";
pub const ENV_PREFIX: &str = "ROTINA_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotinaConfig {
    /// Owner whose routines the session works on.
    pub owner_id: String,
    /// Period of the live projection ticker.
    pub tick_interval_ms: u64,
    /// Fallback tracing filter when `ROTINA_LOG` is unset.
    pub log_level: String,
}

impl Default for RotinaConfig {
    fn default() -> Self {
        Self {
            owner_id: "local".to_string(),
            tick_interval_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl RotinaConfig {
    /// Load from defaults, `rotina.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// Like `load`, reading the TOML layer from `path` instead.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment_with(path.as_ref()))
    }

    pub fn figment() -> Figment {
        Self::figment_with(&PathBuf::from(CONFIG_FILE))
    }

    fn figment_with(path: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "owner_id".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn owner(&self) -> OwnerId {
        OwnerId::new(self.owner_id.trim())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
