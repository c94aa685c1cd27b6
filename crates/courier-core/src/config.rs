//! Config - 環境変数からの設定読み込み
//!
//! タイムアウトは起動時に一度だけ読み、プロセスの間は変わりません。
//! 必須の値が欠けていれば起動を失敗させます（Fail-fast）。

use std::time::Duration;

use thiserror::Error;

use crate::domain::filter::FilterConfig;
use crate::domain::timeout::TimeoutPolicy;

pub const ENV_TRIGGER_TIMEOUT_SECONDS: &str = "TRIGGER_TIMEOUT_SECONDS";
pub const ENV_FLOW_TIMEOUT_SECONDS: &str = "FLOW_TIMEOUT_SECONDS";
pub const ENV_AGENT_TIMEOUT_SECONDS: &str = "AGENT_TIMEOUT_SECONDS";
pub const ENV_OUTGOING_WEBHOOK_TIMEOUT_SECONDS: &str = "OUTGOING_WEBHOOK_TIMEOUT_SECONDS";
pub const ENV_WORKER_ACQUIRE_TIMEOUT_SECONDS: &str = "WORKER_ACQUIRE_TIMEOUT_SECONDS";
pub const ENV_JOB_MAX_ATTEMPTS: &str = "JOB_MAX_ATTEMPTS";
pub const ENV_SCHEDULED_MAX_ATTEMPTS: &str = "SCHEDULED_MAX_ATTEMPTS";

/// Every key that must be present for [`CourierConfig::from_env`] to succeed.
pub const REQUIRED_KEYS: [&str; 4] = [
    ENV_TRIGGER_TIMEOUT_SECONDS,
    ENV_FLOW_TIMEOUT_SECONDS,
    ENV_AGENT_TIMEOUT_SECONDS,
    ENV_OUTGOING_WEBHOOK_TIMEOUT_SECONDS,
];

const DEFAULT_WORKER_ACQUIRE_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} must be a positive integer, got {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourierConfig {
    pub timeouts: TimeoutPolicy,
    pub filters: FilterConfig,
    /// Bound on waiting for a free worker. `None` waits indefinitely.
    pub acquire_timeout: Option<Duration>,
}

impl CourierConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Loads configuration from a custom key lookup.
    pub fn from_env_with<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeouts = TimeoutPolicy::from_secs(
            required_positive(&get_env, ENV_TRIGGER_TIMEOUT_SECONDS)?,
            required_positive(&get_env, ENV_FLOW_TIMEOUT_SECONDS)?,
            required_positive(&get_env, ENV_AGENT_TIMEOUT_SECONDS)?,
            required_positive(&get_env, ENV_OUTGOING_WEBHOOK_TIMEOUT_SECONDS)?,
        );

        let defaults = FilterConfig::default();
        let filters = FilterConfig {
            max_attempts: optional_positive(&get_env, ENV_JOB_MAX_ATTEMPTS, defaults.max_attempts)?,
            scheduled_max_attempts: optional_positive(
                &get_env,
                ENV_SCHEDULED_MAX_ATTEMPTS,
                defaults.scheduled_max_attempts,
            )?,
        };

        // 0 は「無制限に待つ」
        let acquire_secs = match get_env(ENV_WORKER_ACQUIRE_TIMEOUT_SECONDS) {
            Some(raw) => parse_u64(ENV_WORKER_ACQUIRE_TIMEOUT_SECONDS, &raw)?,
            None => DEFAULT_WORKER_ACQUIRE_TIMEOUT_SECONDS,
        };
        let acquire_timeout = (acquire_secs > 0).then(|| Duration::from_secs(acquire_secs));

        Ok(Self {
            timeouts,
            filters,
            acquire_timeout,
        })
    }
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn required_positive<F>(get_env: &F, key: &'static str) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = get_env(key).ok_or(ConfigError::Missing(key))?;
    match parse_u64(key, &raw)? {
        0 => Err(ConfigError::Invalid { key, value: raw }),
        value => Ok(value),
    }
}

fn optional_positive<F>(get_env: &F, key: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get_env(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}
