use std::time::Duration;

use segscan_core::RetryConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Backoff tuning as written in settings files. Durations are humantime
/// strings (`"250ms"`, `"5m"`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Delay before the first retry of a failed page request.
    #[serde(with = "humantime_duration")]
    pub backoff_base: Duration,
    /// Upper bound for any single backoff delay.
    #[serde(with = "humantime_duration")]
    pub backoff_max: Duration,
    pub backoff_factor: f64,
    /// Randomize each delay between the base and the computed delay.
    pub jitter: bool,
    /// Consecutive failed calls after which a segment gives up. Unset means
    /// retry until cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            backoff_base: retry.backoff_base(),
            backoff_max: retry.backoff_max(),
            backoff_factor: retry.backoff_factor,
            jitter: retry.jitter,
            max_attempts: retry.max_attempts,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig {
            backoff_base_ms: duration_ms(settings.backoff_base),
            backoff_max_ms: duration_ms(settings.backoff_max),
            backoff_factor: settings.backoff_factor,
            jitter: settings.jitter,
            max_attempts: settings.max_attempts,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) mod humantime_duration {
    use super::*;

    pub fn serialize<S>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}
