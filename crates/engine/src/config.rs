//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning knobs for the engine and its executor.
///
/// Durations are (de)serialized as integer milliseconds so a config file
/// reads `{"action_timeout_ms": 30000}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of times a retryable action failure will be retried.
    pub max_retries: u32,
    /// Base delay for exponential back-off between retries.
    #[serde(rename = "retry_base_delay_ms", with = "millis")]
    pub retry_base_delay: Duration,
    /// Upper bound on a single handler invocation; `None` waits forever.
    #[serde(rename = "action_timeout_ms", with = "opt_millis")]
    pub action_timeout: Option<Duration>,
    /// Wall-clock length of one step-delay minute.
    ///
    /// Step delays are written in minutes; shrinking this compresses a
    /// multi-day sequence for demos.
    #[serde(rename = "delay_unit_ms", with = "millis")]
    pub delay_unit: Duration,
    pub savings: SavingsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(100),
            action_timeout: Some(Duration::from_secs(30)),
            delay_unit: Duration::from_secs(60),
            savings: SavingsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Real duration of a step delay of `minutes`.
    pub fn step_delay(&self, minutes: u64) -> Duration {
        let minutes = u32::try_from(minutes).unwrap_or(u32::MAX);
        self.delay_unit.saturating_mul(minutes)
    }
}

/// Inputs for the "automation savings" figure of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingsConfig {
    /// Minutes a person would spend doing one run by hand.
    pub manual_minutes_per_run: u32,
    /// Cost of one hour of manual work.
    pub hourly_rate: f64,
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            manual_minutes_per_run: 15,
            hourly_rate: 500_000.0,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}
