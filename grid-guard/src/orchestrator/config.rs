use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::prelude::*;

/// Configuration for the background validation orchestrator.
///
/// Durations serialize as whole milliseconds (`debounce_ms`, `timeout_ms`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    #[serde(rename = "debounce_ms", with = "duration_ms")]
    debounce: Duration,
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    timeout: Duration,
    max_concurrency: usize,
    event_capacity: usize,
    history_capacity: usize,
    #[serde(skip)]
    log_config: LogConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            timeout: Duration::from_secs(30),
            max_concurrency: num_cpus::get(),
            event_capacity: 256,
            history_capacity: 1024,
            log_config: LogConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Sets the quiet period a request waits before it runs.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the deadline for a running validation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many validations may run at once.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the capacity of the lifecycle event channel.
    pub fn with_event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity;
        self
    }

    /// Sets how many finished validations stay queryable through `status`.
    pub fn with_history_capacity(mut self, history_capacity: usize) -> Self {
        self.history_capacity = history_capacity;
        self
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn log_config(&self) -> &LogConfig {
        &self.log_config
    }

    /// Checks the configuration for values the orchestrator cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Configuration`] for a zero concurrency cap, a zero
    /// timeout or a zero event capacity.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(GridError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(GridError::Configuration(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(GridError::Configuration(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Serialization`] for malformed JSON and
    /// [`GridError::Configuration`] when the parsed values are invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_concurrency(), num_cpus::get());
        assert_eq!(config.event_capacity(), 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = OrchestratorConfig::default()
            .with_debounce(Duration::ZERO)
            .with_timeout(Duration::from_millis(50))
            .with_max_concurrency(2);
        assert_eq!(config.debounce(), Duration::ZERO);
        assert_eq!(config.timeout(), Duration::from_millis(50));
        assert_eq!(config.max_concurrency(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let zero_workers = OrchestratorConfig::default().with_max_concurrency(0);
        assert!(matches!(
            zero_workers.validate(),
            Err(GridError::Configuration(_))
        ));

        let zero_timeout = OrchestratorConfig::default().with_timeout(Duration::ZERO);
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_config_serde_uses_milliseconds() {
        let config = OrchestratorConfig::default()
            .with_debounce(Duration::from_millis(150))
            .with_max_concurrency(4);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["debounce_ms"], 150);
        assert_eq!(json["timeout_ms"], 30_000);

        let parsed: OrchestratorConfig =
            serde_json::from_str(r#"{"debounce_ms": 10, "max_concurrency": 3}"#).unwrap();
        assert_eq!(parsed.debounce(), Duration::from_millis(10));
        assert_eq!(parsed.max_concurrency(), 3);
        assert_eq!(parsed.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_json_validates() {
        let config = OrchestratorConfig::from_json(r#"{"timeout_ms": 500}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(500));

        assert!(matches!(
            OrchestratorConfig::from_json("{debounce_ms"),
            Err(GridError::Serialization(_))
        ));
        assert!(matches!(
            OrchestratorConfig::from_json(r#"{"max_concurrency": 0}"#),
            Err(GridError::Configuration(_))
        ));
    }
}
