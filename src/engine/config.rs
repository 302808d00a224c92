//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default wait for one input before the loop moves on to queued work.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runtime settings for one engine.
///
/// # Example
///
/// ```
/// use statefold::engine::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::default()
///     .with_name("door")
///     .with_poll_interval(Duration::from_millis(25));
///
/// assert_eq!(config.poll_interval(), Duration::from_millis(25));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name attached to the engine's tracing span.
    pub name: String,
    /// Longest time the loop waits for an input before draining work.
    pub poll_interval_ms: u64,
}

impl EngineConfig {
    /// Sets the engine name used in logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the input polling interval.
    ///
    /// Work scheduled from outside a transition waits at most this long
    /// before it is launched.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is below one millisecond.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        assert!(millis > 0, "poll interval must be at least 1ms");
        self.poll_interval_ms = millis;
        self
    }

    /// Input polling interval; zero is treated as one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "engine".to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.name, "engine");
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: EngineConfig = serde_json::from_str(r#"{"name":"lamp"}"#).unwrap();
        assert_eq!(config.name, "lamp");
        assert_eq!(config.poll_interval_ms, 10);
    }

    #[test]
    fn zero_interval_from_config_is_clamped() {
        let config: EngineConfig = serde_json::from_str(r#"{"poll_interval_ms":0}"#).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    #[should_panic(expected = "poll interval must be at least 1ms")]
    fn builder_rejects_zero_interval() {
        let _ = EngineConfig::default().with_poll_interval(Duration::ZERO);
    }
}
