//! Dispatch configuration.
//!
//! [`DispatchConfig`] controls classification strictness and the resource
//! limits applied to every dispatch.  Defaults come from the [`Default`]
//! implementation; the `with_*` methods customise individual fields.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

/// Settings shared by every dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Minimum classifier score for an intent to count as resolved.
    ///
    /// Default: **0.75**.
    pub min_score: f64,

    /// Maximum number of dispatches running at once.  Further dispatches
    /// wait for a slot.
    ///
    /// Default: **64**.
    pub max_in_flight: usize,

    /// Deadline for each suspension point (classification, skill handler,
    /// delivery), in milliseconds.
    ///
    /// Default: **30 000 ms**.
    pub stage_timeout_ms: u64,

    /// Adapter used when none is named.
    ///
    /// Default: **`terminal`**.
    pub default_adapter: String,

    /// Capacity of the event bus.
    ///
    /// Default: **256**.
    pub event_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_score: 0.75,
            max_in_flight: 64,
            stage_timeout_ms: 30_000,
            default_adapter: "terminal".to_string(),
            event_capacity: 256,
        }
    }
}

impl DispatchConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_default_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.default_adapter = adapter.into();
        self
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(format!("min_score must be within [0, 1], got {}", self.min_score));
        }
        if self.max_in_flight == 0 {
            return Err("max_in_flight must be at least 1".into());
        }
        if self.max_in_flight > Semaphore::MAX_PERMITS {
            return Err(format!(
                "max_in_flight must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.max_in_flight
            ));
        }
        if self.stage_timeout_ms == 0 {
            return Err("stage_timeout_ms must be at least 1".into());
        }
        if self.event_capacity == 0 {
            return Err("event_capacity must be at least 1".into());
        }
        Ok(())
    }
}
