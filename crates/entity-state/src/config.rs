//! Engine configuration.

use serde::{Deserialize, Serialize};
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use std::env;
use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the event bus created by `EntityStore::new`.
    pub bus_capacity: usize,

    /// Staleness window applied to conditional loads when neither the
    /// event nor the entity type provides one. `None` means "never stale".
    pub fallback_max_age: Option<Duration>,

    /// Log a warning when a page/range success arrives without its info.
    pub warn_on_missing_paging: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bus_capacity: DEFAULT_CHANNEL_CAPACITY,
            fallback_max_age: None,
            warn_on_missing_paging: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// - `AE_BUS_CAPACITY`
    /// - `AE_FALLBACK_MAX_AGE_SECS`
    /// - `AE_WARN_MISSING_PAGING`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bus_capacity: lookup("AE_BUS_CAPACITY")
                .and_then(|v| v.parse().ok())
                .filter(|capacity: &usize| *capacity > 0)
                .unwrap_or(defaults.bus_capacity),

            fallback_max_age: lookup("AE_FALLBACK_MAX_AGE_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .or(defaults.fallback_max_age),

            warn_on_missing_paging: lookup("AE_WARN_MISSING_PAGING")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.warn_on_missing_paging),
        }
    }

    #[must_use]
    pub fn with_fallback_max_age(mut self, max_age: Duration) -> Self {
        self.fallback_max_age = Some(max_age);
        self
    }
}
