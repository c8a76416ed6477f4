//! # Entity Telemetry
//!
//! Observability wiring for hosts of the entity-state engine.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` fmt layer, plain or JSON, filtered by `EnvFilter`
//! - **Metrics**: Prometheus counters behind the engine's `MetricsRecorder` port
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entity_telemetry::{init_telemetry, PrometheusRecorder, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::from_env())?;
//! let reducer = EntityReducer::new(registry).with_metrics(Arc::new(PrometheusRecorder));
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AE_SERVICE_NAME` | `auto-entity` | Service name in logs |
//! | `AE_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `AE_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `AE_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, PrometheusRecorder, CONFIGURATION_ERRORS, DATA_WARNINGS,
    ENTITY_TYPES, EVENTS_REDUCED, REGISTRY, RELOAD_DECISIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
