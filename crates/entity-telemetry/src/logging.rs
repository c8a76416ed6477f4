//! Structured logging setup.
//!
//! Every engine log line carries `entity_type`, `event_kind` and
//! `correlation_id` fields. In JSON mode they land as top-level keys a log
//! shipper can index.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter from `config.log_level`.
///
/// `RUST_LOG` is not read here: `TelemetryConfig::from_env` has already
/// resolved it against `AE_LOG_LEVEL`.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level).map_err(|e| TelemetryError::Config(e.to_string()))
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = env_filter(config)?;

    if !config.console_output {
        tracing_subscriber::registry()
            .with(env_filter)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else if config.json_logs {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        // Pretty output for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_directives() {
        let config = TelemetryConfig {
            log_level: "entity_state=debug,warn".to_string(),
            ..TelemetryConfig::default()
        };
        assert!(env_filter(&config).is_ok());
    }

    #[test]
    fn test_filter_follows_resolved_level() {
        let config = TelemetryConfig::from_lookup(|name| match name {
            "AE_LOG_LEVEL" => Some("error".to_string()),
            "RUST_LOG" => Some("trace".to_string()),
            _ => None,
        });

        assert_eq!(config.log_level, "error");
        assert_eq!(env_filter(&config).unwrap().to_string(), "error");
    }

    // Global subscriber installation is exercised once, from the tests crate.
}
