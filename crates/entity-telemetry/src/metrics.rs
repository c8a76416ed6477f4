//! Prometheus metrics for the entity-state engine.
//!
//! All metrics follow the naming convention: `ae_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **CounterVec**: events reduced, configuration errors, data warnings, reload decisions
//! - **Gauge**: registered entity types

use entity_state::MetricsRecorder;
use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};
use shared_types::{EntityTypeId, EventKind};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // REDUCER METRICS
    // =========================================================================

    /// Events run through the reducer
    pub static ref EVENTS_REDUCED: CounterVec = CounterVec::new(
        Opts::new("ae_reducer_events_total", "Events run through the reducer"),
        &["entity_type", "event_kind", "outcome"]  // outcome: changed/unchanged
    ).expect("metric creation failed");

    /// Configuration errors skipped at the reducer choke point
    pub static ref CONFIGURATION_ERRORS: CounterVec = CounterVec::new(
        Opts::new("ae_reducer_configuration_errors_total", "Events skipped for configuration errors"),
        &["entity_type", "event_kind"]
    ).expect("metric creation failed");

    /// Successes that arrived without their page or range info
    pub static ref DATA_WARNINGS: CounterVec = CounterVec::new(
        Opts::new("ae_reducer_data_warnings_total", "Successes reduced with defaulted auxiliary data"),
        &["entity_type", "event_kind"]
    ).expect("metric creation failed");

    // =========================================================================
    // RELOAD METRICS
    // =========================================================================

    /// Conditional-load decisions
    pub static ref RELOAD_DECISIONS: CounterVec = CounterVec::new(
        Opts::new("ae_reload_decisions_total", "Conditional load decisions"),
        &["entity_type", "decision"]  // decision: escalated/suppressed
    ).expect("metric creation failed");

    // =========================================================================
    // REGISTRY METRICS
    // =========================================================================

    /// Entity types known to the engine
    pub static ref ENTITY_TYPES: Gauge = Gauge::new(
        "ae_registry_entity_types",
        "Number of registered entity types"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Fails on the second call, like any duplicate Prometheus registration.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(EVENTS_REDUCED.clone()),
        Box::new(CONFIGURATION_ERRORS.clone()),
        Box::new(DATA_WARNINGS.clone()),
        Box::new(RELOAD_DECISIONS.clone()),
        Box::new(ENTITY_TYPES.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// [`MetricsRecorder`] writing to the global Prometheus counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusRecorder;

impl PrometheusRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsRecorder for PrometheusRecorder {
    fn record_reduced(&self, entity_type: &EntityTypeId, kind: EventKind, changed: bool) {
        let kind = kind.to_string();
        let outcome = if changed { "changed" } else { "unchanged" };
        EVENTS_REDUCED
            .with_label_values(&[entity_type.as_str(), &kind, outcome])
            .inc();
    }

    fn record_configuration_error(&self, entity_type: &EntityTypeId, kind: EventKind) {
        let kind = kind.to_string();
        CONFIGURATION_ERRORS
            .with_label_values(&[entity_type.as_str(), &kind])
            .inc();
    }

    fn record_data_warning(&self, entity_type: &EntityTypeId, kind: EventKind) {
        let kind = kind.to_string();
        DATA_WARNINGS
            .with_label_values(&[entity_type.as_str(), &kind])
            .inc();
    }

    fn record_reload_decision(&self, entity_type: &EntityTypeId, escalated: bool) {
        let decision = if escalated { "escalated" } else { "suppressed" };
        RELOAD_DECISIONS
            .with_label_values(&[entity_type.as_str(), decision])
            .inc();
    }
}
