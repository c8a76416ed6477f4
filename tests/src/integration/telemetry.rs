//! # Telemetry Wiring
//!
//! The Prometheus recorder plugged into a reducer, and the global log
//! subscriber installed from configuration.

#[cfg(test)]
mod tests {
    use super::super::harness::{customer, registry};
    use entity_state::{EntityActions, EntityReducer, ReduceOutcome};
    use entity_telemetry::{
        encode_metrics, init_logging, register_metrics, PrometheusRecorder, TelemetryConfig,
        CONFIGURATION_ERRORS, EVENTS_REDUCED, RELOAD_DECISIONS,
    };
    use shared_types::{EntityEvent, EventKind, EventPayload};
    use std::sync::Arc;

    #[test]
    fn test_prometheus_recorder_counts_reducer_activity() {
        let reducer = EntityReducer::new(registry()).with_metrics(Arc::new(PrometheusRecorder));
        let actions = EntityActions::new("Customer");
        let mut state = reducer.registry().initial_state();

        let request = actions.load_all();
        reducer.apply(&mut state, &request).unwrap();
        let success =
            EntityActions::success(&request, EventPayload::Entities(vec![customer(1, "Hopper")]))
                .unwrap();
        reducer.apply(&mut state, &success).unwrap();

        // Unregistered types degrade to a counted no-op.
        let outcome = reducer
            .apply(
                &mut state,
                &EntityEvent::new("Invoice", EventKind::Clear, EventPayload::Empty),
            )
            .unwrap();
        assert!(matches!(outcome, ReduceOutcome::Skipped(_)));

        reducer
            .reload_decider()
            .decide(&state, &actions.load_all_if_necessary(None))
            .unwrap();

        assert!(
            EVENTS_REDUCED
                .with_label_values(&["Customer", "LoadAllSuccess", "changed"])
                .get()
                >= 1.0
        );
        assert!(
            CONFIGURATION_ERRORS
                .with_label_values(&["Invoice", "Clear"])
                .get()
                >= 1.0
        );
        assert!(
            RELOAD_DECISIONS
                .with_label_values(&["Customer", "suppressed"])
                .get()
                >= 1.0
        );

        // Registration may already have happened elsewhere in this binary.
        let _ = register_metrics();
        assert!(encode_metrics().unwrap().contains("ae_reducer_events_total"));
    }

    #[test]
    fn test_init_logging_installs_once() {
        let config = TelemetryConfig {
            console_output: false,
            ..TelemetryConfig::default()
        };

        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_err());
    }
}
