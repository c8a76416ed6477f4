//! In-process engine metrics.
//!
//! Thread-safe counters behind the [`MetricsRecorder`] port. Hosts that
//! export to Prometheus use the recorder from `entity-telemetry` instead.

use crate::ports::MetricsRecorder;
use shared_types::{EntityTypeId, EventKind};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for reducer and reload activity.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Events that changed state
    pub events_changed: AtomicU64,
    /// Events that left state unchanged
    pub events_unchanged: AtomicU64,
    /// Configuration errors skipped at the choke point
    pub configuration_errors: AtomicU64,
    /// Page/range successes that arrived without their info
    pub data_warnings: AtomicU64,
    /// Conditional loads escalated to a real load
    pub reloads_escalated: AtomicU64,
    /// Conditional loads suppressed
    pub reloads_suppressed: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            events_changed: self.events_changed.load(Ordering::Relaxed),
            events_unchanged: self.events_unchanged.load(Ordering::Relaxed),
            configuration_errors: self.configuration_errors.load(Ordering::Relaxed),
            data_warnings: self.data_warnings.load(Ordering::Relaxed),
            reloads_escalated: self.reloads_escalated.load(Ordering::Relaxed),
            reloads_suppressed: self.reloads_suppressed.load(Ordering::Relaxed),
        }
    }

    /// Share of conditional loads that were suppressed.
    pub fn suppression_rate(&self) -> f64 {
        let escalated = self.reloads_escalated.load(Ordering::Relaxed);
        let suppressed = self.reloads_suppressed.load(Ordering::Relaxed);
        let total = escalated + suppressed;
        if total > 0 {
            suppressed as f64 / total as f64
        } else {
            0.0
        }
    }
}

impl MetricsRecorder for EngineMetrics {
    fn record_reduced(&self, _entity_type: &EntityTypeId, _kind: EventKind, changed: bool) {
        if changed {
            self.events_changed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.events_unchanged.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_configuration_error(&self, _entity_type: &EntityTypeId, _kind: EventKind) {
        self.configuration_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_data_warning(&self, _entity_type: &EntityTypeId, _kind: EventKind) {
        self.data_warnings.fetch_add(1, Ordering::Relaxed);
    }

    fn record_reload_decision(&self, _entity_type: &EntityTypeId, escalated: bool) {
        if escalated {
            self.reloads_escalated.fetch_add(1, Ordering::Relaxed);
        } else {
            self.reloads_suppressed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineMetricsSnapshot {
    pub events_changed: u64,
    pub events_unchanged: u64,
    pub configuration_errors: u64,
    pub data_warnings: u64,
    pub reloads_escalated: u64,
    pub reloads_suppressed: u64,
}

/// Recorder that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_reduced(&self, _: &EntityTypeId, _: EventKind, _: bool) {}
    fn record_configuration_error(&self, _: &EntityTypeId, _: EventKind) {}
    fn record_data_warning(&self, _: &EntityTypeId, _: EventKind) {}
    fn record_reload_decision(&self, _: &EntityTypeId, _: bool) {}
}
