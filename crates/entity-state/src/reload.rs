//! # Conditional Reload
//!
//! Decides whether a `*IfNecessary` request becomes a real load.
//!
//! ## Rule
//!
//! Suppress iff **not loading** AND **data present** AND (**no max-age** OR
//! `now - loadedAt <= max-age`). Otherwise escalate to the unconditional
//! kind, keeping correlation id, criteria and payload.
//!
//! The effective max-age is the event's override, else the type's default,
//! else `EngineConfig::fallback_max_age`.
//!
//! | Request | Present when |
//! |---------|--------------|
//! | single | key is in `ids` |
//! | many | every key is in `ids`; with no keys, `loadedAt` is set |
//! | all | `loadedAt` is set |
//! | page | page equals the tracked page |
//! | range | range is subsequent to the tracked range |
//!
//! A max-age in effect with no `loadedAt` counts as stale.

use crate::config::EngineConfig;
use crate::domain::{locate, EngineError, EntityRegistry, EntitySlice, RootState};
use crate::metrics::NoOpMetrics;
use crate::ports::{MetricsRecorder, SystemTimeSource, TimeSource};
use shared_types::{EntityEvent, EntityKey, EventKind, EventPayload, EventPhase, Page, Range, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Why a conditional load was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// A load for this type is already in flight.
    LoadInFlight,
    /// The requested data is present and within its max-age.
    Fresh,
}

/// Outcome of a conditional-load decision.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadDecision {
    Suppress(SuppressReason),
    /// Dispatch this unconditional load.
    Escalate(EntityEvent),
}

impl ReloadDecision {
    #[must_use]
    pub fn is_escalated(&self) -> bool {
        matches!(self, Self::Escalate(_))
    }
}

/// What a conditional load asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadRequest<'a> {
    One(&'a EntityKey),
    Many(Option<&'a [EntityKey]>),
    All,
    Page(&'a Page),
    Range(&'a Range),
}

impl<'a> ReloadRequest<'a> {
    /// Read the request out of a `*IfNecessary` event.
    pub fn from_event(event: &'a EntityEvent) -> Result<Self, EngineError> {
        let request = match (event.kind, &event.payload) {
            (EventKind::LoadIfNecessary, EventPayload::Key(key)) => Self::One(key),
            (EventKind::LoadAllIfNecessary, EventPayload::Empty) => Self::All,
            (EventKind::LoadManyIfNecessary, EventPayload::Keys(keys)) => {
                Self::Many(Some(keys.as_slice()))
            }
            (EventKind::LoadManyIfNecessary, EventPayload::Empty) => Self::Many(None),
            (EventKind::LoadPageIfNecessary, EventPayload::Page(page)) => Self::Page(page),
            (EventKind::LoadRangeIfNecessary, EventPayload::Range(range)) => Self::Range(range),
            (kind, payload) if kind.phase() == EventPhase::IfNecessary => {
                return Err(EngineError::PayloadMismatch {
                    kind,
                    expected: kind.accepted_payloads(),
                    found: payload.shape(),
                })
            }
            (kind, _) => return Err(EngineError::NotConditional { kind }),
        };
        Ok(request)
    }

    fn is_present(&self, slice: &EntitySlice) -> bool {
        let loaded = slice.tracking.loaded_at.is_some();
        match self {
            Self::One(key) => slice.collection.contains(key),
            Self::Many(Some(keys)) if !keys.is_empty() => {
                keys.iter().all(|key| slice.collection.contains(key))
            }
            Self::Many(_) | Self::All => loaded,
            Self::Page(page) => slice.paging.current_page.as_ref() == Some(*page),
            Self::Range(range) => slice
                .paging
                .current_range
                .as_ref()
                .is_some_and(|tracked| range.is_subsequent_to(tracked)),
        }
    }
}

/// Pure suppression check. `None` means the request must escalate.
#[must_use]
pub fn suppression(
    slice: &EntitySlice,
    request: &ReloadRequest<'_>,
    max_age: Option<Duration>,
    now: Timestamp,
) -> Option<SuppressReason> {
    if slice.tracking.is_loading {
        return Some(SuppressReason::LoadInFlight);
    }
    if !request.is_present(slice) {
        return None;
    }
    let Some(max_age) = max_age else {
        return Some(SuppressReason::Fresh);
    };
    let loaded_at = slice.tracking.loaded_at?;
    let elapsed = u128::from(now.saturating_sub(loaded_at));
    (elapsed <= max_age.as_millis()).then_some(SuppressReason::Fresh)
}

/// Resolves `*IfNecessary` events against the current state.
#[derive(Clone)]
pub struct ReloadDecider {
    registry: Arc<EntityRegistry>,
    clock: Arc<dyn TimeSource>,
    metrics: Arc<dyn MetricsRecorder>,
    config: EngineConfig,
}

impl ReloadDecider {
    pub fn new(registry: Arc<EntityRegistry>) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemTimeSource),
            metrics: Arc::new(NoOpMetrics),
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_time_source(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Decide one conditional load.
    ///
    /// # Errors
    /// - `NotConditional`: the event is not a `*IfNecessary` kind
    /// - `PayloadMismatch`: the payload does not fit the kind
    /// - `Configuration`: unregistered type or missing slice
    pub fn decide(&self, state: &RootState, event: &EntityEvent) -> Result<ReloadDecision, EngineError> {
        let request = ReloadRequest::from_event(event)?;
        let escalation = event
            .kind
            .escalation()
            .ok_or(EngineError::NotConditional { kind: event.kind })?;
        let metadata = self.registry.get(&event.entity_type)?;
        let slice = locate(state, metadata)?;

        let max_age = event
            .max_age
            .or_else(|| metadata.default_max_age())
            .or(self.config.fallback_max_age);
        let now = self.clock.now();

        let decision = match suppression(slice, &request, max_age, now) {
            Some(reason) => ReloadDecision::Suppress(reason),
            None => ReloadDecision::Escalate(event.follow_up(escalation, event.payload.clone())),
        };

        debug!(
            entity_type = %event.entity_type,
            event_kind = %event.kind,
            correlation_id = %event.correlation_id,
            ?max_age,
            decision = decision_label(&decision),
            "Conditional load decided"
        );
        self.metrics
            .record_reload_decision(&event.entity_type, decision.is_escalated());
        Ok(decision)
    }
}

fn decision_label(decision: &ReloadDecision) -> &'static str {
    match decision {
        ReloadDecision::Suppress(SuppressReason::LoadInFlight) => "suppress: load in flight",
        ReloadDecision::Suppress(SuppressReason::Fresh) => "suppress: fresh",
        ReloadDecision::Escalate(_) => "escalate",
    }
}

impl std::fmt::Debug for ReloadDecider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadDecider")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{write, EntityMetadata};
    use crate::metrics::EngineMetrics;
    use crate::ports::MockTimeSource;
    use crate::reducer::test_support::{customers, event, registry, NOW};
    use serde_json::json;
    use shared_types::PageInfo;

    const MINUTE: Duration = Duration::from_secs(60);

    fn decider() -> (ReloadDecider, Arc<MockTimeSource>) {
        let clock = Arc::new(MockTimeSource::new(NOW));
        (ReloadDecider::new(registry()).with_time_source(clock.clone()), clock)
    }

    fn customer_meta() -> Arc<EntityMetadata> {
        registry().get(&"Customer".into()).unwrap().clone()
    }

    fn state_with(slice: EntitySlice) -> RootState {
        let mut state = registry().initial_state();
        write(&mut state, &customer_meta(), slice).unwrap();
        state
    }

    fn loaded_at(ms_ago: u64) -> EntitySlice {
        let mut slice = EntitySlice::new();
        slice.tracking.loaded_at = Some(NOW - ms_ago);
        slice
    }

    #[test]
    fn test_stale_load_all_escalates() {
        let (decider, _) = decider();
        let state = state_with(loaded_at(61_000));
        let request = event(EventKind::LoadAllIfNecessary, EventPayload::Empty).with_max_age(MINUTE);

        let decision = decider.decide(&state, &request).unwrap();
        let ReloadDecision::Escalate(load) = decision else {
            panic!("expected escalation, got {decision:?}");
        };
        assert_eq!(load.kind, EventKind::LoadAll);
        assert_eq!(load.correlation_id, request.correlation_id);
    }

    #[test]
    fn test_fresh_load_all_is_suppressed() {
        let (decider, _) = decider();
        let state = state_with(loaded_at(10_000));
        let request = event(EventKind::LoadAllIfNecessary, EventPayload::Empty).with_max_age(MINUTE);

        assert_eq!(
            decider.decide(&state, &request).unwrap(),
            ReloadDecision::Suppress(SuppressReason::Fresh)
        );
    }

    #[test]
    fn test_max_age_boundary_is_inclusive() {
        let (decider, _) = decider();
        let request = event(EventKind::LoadAllIfNecessary, EventPayload::Empty).with_max_age(MINUTE);

        assert_eq!(
            decider.decide(&state_with(loaded_at(60_000)), &request).unwrap(),
            ReloadDecision::Suppress(SuppressReason::Fresh)
        );
        assert!(decider
            .decide(&state_with(loaded_at(60_001)), &request)
            .unwrap()
            .is_escalated());
    }

    #[test]
    fn test_load_in_flight_always_suppresses() {
        let (decider, _) = decider();
        let mut slice = EntitySlice::new();
        slice.tracking.is_loading = true;
        let state = state_with(slice);

        for request in [
            event(EventKind::LoadAllIfNecessary, EventPayload::Empty).with_max_age(MINUTE),
            event(EventKind::LoadIfNecessary, EventPayload::Key(EntityKey::Number(1))),
            event(EventKind::LoadPageIfNecessary, EventPayload::Page(Page::new(1, 10))),
        ] {
            assert_eq!(
                decider.decide(&state, &request).unwrap(),
                ReloadDecision::Suppress(SuppressReason::LoadInFlight)
            );
        }
    }

    #[test]
    fn test_never_loaded_escalates() {
        let (decider, _) = decider();
        let state = registry().initial_state();
        let request = event(EventKind::LoadAllIfNecessary, EventPayload::Empty);

        assert!(decider.decide(&state, &request).unwrap().is_escalated());
    }

    #[test]
    fn test_single_key_presence() {
        let (decider, _) = decider();
        let (reducer, _) = crate::reducer::test_support::reducer();
        let state = reducer
            .reduce(
                registry().initial_state(),
                &event(EventKind::LoadAllSuccess, EventPayload::Entities(customers(&[1, 2]))),
            )
            .unwrap();

        let present = event(EventKind::LoadIfNecessary, EventPayload::Key(EntityKey::Number(2)));
        let absent = event(EventKind::LoadIfNecessary, EventPayload::Key(EntityKey::Number(3)));
        assert!(!decider.decide(&state, &present).unwrap().is_escalated());

        let ReloadDecision::Escalate(load) = decider.decide(&state, &absent).unwrap() else {
            panic!("expected escalation");
        };
        assert_eq!(load.kind, EventKind::Load);
        assert_eq!(load.payload, EventPayload::Key(EntityKey::Number(3)));
    }

    #[test]
    fn test_many_requires_every_key() {
        let (decider, _) = decider();
        let (reducer, _) = crate::reducer::test_support::reducer();
        let state = reducer
            .reduce(
                registry().initial_state(),
                &event(EventKind::LoadManySuccess, EventPayload::Entities(customers(&[1, 2]))),
            )
            .unwrap();
        let keys = |ids: &[i64]| EventPayload::Keys(ids.iter().copied().map(EntityKey::Number).collect());

        assert!(!decider
            .decide(&state, &event(EventKind::LoadManyIfNecessary, keys(&[1, 2])))
            .unwrap()
            .is_escalated());
        assert!(decider
            .decide(&state, &event(EventKind::LoadManyIfNecessary, keys(&[2, 3])))
            .unwrap()
            .is_escalated());
        assert!(!decider
            .decide(&state, &event(EventKind::LoadManyIfNecessary, EventPayload::Empty))
            .unwrap()
            .is_escalated());
    }

    #[test]
    fn test_page_must_match_tracked_page() {
        let (decider, _) = decider();
        let mut slice = loaded_at(0);
        slice.paging.current_page = Some(Page::new(2, 25));
        let state = state_with(slice);

        let same = event(EventKind::LoadPageIfNecessary, EventPayload::Page(Page::new(2, 25)));
        let next = event(EventKind::LoadPageIfNecessary, EventPayload::Page(Page::new(3, 25)));
        assert!(!decider.decide(&state, &same).unwrap().is_escalated());
        assert!(decider.decide(&state, &next).unwrap().is_escalated());
    }

    #[test]
    fn test_range_must_be_subsequent() {
        let (decider, _) = decider();
        let mut slice = loaded_at(0);
        slice.paging.current_range = Some(Range::start_end(1, 10));
        let state = state_with(slice);

        let subsequent = event(
            EventKind::LoadRangeIfNecessary,
            EventPayload::Range(Range::start_end(11, 20)),
        );
        let gap = event(
            EventKind::LoadRangeIfNecessary,
            EventPayload::Range(Range::start_end(15, 20)),
        );
        assert!(!decider.decide(&state, &subsequent).unwrap().is_escalated());
        assert!(decider.decide(&state, &gap).unwrap().is_escalated());
    }

    #[test]
    fn test_type_default_and_fallback_max_age() {
        let metadata = EntityMetadata::builder("Report")
            .model_name("Report")
            .key_field("id")
            .max_age(MINUTE)
            .build()
            .unwrap();
        let registry = Arc::new(EntityRegistry::new().with(metadata).unwrap());
        let clock = Arc::new(MockTimeSource::new(NOW));
        let reports = ReloadDecider::new(registry.clone()).with_time_source(clock.clone());

        let mut state = registry.initial_state();
        let report = registry.get(&"Report".into()).unwrap().clone();
        let mut slice = EntitySlice::new();
        slice.tracking.loaded_at = Some(NOW);
        write(&mut state, &report, slice).unwrap();

        let request = EntityEvent::new("Report", EventKind::LoadAllIfNecessary, EventPayload::Empty);
        assert!(!reports.decide(&state, &request).unwrap().is_escalated());

        clock.advance(61_000);
        assert!(reports.decide(&state, &request).unwrap().is_escalated());

        // Override wins over the type default.
        let generous = request.clone().with_max_age(Duration::from_secs(120));
        assert!(!reports.decide(&state, &generous).unwrap().is_escalated());

        let (plain, clock) = decider();
        let plain = plain.with_config(EngineConfig::default().with_fallback_max_age(MINUTE));
        let state = state_with(loaded_at(0));
        clock.advance(61_000);
        let request = event(EventKind::LoadAllIfNecessary, EventPayload::Empty);
        assert!(plain.decide(&state, &request).unwrap().is_escalated());
    }

    #[test]
    fn test_escalation_keeps_criteria_and_counts() {
        let metrics = Arc::new(EngineMetrics::new());
        let (decider, _) = decider();
        let decider = decider.with_metrics(metrics.clone());
        let state = registry().initial_state();
        let request = event(EventKind::LoadPageIfNecessary, EventPayload::Page(Page::new(1, 10)))
            .with_criteria(json!({"active": true}));

        let ReloadDecision::Escalate(load) = decider.decide(&state, &request).unwrap() else {
            panic!("expected escalation");
        };
        assert_eq!(load.kind, EventKind::LoadPage);
        assert_eq!(load.criteria, Some(json!({"active": true})));
        assert_eq!(load.payload, EventPayload::Page(Page::new(1, 10)));
        assert_eq!(metrics.snapshot().reloads_escalated, 1);
    }

    #[test]
    fn test_non_conditional_kind_is_rejected() {
        let (decider, _) = decider();
        let state = registry().initial_state();

        let err = decider
            .decide(&state, &event(EventKind::LoadAll, EventPayload::Empty))
            .unwrap_err();
        assert_eq!(err, EngineError::NotConditional { kind: EventKind::LoadAll });
    }

    #[test]
    fn test_decider_shares_reducer_clock() {
        let (reducer, clock) = crate::reducer::test_support::reducer();
        let decider = reducer.reload_decider();
        let state = reducer
            .reduce(
                registry().initial_state(),
                &event(
                    EventKind::LoadPageSuccess,
                    EventPayload::PagedEntities {
                        entities: customers(&[1]),
                        page_info: Some(PageInfo {
                            page: Page::new(1, 10),
                            total_count: 1,
                        }),
                    },
                ),
            )
            .unwrap();
        let request = event(EventKind::LoadPageIfNecessary, EventPayload::Page(Page::new(1, 10)))
            .with_max_age(MINUTE);

        assert!(!decider.decide(&state, &request).unwrap().is_escalated());
        clock.advance(60_001);
        assert!(decider.decide(&state, &request).unwrap().is_escalated());
    }
}
