//! In-process store: the current root plus the bus every dispatch goes to.

use crate::domain::{locate, ConfigurationError, EngineError, EntityRegistry, EntitySlice, RootState};
use crate::ports::EntityStateApi;
use crate::reducer::{EntityReducer, ReduceOutcome};
use crate::reload::ReloadDecider;
use parking_lot::RwLock;
use shared_bus::{EventFeed, EventFilter, EventStream, InMemoryEventBus, Subscription};
use shared_types::{EntityEvent, EntityTypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Holds the root state and applies events to it.
///
/// Every accepted event is published on the bus after it is reduced, so a
/// subscriber that reads `state()` sees the event's effect. Publishing
/// happens before the write lock is released: the bus order is the
/// reduction order, even with concurrent dispatchers.
pub struct EntityStore {
    state: RwLock<RootState>,
    reducer: EntityReducer,
    bus: Arc<InMemoryEventBus>,
    dispatched: AtomicU64,
    rejected: AtomicU64,
}

impl EntityStore {
    /// Store seeded from the reducer's registry, with its own bus.
    pub fn new(reducer: EntityReducer) -> Self {
        let bus = Arc::new(InMemoryEventBus::with_capacity(reducer.config().bus_capacity));
        Self::with_bus(reducer, bus)
    }

    /// Store publishing to a shared bus.
    pub fn with_bus(reducer: EntityReducer, bus: Arc<InMemoryEventBus>) -> Self {
        let state = reducer.registry().initial_state();
        Self {
            state: RwLock::new(state),
            reducer,
            bus,
            dispatched: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Replace the initial state (e.g. one built with host-defined nodes).
    #[must_use]
    pub fn with_state(self, state: RootState) -> Self {
        *self.state.write() = state;
        self
    }

    #[must_use]
    pub fn reducer(&self) -> &EntityReducer {
        &self.reducer
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    /// Decider sharing the reducer's clock, metrics and config.
    #[must_use]
    pub fn reload_decider(&self) -> ReloadDecider {
        self.reducer.reload_decider()
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.bus.subscribe(filter)
    }

    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.bus.event_stream(filter)
    }

    /// Lossless feed of the dispatched events matching `filter`.
    pub fn feed(&self, filter: EventFilter) -> EventFeed {
        self.bus.feed(filter)
    }

    /// Events accepted by `dispatch`.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Events `dispatch` returned an error for.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl EntityStateApi for EntityStore {
    fn dispatch(&self, event: EntityEvent) -> Result<ReduceOutcome, EngineError> {
        let mut state = self.state.write();
        let outcome = self.reducer.apply(&mut state, &event);
        match outcome {
            Ok(outcome) => {
                self.dispatched.fetch_add(1, Ordering::Relaxed);
                let receivers = self.bus.publish_now(event);
                drop(state);
                debug!(receivers, ?outcome, "Dispatched");
                Ok(outcome)
            }
            Err(err) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    fn state(&self) -> RootState {
        self.state.read().clone()
    }

    fn slice(&self, entity_type: &EntityTypeId) -> Result<Arc<EntitySlice>, ConfigurationError> {
        let metadata = self.reducer.registry().get(entity_type)?;
        let state = self.state.read();
        locate(&state, metadata).cloned()
    }

    fn registry(&self) -> &Arc<EntityRegistry> {
        self.reducer.registry()
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("reducer", &self.reducer)
            .field("dispatched", &self.dispatched())
            .field("rejected", &self.rejected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::EntityActions;
    use crate::reducer::test_support::{customers, reducer};
    use shared_types::{EntityKey, EventKind, EventPayload};

    #[test]
    fn test_dispatch_reduces_and_counts() {
        let (reducer, _) = reducer();
        let store = EntityStore::new(reducer);
        let actions = EntityActions::new("Customer");

        assert_eq!(store.dispatch(actions.load_all()).unwrap(), ReduceOutcome::Changed);
        assert!(store.slice(&"Customer".into()).unwrap().tracking.is_loading);

        let err = store
            .dispatch(EntityEvent::new("Customer", EventKind::LoadAllSuccess, EventPayload::Empty))
            .unwrap_err();
        assert!(matches!(err, EngineError::PayloadMismatch { .. }));

        assert_eq!(store.dispatched(), 1);
        assert_eq!(store.rejected(), 1);
    }

    #[test]
    fn test_snapshots_are_isolated() {
        let (reducer, _) = reducer();
        let store = EntityStore::new(reducer);
        let before = store.state();

        store
            .dispatch(EntityEvent::new(
                "Customer",
                EventKind::LoadAllSuccess,
                EventPayload::Entities(customers(&[1, 2])),
            ))
            .unwrap();

        let metadata = store.registry().get(&"Customer".into()).unwrap().clone();
        assert!(locate(&before, &metadata).unwrap().collection.is_empty());
        assert_eq!(store.slice(&"Customer".into()).unwrap().collection.len(), 2);
    }

    #[test]
    fn test_unknown_type_slice_is_a_configuration_error() {
        let (reducer, _) = reducer();
        let store = EntityStore::new(reducer);

        assert!(matches!(
            store.slice(&"Invoice".into()),
            Err(ConfigurationError::MissingMetadata { .. })
        ));
    }

    #[test]
    fn test_concurrent_dispatch_publishes_in_reduction_order() {
        let (reducer, _) = reducer();
        let store = Arc::new(EntityStore::new(reducer));
        let mut published = store.feed(EventFilter::all());

        let workers: Vec<_> = (0..4i64)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let actions = EntityActions::new("Customer");
                    for n in 0..50 {
                        let key = EntityKey::Number(worker * 100 + n);
                        store.dispatch(actions.select_more_by_keys([key])).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        // Replaying the bus must rebuild exactly the stored selection.
        let mut replayed = Vec::new();
        while let Ok(Some(event)) = published.try_recv() {
            if let EventPayload::Keys(keys) = event.payload {
                replayed.extend(keys);
            }
        }
        let stored = store.slice(&"Customer".into()).unwrap();
        assert_eq!(replayed.len(), 200);
        assert_eq!(replayed, stored.selections.current_entities_keys);
    }

    #[tokio::test]
    async fn test_dispatch_publishes_after_reduce() {
        let (reducer, _) = reducer();
        let store = EntityStore::new(reducer);
        let mut subscription = store.subscribe(EventFilter::all());

        store.dispatch(EntityActions::new("Customer").load_all()).unwrap();

        let event = subscription.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::LoadAll);
        assert!(store.slice(&event.entity_type).unwrap().tracking.is_loading);
    }
}
