//! # Effects
//!
//! Turns request events into transport calls and their results back into
//! events.
//!
//! | Incoming | Result |
//! |----------|--------|
//! | begin (`Load`, `Create`, `DeleteByKey`, ...) | matching `*Success` or `*Failure`, same correlation id and criteria |
//! | `*IfNecessary` | the unconditional load, or nothing when suppressed |
//! | anything else | nothing |
//!
//! Transport errors never escape: they become `*Failure` events.

use crate::adapters::store::EntityStore;
use crate::domain::{EngineError, EntityMetadata, EntityRegistry, RootState};
use crate::ports::{EntityStateApi, EntityTransport, PagedEntities, RangedEntities};
use crate::reducer::EntityReducer;
use crate::reload::{ReloadDecider, ReloadDecision};
use shared_bus::{EventFeed, EventFilter};
use std::future::Future;
use shared_types::{EntityEvent, EventKind, EventPayload, EventPhase, TransportError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Request handler backed by a transport.
pub struct EntityEffects<T: EntityTransport> {
    transport: Arc<T>,
    registry: Arc<EntityRegistry>,
    decider: ReloadDecider,
}

impl<T: EntityTransport + 'static> EntityEffects<T> {
    /// Effects sharing the reducer's registry, clock and metrics.
    pub fn new(transport: Arc<T>, reducer: &EntityReducer) -> Self {
        Self {
            transport,
            registry: reducer.registry().clone(),
            decider: reducer.reload_decider(),
        }
    }

    /// The follow-up event for one request, if any.
    ///
    /// `state` is read only for `*IfNecessary` decisions.
    ///
    /// # Errors
    /// - `Configuration`: unregistered type, or a conditional load whose
    ///   slice is missing
    /// - `PayloadMismatch`: the request payload does not fit its kind
    pub async fn handle(
        &self,
        state: &RootState,
        event: &EntityEvent,
    ) -> Result<Option<EntityEvent>, EngineError> {
        match event.kind.phase() {
            EventPhase::Begin => {
                let metadata = self.registry.get(&event.entity_type)?;
                let result = self.call(metadata, event).await?;
                Ok(Self::respond(event, result))
            }
            EventPhase::IfNecessary => match self.decider.decide(state, event)? {
                ReloadDecision::Escalate(load) => Ok(Some(load)),
                ReloadDecision::Suppress(_) => Ok(None),
            },
            EventPhase::Success | EventPhase::Failure | EventPhase::Immediate => Ok(None),
        }
    }

    /// Consume requests from the store until its bus closes, dispatching
    /// every follow-up back into the store.
    ///
    /// The request feed is opened before this returns, so every request
    /// dispatched after the call is served even if the future is spawned
    /// later. The feed is lossless: other traffic on the bus cannot push a
    /// request out while a slow transport call is in flight.
    pub fn run(self, store: Arc<EntityStore>) -> impl Future<Output = ()> {
        let requests = store.feed(EventFilter::requests());
        self.serve(store, requests)
    }

    async fn serve(self, store: Arc<EntityStore>, mut requests: EventFeed) {
        info!("Entity effects started");

        while let Some(event) = requests.recv().await {
            let follow_up = match self.handle(&store.state(), &event).await {
                Ok(Some(follow_up)) => follow_up,
                Ok(None) => continue,
                Err(EngineError::Configuration(err)) => {
                    warn!(
                        entity_type = %event.entity_type,
                        event_kind = %event.kind,
                        correlation_id = %event.correlation_id,
                        error = %err,
                        "Configuration error, request skipped"
                    );
                    continue;
                }
                Err(err) => {
                    error!(
                        entity_type = %event.entity_type,
                        event_kind = %event.kind,
                        correlation_id = %event.correlation_id,
                        error = %err,
                        "Request rejected"
                    );
                    continue;
                }
            };

            if let Err(err) = store.dispatch(follow_up.clone()) {
                error!(
                    entity_type = %follow_up.entity_type,
                    event_kind = %follow_up.kind,
                    correlation_id = %follow_up.correlation_id,
                    error = %err,
                    "Follow-up event rejected"
                );
            }
        }

        info!("Entity effects stopped, bus closed");
    }

    async fn call(
        &self,
        meta: &EntityMetadata,
        event: &EntityEvent,
    ) -> Result<Result<EventPayload, TransportError>, EngineError> {
        let transport = self.transport.as_ref();
        let criteria = event.criteria.as_ref();

        let result: Result<EventPayload, TransportError> = match (event.kind, &event.payload) {
            (EventKind::Load, EventPayload::Key(key)) => transport
                .load(meta, key, criteria)
                .await
                .map(EventPayload::Entity),
            (EventKind::LoadAll, EventPayload::Empty) => transport
                .load_all(meta, criteria)
                .await
                .map(EventPayload::Entities),
            (EventKind::LoadMany, EventPayload::Keys(keys)) => transport
                .load_many(meta, Some(keys.as_slice()), criteria)
                .await
                .map(EventPayload::Entities),
            (EventKind::LoadMany, EventPayload::Empty) => transport
                .load_many(meta, None, criteria)
                .await
                .map(EventPayload::Entities),
            (EventKind::LoadPage, EventPayload::Page(page)) => transport
                .load_page(meta, *page, criteria)
                .await
                .map(|PagedEntities { entities, page_info }| EventPayload::PagedEntities {
                    entities,
                    page_info,
                }),
            (EventKind::LoadRange, EventPayload::Range(range)) => transport
                .load_range(meta, range, criteria)
                .await
                .map(|RangedEntities { entities, range_info }| EventPayload::RangedEntities {
                    entities,
                    range_info,
                }),
            (EventKind::Create, EventPayload::Entity(entity)) => transport
                .create(meta, entity, criteria)
                .await
                .map(EventPayload::Entity),
            (EventKind::CreateMany, EventPayload::Entities(entities)) => transport
                .create_many(meta, entities, criteria)
                .await
                .map(EventPayload::Entities),
            (EventKind::Update, EventPayload::Entity(entity)) => transport
                .update(meta, entity, criteria)
                .await
                .map(EventPayload::Entity),
            (EventKind::UpdateMany, EventPayload::Entities(entities)) => transport
                .update_many(meta, entities, criteria)
                .await
                .map(EventPayload::Entities),
            (EventKind::Upsert, EventPayload::Entity(entity)) => transport
                .upsert(meta, entity, criteria)
                .await
                .map(EventPayload::Entity),
            (EventKind::UpsertMany, EventPayload::Entities(entities)) => transport
                .upsert_many(meta, entities, criteria)
                .await
                .map(EventPayload::Entities),
            (EventKind::Replace, EventPayload::Entity(entity)) => transport
                .replace(meta, entity, criteria)
                .await
                .map(EventPayload::Entity),
            (EventKind::ReplaceMany, EventPayload::Entities(entities)) => transport
                .replace_many(meta, entities, criteria)
                .await
                .map(EventPayload::Entities),
            (EventKind::Delete, EventPayload::Entity(entity)) => transport
                .delete(meta, entity, criteria)
                .await
                .map(EventPayload::Entity),
            (EventKind::DeleteMany, EventPayload::Entities(entities)) => transport
                .delete_many(meta, entities, criteria)
                .await
                .map(EventPayload::Entities),
            (EventKind::DeleteByKey, EventPayload::Key(key)) => transport
                .delete_by_key(meta, key, criteria)
                .await
                .map(EventPayload::Key),
            (EventKind::DeleteManyByKeys, EventPayload::Keys(keys)) => transport
                .delete_many_by_keys(meta, keys, criteria)
                .await
                .map(EventPayload::Keys),
            (kind, payload) => {
                return Err(EngineError::PayloadMismatch {
                    kind,
                    expected: kind.accepted_payloads(),
                    found: payload.shape(),
                })
            }
        };

        Ok(result)
    }

    fn respond(event: &EntityEvent, result: Result<EventPayload, TransportError>) -> Option<EntityEvent> {
        match result {
            Ok(payload) => {
                debug!(
                    entity_type = %event.entity_type,
                    event_kind = %event.kind,
                    correlation_id = %event.correlation_id,
                    "Transport call succeeded"
                );
                event.kind.success().map(|kind| event.follow_up(kind, payload))
            }
            Err(err) => {
                warn!(
                    entity_type = %event.entity_type,
                    event_kind = %event.kind,
                    correlation_id = %event.correlation_id,
                    error = %err,
                    "Transport call failed"
                );
                event
                    .kind
                    .failure()
                    .map(|kind| event.follow_up(kind, EventPayload::Error(err)))
            }
        }
    }
}

impl<T: EntityTransport> std::fmt::Debug for EntityEffects<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityEffects")
            .field("registry", &self.registry)
            .field("decider", &self.decider)
            .finish_non_exhaustive()
    }
}
