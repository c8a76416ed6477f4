//! # Reduction Engine
//!
//! `(root, event) -> root'`. One dispatch point for every entity type.
//!
//! ## Flow
//!
//! ```text
//! event ──→ metadata lookup ──→ payload shape check ──→ locate slice
//!                                                          │
//!                  ┌───────────────────────────────────────┘
//!                  ▼
//!        per-family sub-reducer (reads the slice, resolves keys)
//!                  │
//!        Unchanged ┴ Edit ──→ copy-on-write along the slice's path
//! ```
//!
//! Every fallible step runs before the state is touched, so an error never
//! leaves a half-applied transition behind.
//!
//! ## Error Policy
//!
//! | Error | Handling |
//! |-------|----------|
//! | `ConfigurationError` | logged with `warn!`, counted, state unchanged |
//! | `PayloadMismatch` / `InvalidKeyValue` | returned to the caller |
//!
//! Sub-reducers use `?` and never catch.

mod clear;
mod delete;
mod edit;
mod load;
mod save;
mod selection;

use crate::config::EngineConfig;
use crate::domain::{
    locate, ConfigurationError, EngineError, EntityMetadata, EntityRegistry, EntitySlice, RootState,
    Tracking,
};
use crate::metrics::NoOpMetrics;
use crate::ports::{MetricsRecorder, SystemTimeSource, TimeSource};
use crate::reload::ReloadDecider;
use shared_types::{EntityEvent, EntityKey, EventFamily, EventPhase, Timestamp};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a call to [`EntityReducer::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceOutcome {
    /// The slice was rewritten.
    Changed,
    /// The event was valid but changed nothing; the root is untouched.
    Unchanged,
    /// A `*IfNecessary` request; these are decided, never reduced.
    PassedThrough,
    /// A configuration error was logged and the event skipped.
    Skipped(ConfigurationError),
}

impl ReduceOutcome {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Edit to apply to the located slice.
pub(crate) enum Reduction {
    Unchanged,
    Edit(Box<dyn FnOnce(&mut EntitySlice)>),
}

impl Reduction {
    fn edit<F>(apply: F) -> Self
    where
        F: FnOnce(&mut EntitySlice) + 'static,
    {
        Self::Edit(Box::new(apply))
    }
}

/// Everything a sub-reducer may read.
pub(crate) struct ReduceContext<'a> {
    pub metadata: &'a EntityMetadata,
    pub event: &'a EntityEvent,
    pub now: Timestamp,
    pub config: &'a EngineConfig,
    pub metrics: &'a dyn MetricsRecorder,
}

impl ReduceContext<'_> {
    /// Error for a payload the kind does not accept.
    fn mismatch(&self) -> EngineError {
        EngineError::PayloadMismatch {
            kind: self.event.kind,
            expected: self.event.kind.accepted_payloads(),
            found: self.event.payload.shape(),
        }
    }
}

/// Request flag toggled by begin/failure events.
#[derive(Debug, Clone, Copy)]
enum Flag {
    Loading,
    Saving,
    Deleting,
}

impl Flag {
    fn get(self, tracking: &Tracking) -> bool {
        match self {
            Self::Loading => tracking.is_loading,
            Self::Saving => tracking.is_saving,
            Self::Deleting => tracking.is_deleting,
        }
    }

    fn set(self, tracking: &mut Tracking, value: bool) {
        match self {
            Self::Loading => tracking.is_loading = value,
            Self::Saving => tracking.is_saving = value,
            Self::Deleting => tracking.is_deleting = value,
        }
    }
}

/// Begin raises the family's flag, failure lowers it.
fn toggle(phase: EventPhase, flag: Flag, slice: &EntitySlice) -> Reduction {
    let value = phase == EventPhase::Begin;
    if flag.get(&slice.tracking) == value {
        return Reduction::Unchanged;
    }
    Reduction::edit(move |slice| flag.set(&mut slice.tracking, value))
}

/// Drop duplicates, keeping first-seen order.
fn dedupe(keys: impl IntoIterator<Item = EntityKey>) -> Vec<EntityKey> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|key| seen.insert(key.clone())).collect()
}

// =============================================================================
// REDUCER
// =============================================================================

/// The generic reducer shared by every registered entity type.
#[derive(Clone)]
pub struct EntityReducer {
    registry: Arc<EntityRegistry>,
    clock: Arc<dyn TimeSource>,
    metrics: Arc<dyn MetricsRecorder>,
    config: EngineConfig,
}

impl EntityReducer {
    /// Reducer with the system clock, no metrics and default config.
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

    #[must_use]
    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A reload decider sharing this reducer's registry, clock, metrics and
    /// config.
    #[must_use]
    pub fn reload_decider(&self) -> ReloadDecider {
        ReloadDecider::new(self.registry.clone())
            .with_time_source(self.clock.clone())
            .with_metrics(self.metrics.clone())
            .with_config(self.config.clone())
    }

    /// Apply one event to `state` in place.
    ///
    /// Copy-on-write: handles cloned from `state` before the call keep the
    /// prior state. When the outcome is not `Changed`, `state` still points
    /// at the same root allocation.
    pub fn apply(&self, state: &mut RootState, event: &EntityEvent) -> Result<ReduceOutcome, EngineError> {
        if event.kind.phase() == EventPhase::IfNecessary {
            return Ok(ReduceOutcome::PassedThrough);
        }

        match self.try_apply(state, event) {
            Ok(changed) => {
                debug!(
                    entity_type = %event.entity_type,
                    event_kind = %event.kind,
                    correlation_id = %event.correlation_id,
                    changed,
                    "Event reduced"
                );
                self.metrics
                    .record_reduced(&event.entity_type, event.kind, changed);
                Ok(if changed {
                    ReduceOutcome::Changed
                } else {
                    ReduceOutcome::Unchanged
                })
            }
            Err(EngineError::Configuration(err)) => {
                warn!(
                    entity_type = %event.entity_type,
                    event_kind = %event.kind,
                    correlation_id = %event.correlation_id,
                    error = %err,
                    "Configuration error, event skipped"
                );
                self.metrics
                    .record_configuration_error(&event.entity_type, event.kind);
                Ok(ReduceOutcome::Skipped(err))
            }
            Err(err) => Err(err),
        }
    }

    /// Reduce by value: `(root, event) -> root'`.
    pub fn reduce(&self, mut state: RootState, event: &EntityEvent) -> Result<RootState, EngineError> {
        self.apply(&mut state, event)?;
        Ok(state)
    }

    fn try_apply(&self, state: &mut RootState, event: &EntityEvent) -> Result<bool, EngineError> {
        let metadata = self.registry.get(&event.entity_type)?;

        if !event.has_valid_payload() {
            return Err(EngineError::PayloadMismatch {
                kind: event.kind,
                expected: event.kind.accepted_payloads(),
                found: event.payload.shape(),
            });
        }

        let slice = locate(state, metadata)?;
        let ctx = ReduceContext {
            metadata,
            event,
            now: self.clock.now(),
            config: &self.config,
            metrics: self.metrics.as_ref(),
        };

        let reduction = match event.kind.family() {
            EventFamily::Load
            | EventFamily::LoadAll
            | EventFamily::LoadMany
            | EventFamily::LoadPage
            | EventFamily::LoadRange => load::reduce(&ctx, slice)?,
            EventFamily::Create
            | EventFamily::CreateMany
            | EventFamily::Update
            | EventFamily::UpdateMany
            | EventFamily::Upsert
            | EventFamily::UpsertMany
            | EventFamily::Replace
            | EventFamily::ReplaceMany => save::reduce(&ctx, slice)?,
            EventFamily::Delete
            | EventFamily::DeleteMany
            | EventFamily::DeleteByKey
            | EventFamily::DeleteManyByKeys => delete::reduce(&ctx, slice)?,
            EventFamily::Clear => clear::reduce(slice),
            EventFamily::Selection => selection::reduce(&ctx, slice)?,
            EventFamily::Edit => edit::reduce(&ctx, slice)?,
        };

        match reduction {
            Reduction::Unchanged => Ok(false),
            Reduction::Edit(apply) => {
                crate::domain::locator::edit(state, metadata, apply)?;
                Ok(true)
            }
        }
    }
}

impl std::fmt::Debug for EntityReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityReducer")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
