//! Outbound (driven) ports.
//!
//! These traits define what the engine needs from the outside world: a
//! clock, a transport that fetches and persists records, and a metrics
//! sink.

use crate::domain::EntityMetadata;
use async_trait::async_trait;
use serde_json::Value;
use shared_types::{
    Entity, EntityKey, EntityTypeId, EventKind, Page, PageInfo, Range, RangeInfo, Timestamp,
    TransportError,
};
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// TIME
// =============================================================================

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Manually driven time source for tests and simulations.
#[derive(Debug, Default)]
pub struct MockTimeSource {
    time: AtomicU64,
}

impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(Ordering::SeqCst)
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Result of a page load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagedEntities {
    pub entities: Vec<Entity>,
    pub page_info: Option<PageInfo>,
}

/// Result of a range load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangedEntities {
    pub entities: Vec<Entity>,
    pub range_info: Option<RangeInfo>,
}

/// Fetches and persists records for any registered entity type.
///
/// Every method defaults to `TransportError::NotImplemented`, so a
/// transport only implements what its backend supports. `criteria` is the
/// opaque value carried on the request event.
#[async_trait]
pub trait EntityTransport: Send + Sync {
    async fn load(
        &self,
        meta: &EntityMetadata,
        _key: &EntityKey,
        _criteria: Option<&Value>,
    ) -> Result<Entity, TransportError> {
        Err(not_implemented(meta, "load"))
    }

    async fn load_all(
        &self,
        meta: &EntityMetadata,
        _criteria: Option<&Value>,
    ) -> Result<Vec<Entity>, TransportError> {
        Err(not_implemented(meta, "load_all"))
    }

    /// `keys` is `None` when the request named no keys.
    async fn load_many(
        &self,
        meta: &EntityMetadata,
        _keys: Option<&[EntityKey]>,
        _criteria: Option<&Value>,
    ) -> Result<Vec<Entity>, TransportError> {
        Err(not_implemented(meta, "load_many"))
    }

    async fn load_page(
        &self,
        meta: &EntityMetadata,
        _page: Page,
        _criteria: Option<&Value>,
    ) -> Result<PagedEntities, TransportError> {
        Err(not_implemented(meta, "load_page"))
    }

    async fn load_range(
        &self,
        meta: &EntityMetadata,
        _range: &Range,
        _criteria: Option<&Value>,
    ) -> Result<RangedEntities, TransportError> {
        Err(not_implemented(meta, "load_range"))
    }

    async fn create(
        &self,
        meta: &EntityMetadata,
        _entity: &Entity,
        _criteria: Option<&Value>,
    ) -> Result<Entity, TransportError> {
        Err(not_implemented(meta, "create"))
    }

    async fn create_many(
        &self,
        meta: &EntityMetadata,
        _entities: &[Entity],
        _criteria: Option<&Value>,
    ) -> Result<Vec<Entity>, TransportError> {
        Err(not_implemented(meta, "create_many"))
    }

    async fn update(
        &self,
        meta: &EntityMetadata,
        _entity: &Entity,
        _criteria: Option<&Value>,
    ) -> Result<Entity, TransportError> {
        Err(not_implemented(meta, "update"))
    }

    async fn update_many(
        &self,
        meta: &EntityMetadata,
        _entities: &[Entity],
        _criteria: Option<&Value>,
    ) -> Result<Vec<Entity>, TransportError> {
        Err(not_implemented(meta, "update_many"))
    }

    async fn upsert(
        &self,
        meta: &EntityMetadata,
        _entity: &Entity,
        _criteria: Option<&Value>,
    ) -> Result<Entity, TransportError> {
        Err(not_implemented(meta, "upsert"))
    }

    async fn upsert_many(
        &self,
        meta: &EntityMetadata,
        _entities: &[Entity],
        _criteria: Option<&Value>,
    ) -> Result<Vec<Entity>, TransportError> {
        Err(not_implemented(meta, "upsert_many"))
    }

    async fn replace(
        &self,
        meta: &EntityMetadata,
        _entity: &Entity,
        _criteria: Option<&Value>,
    ) -> Result<Entity, TransportError> {
        Err(not_implemented(meta, "replace"))
    }

    async fn replace_many(
        &self,
        meta: &EntityMetadata,
        _entities: &[Entity],
        _criteria: Option<&Value>,
    ) -> Result<Vec<Entity>, TransportError> {
        Err(not_implemented(meta, "replace_many"))
    }

    async fn delete(
        &self,
        meta: &EntityMetadata,
        _entity: &Entity,
        _criteria: Option<&Value>,
    ) -> Result<Entity, TransportError> {
        Err(not_implemented(meta, "delete"))
    }

    async fn delete_many(
        &self,
        meta: &EntityMetadata,
        _entities: &[Entity],
        _criteria: Option<&Value>,
    ) -> Result<Vec<Entity>, TransportError> {
        Err(not_implemented(meta, "delete_many"))
    }

    async fn delete_by_key(
        &self,
        meta: &EntityMetadata,
        _key: &EntityKey,
        _criteria: Option<&Value>,
    ) -> Result<EntityKey, TransportError> {
        Err(not_implemented(meta, "delete_by_key"))
    }

    async fn delete_many_by_keys(
        &self,
        meta: &EntityMetadata,
        _keys: &[EntityKey],
        _criteria: Option<&Value>,
    ) -> Result<Vec<EntityKey>, TransportError> {
        Err(not_implemented(meta, "delete_many_by_keys"))
    }
}

fn not_implemented(meta: &EntityMetadata, operation: &str) -> TransportError {
    TransportError::not_implemented(meta.entity_type(), operation)
}

// =============================================================================
// METRICS
// =============================================================================

/// Sink for engine counters.
pub trait MetricsRecorder: Send + Sync {
    /// An event went through the reducer (`changed` is false for no-ops).
    fn record_reduced(&self, entity_type: &EntityTypeId, kind: EventKind, changed: bool);

    /// A configuration error was logged and skipped.
    fn record_configuration_error(&self, entity_type: &EntityTypeId, kind: EventKind);

    /// Auxiliary payload data was missing and defaults were used.
    fn record_data_warning(&self, entity_type: &EntityTypeId, kind: EventKind);

    /// A conditional load was decided.
    fn record_reload_decision(&self, entity_type: &EntityTypeId, escalated: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NothingTransport;

    #[async_trait]
    impl EntityTransport for NothingTransport {}

    #[test]
    fn test_system_time_source() {
        let now = SystemTimeSource.now();
        // After Jan 1, 2020 in ms
        assert!(now > 1_577_836_800_000);
    }

    #[test]
    fn test_mock_time_source() {
        let source = MockTimeSource::new(1000);
        assert_eq!(source.now(), 1000);

        source.advance(500);
        assert_eq!(source.now(), 1500);

        source.set(3000);
        assert_eq!(source.now(), 3000);
    }

    #[tokio::test]
    async fn test_transport_defaults_to_not_implemented() {
        let meta = EntityMetadata::builder("Customer")
            .model_name("Customer")
            .key_field("id")
            .build()
            .unwrap();

        let err = NothingTransport.load_all(&meta, None).await.unwrap_err();
        assert!(err.is_not_implemented());
        assert_eq!(err.entity_type().as_str(), "Customer");

        let err = NothingTransport
            .delete_many_by_keys(&meta, &[EntityKey::Number(1)], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("delete_many_by_keys"));
    }
}
