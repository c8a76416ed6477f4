//! Test harness: an in-memory transport plus a running store and effects loop.

use async_trait::async_trait;
use entity_state::{
    resolve_key, EngineMetrics, EntityEffects, EntityMetadata, EntityReducer, EntityRegistry,
    EntityStateApi, EntityStore, EntityTransport, MockTimeSource, PagedEntities,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use shared_bus::EventFilter;
use shared_types::{
    Entity, EntityEvent, EntityKey, EntityTypeId, EventPhase, Page, PageInfo, TransportError,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const NOW: u64 = 1_700_000_000_000;

/// Customer keyed by `id` (default order by name, fresh for 60s) and
/// OrderLine keyed by `orderId` + `lineNo` under the `sales` namespace.
pub fn registry() -> Arc<EntityRegistry> {
    let by_name = |a: &Entity, b: &Entity| {
        let name = |e: &Entity| e.get("name").and_then(Value::as_str).map(str::to_owned);
        name(a).cmp(&name(b))
    };

    let registry = EntityRegistry::new()
        .with(
            EntityMetadata::builder("Customer")
                .model_name("Customer")
                .plural_name("Customers")
                .uri_name("customers")
                .key_field("id")
                .max_age(Duration::from_secs(60))
                .comparer("byName", by_name)
                .comparer("byIdDesc", |a: &Entity, b: &Entity| -> Ordering {
                    let id = |e: &Entity| e.get("id").and_then(Value::as_i64);
                    id(b).cmp(&id(a))
                })
                .default_comparer("byName")
                .build()
                .expect("customer metadata"),
        )
        .expect("customer registration")
        .with(
            EntityMetadata::builder("OrderLine")
                .model_name("OrderLine")
                .key_fields(["orderId", "lineNo"])
                .namespace("sales")
                .build()
                .expect("order line metadata"),
        )
        .expect("order line registration");
    Arc::new(registry)
}

pub fn customer(id: i64, name: &str) -> Entity {
    Entity::from_fields([("id", json!(id)), ("name", json!(name))])
}

pub fn order_line(order_id: i64, line_no: i64, sku: &str) -> Entity {
    Entity::from_fields([
        ("orderId", json!(order_id)),
        ("lineNo", json!(line_no)),
        ("sku", json!(sku)),
    ])
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Tables of records per entity type, with a switch to fail every call.
#[derive(Default)]
pub struct MemoryTransport {
    tables: RwLock<HashMap<EntityTypeId, Vec<Entity>>>,
    calls: AtomicU64,
    offline: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table.
    pub fn seed(&self, entity_type: &str, records: Vec<Entity>) {
        self.tables.write().insert(entity_type.into(), records);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Transport methods invoked so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    fn begin(&self, meta: &EntityMetadata, operation: &str) -> Result<(), TransportError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(TransportError::failed(meta.entity_type(), operation, "backend offline"));
        }
        Ok(())
    }

    fn table(&self, meta: &EntityMetadata) -> Vec<Entity> {
        self.tables
            .read()
            .get(meta.entity_type())
            .cloned()
            .unwrap_or_default()
    }

    fn key_of(meta: &EntityMetadata, entity: &Entity, operation: &str) -> Result<EntityKey, TransportError> {
        resolve_key(meta, entity)
            .map_err(|err| TransportError::failed(meta.entity_type(), operation, err))
    }

    fn missing(meta: &EntityMetadata, operation: &str, key: &EntityKey) -> TransportError {
        TransportError::failed(meta.entity_type(), operation, format!("{key} not found"))
    }

    fn position(&self, meta: &EntityMetadata, key: &EntityKey) -> Option<usize> {
        self.table(meta)
            .iter()
            .position(|record| resolve_key(meta, record).ok().as_ref() == Some(key))
    }

    /// `must_exist`: `Some(true)` for updates, `Some(false)` for creates.
    fn store(
        &self,
        meta: &EntityMetadata,
        entity: &Entity,
        operation: &str,
        must_exist: Option<bool>,
    ) -> Result<Entity, TransportError> {
        let key = Self::key_of(meta, entity, operation)?;
        let position = self.position(meta, &key);
        match (must_exist, position) {
            (Some(true), None) => return Err(Self::missing(meta, operation, &key)),
            (Some(false), Some(_)) => {
                return Err(TransportError::failed(meta.entity_type(), operation, format!("{key} exists")))
            }
            _ => {}
        }

        let mut tables = self.tables.write();
        let table = tables.entry(meta.entity_type().clone()).or_default();
        match position {
            Some(index) => table[index] = entity.clone(),
            None => table.push(entity.clone()),
        }
        Ok(entity.clone())
    }

    fn remove(&self, meta: &EntityMetadata, key: &EntityKey, operation: &str) -> Result<(), TransportError> {
        let position = self
            .position(meta, key)
            .ok_or_else(|| Self::missing(meta, operation, key))?;
        if let Some(table) = self.tables.write().get_mut(meta.entity_type()) {
            table.remove(position);
        }
        Ok(())
    }
}

#[async_trait]
impl EntityTransport for MemoryTransport {
    async fn load(
        &self,
        meta: &EntityMetadata,
        key: &EntityKey,
        _criteria: Option<&Value>,
    ) -> Result<Entity, TransportError> {
        self.begin(meta, "load")?;
        let table = self.table(meta);
        self.position(meta, key)
            .map(|index| table[index].clone())
            .ok_or_else(|| Self::missing(meta, "load", key))
    }

    async fn load_all(
        &self,
        meta: &EntityMetadata,
        _criteria: Option<&Value>,
    ) -> Result<Vec<Entity>, TransportError> {
        self.begin(meta, "load_all")?;
        Ok(self.table(meta))
    }

    async fn load_many(
        &self,
        meta: &EntityMetadata,
        keys: Option<&[EntityKey]>,
        criteria: Option<&Value>,
    ) -> Result<Vec<Entity>, TransportError> {
        self.begin(meta, "load_many")?;
        let table = self.table(meta);
        let selected = table.into_iter().filter(|record| {
            let by_key = match keys {
                Some(keys) => resolve_key(meta, record)
                    .map(|key| keys.contains(&key))
                    .unwrap_or(false),
                None => true,
            };
            // Criteria: every field of the object must match.
            let by_criteria = match criteria.and_then(Value::as_object) {
                Some(fields) => fields.iter().all(|(field, value)| record.get(field) == Some(value)),
                None => true,
            };
            by_key && by_criteria
        });
        Ok(selected.collect())
    }

    async fn load_page(
        &self,
        meta: &EntityMetadata,
        page: Page,
        _criteria: Option<&Value>,
    ) -> Result<PagedEntities, TransportError> {
        self.begin(meta, "load_page")?;
        let table = self.table(meta);
        let skip = (page.page.saturating_sub(1) * page.size) as usize;
        Ok(PagedEntities {
            entities: table.iter().skip(skip).take(page.size as usize).cloned().collect(),
            page_info: Some(PageInfo {
                page,
                total_count: table.len() as u64,
            }),
        })
    }

    async fn create(
        &self,
        meta: &EntityMetadata,
        entity: &Entity,
        _criteria: Option<&Value>,
    ) -> Result<Entity, TransportError> {
        self.begin(meta, "create")?;
        self.store(meta, entity, "create", Some(false))
    }

    async fn update(
        &self,
        meta: &EntityMetadata,
        entity: &Entity,
        _criteria: Option<&Value>,
    ) -> Result<Entity, TransportError> {
        self.begin(meta, "update")?;
        self.store(meta, entity, "update", Some(true))
    }

    async fn upsert(
        &self,
        meta: &EntityMetadata,
        entity: &Entity,
        _criteria: Option<&Value>,
    ) -> Result<Entity, TransportError> {
        self.begin(meta, "upsert")?;
        self.store(meta, entity, "upsert", None)
    }

    async fn delete_by_key(
        &self,
        meta: &EntityMetadata,
        key: &EntityKey,
        _criteria: Option<&Value>,
    ) -> Result<EntityKey, TransportError> {
        self.begin(meta, "delete_by_key")?;
        self.remove(meta, key, "delete_by_key")?;
        Ok(key.clone())
    }

    async fn delete_many_by_keys(
        &self,
        meta: &EntityMetadata,
        keys: &[EntityKey],
        _criteria: Option<&Value>,
    ) -> Result<Vec<EntityKey>, TransportError> {
        self.begin(meta, "delete_many_by_keys")?;
        for key in keys {
            self.remove(meta, key, "delete_many_by_keys")?;
        }
        Ok(keys.to_vec())
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// A store with a running effects loop over a [`MemoryTransport`].
pub struct FlowHarness {
    pub store: Arc<EntityStore>,
    pub transport: Arc<MemoryTransport>,
    pub clock: Arc<MockTimeSource>,
    pub metrics: Arc<EngineMetrics>,
    effects: JoinHandle<()>,
}

impl FlowHarness {
    /// Start the effects loop. Its request feed is open on return.
    pub async fn start() -> Self {
        let clock = Arc::new(MockTimeSource::new(NOW));
        let metrics = Arc::new(EngineMetrics::new());
        let reducer = EntityReducer::new(registry())
            .with_time_source(clock.clone())
            .with_metrics(metrics.clone());
        let transport = Arc::new(MemoryTransport::new());

        let effects = EntityEffects::new(transport.clone(), &reducer);
        let store = Arc::new(EntityStore::new(reducer));
        let effects = tokio::spawn(effects.run(store.clone()));

        Self {
            store,
            transport,
            clock,
            metrics,
            effects,
        }
    }

    /// Dispatch a request and wait for the success or failure answering it.
    pub async fn request(&self, event: EntityEvent) -> Option<EntityEvent> {
        let mut responses =
            self.store
                .subscribe(EventFilter::phases(vec![EventPhase::Success, EventPhase::Failure]));
        let correlation_id = event.correlation_id;
        self.store.dispatch(event).expect("request accepted");

        let wait = async {
            while let Some(response) = responses.recv().await {
                if response.correlation_id == correlation_id {
                    return Some(response);
                }
            }
            None
        };
        tokio::time::timeout(Duration::from_millis(200), wait)
            .await
            .ok()
            .flatten()
    }
}

impl Drop for FlowHarness {
    fn drop(&mut self) {
        self.effects.abort();
    }
}
