//! # Merge Scaling Benchmarks
//!
//! Claims to validate:
//! - Merging N records into an M-record collection costs O(N log M),
//!   nearly flat in M, whether the state is edited in place or the prior
//!   root is kept alongside the new one
//! - A memoized selector answers in O(1) until its slice changes
//!
//! Conditions:
//! - M from 10³ to 10⁶ existing records
//! - N of 10, 100 and 1000 incoming records per event

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use entity_state::{
    EntityActions, EntityMetadata, EntityReducer, EntityRegistry, EntitySelectors, RootState,
};
use serde_json::json;
use shared_types::{Entity, EntityEvent, EventPayload};
use std::sync::Arc;
use std::time::Duration;

const EXISTING: [usize; 4] = [1_000, 10_000, 100_000, 1_000_000];
const INCOMING: [usize; 3] = [10, 100, 1_000];

fn reducer() -> EntityReducer {
    let metadata = EntityMetadata::builder("Customer")
        .model_name("Customer")
        .key_field("id")
        .comparer("byId", |a: &Entity, b: &Entity| {
            a.get("id").and_then(|v| v.as_i64()).cmp(&b.get("id").and_then(|v| v.as_i64()))
        })
        .default_comparer("byId")
        .build()
        .expect("metadata");
    let registry = EntityRegistry::new().with(metadata).expect("registry");
    EntityReducer::new(Arc::new(registry))
}

fn records(start: i64, count: usize) -> Vec<Entity> {
    (start..start + count as i64)
        .map(|id| Entity::from_fields([("id", json!(id)), ("name", json!("bench"))]))
        .collect()
}

/// `LoadManySuccess` carrying `count` records with ids from `start`.
pub fn batch(start: i64, count: usize) -> EntityEvent {
    let request = EntityActions::new("Customer").load_many(std::iter::empty());
    EntityActions::success(&request, EventPayload::Entities(records(start, count)))
        .expect("load many has a success kind")
}

/// A root whose Customer slice holds `existing` records.
pub fn seeded(reducer: &EntityReducer, existing: usize) -> RootState {
    let request = EntityActions::new("Customer").load_all();
    let success = EntityActions::success(&request, EventPayload::Entities(records(0, existing)))
        .expect("load all has a success kind");
    reducer
        .reduce(reducer.registry().initial_state(), &success)
        .expect("seed reduces")
}

pub fn merge_into_existing(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity-state/merge");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(10));

    let reducer = reducer();

    for existing in EXISTING {
        for incoming in INCOMING {
            let mut state = seeded(&reducer, existing);
            let mut next_id = existing as i64;

            group.throughput(Throughput::Elements(incoming as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("n{incoming}"), existing),
                &incoming,
                |b, &incoming| {
                    b.iter(|| {
                        // Fresh ids each time so every merge appends.
                        let event = batch(next_id, incoming);
                        next_id += incoming as i64;
                        black_box(reducer.apply(&mut state, &event).expect("merge reduces"))
                    })
                },
            );
        }
    }

    group.finish();
}

/// `(root, event) -> root'` with the prior root kept alive, as a host
/// holding snapshots or an undo history would.
pub fn merge_keeping_prior_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity-state/merge_shared");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(10));

    let reducer = reducer();

    for existing in EXISTING {
        let prior = seeded(&reducer, existing);

        for incoming in INCOMING {
            let event = batch(existing as i64, incoming);

            group.throughput(Throughput::Elements(incoming as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("n{incoming}"), existing),
                &event,
                |b, event| {
                    b.iter(|| black_box(reducer.reduce(prior.clone(), event).expect("merge reduces")))
                },
            );
        }
    }

    group.finish();
}

pub fn memoized_sorted_selector(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity-state/selectors");
    group.measurement_time(Duration::from_secs(5));

    let reducer = reducer();
    let metadata = reducer
        .registry()
        .get(&"Customer".into())
        .expect("registered")
        .clone();

    for existing in [1_000, 100_000] {
        let state = seeded(&reducer, existing);
        let selectors = EntitySelectors::new(metadata.clone());
        let slice = selectors.slice(&state).expect("slice present");
        // Prime the memo.
        selectors.sorted(&slice);

        group.bench_with_input(BenchmarkId::new("sorted_memo_hit", existing), &slice, |b, slice| {
            b.iter(|| black_box(selectors.sorted(slice)))
        });
    }

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    merge_into_existing(c);
    merge_keeping_prior_root(c);
    memoized_sorted_selector(c);
}
