//! # Auto-Entity Engine Benchmarks
//!
//! Performance validation for the engine's scaling claims:
//!
//! | Area | Claim | Target |
//! |------|-------|--------|
//! | Reducer | merge N into M is O(N) | flat across M = 10³..10⁶ |
//! | Selectors | memo hit is O(1) | flat across M |

use ae_tests::benchmarks::merge_scaling;
use criterion::{criterion_group, criterion_main, Criterion};

fn engine_benchmarks(c: &mut Criterion) {
    merge_scaling::register_benchmarks(c);
}

criterion_group!(benches, engine_benchmarks);
criterion_main!(benches);
