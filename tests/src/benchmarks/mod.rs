//! # Auto-Entity Benchmarks
//!
//! Criterion bodies registered by `benches/engine_benchmarks.rs`.

pub mod merge_scaling;
