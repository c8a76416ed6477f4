//! # Auto-Entity Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Criterion benchmark bodies
//! │   └── merge_scaling.rs
//! │
//! └── integration/      # Store + effects + transport round trips
//!     ├── harness.rs
//!     ├── flows.rs
//!     └── telemetry.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ae-tests
//!
//! # By category
//! cargo test -p ae-tests integration::flows
//! cargo test -p ae-tests integration::telemetry
//!
//! # Benchmarks
//! cargo bench -p ae-tests
//! ```

pub mod benchmarks;
pub mod integration;
