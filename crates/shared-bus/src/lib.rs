//! # Shared Bus - Event Bus for Entity Events
//!
//! Carries `EntityEvent` envelopes between the parts of a host: the store
//! that reduces them, the effects that answer them through a transport,
//! and any observer that wants to react to state transitions.
//!
//! ## Choreography
//!
//! ```text
//! ┌──────────────┐   publish(Load)    ┌──────────────┐
//! │ EntityStore  │ ──────┐            │   Effects    │
//! │              │       │            │              │
//! └──────────────┘       │            └──────────────┘
//!        ↑               ▼                    │
//!        │         ┌──────────────┐          │
//!        │         │  Event Bus   │ ─────────┘
//!        │         └──────────────┘  feed(requests)
//!        └──────────── dispatch(LoadSuccess / LoadFailure)
//! ```
//!
//! ## Guarantees
//!
//! - **Ordering:** every subscriber sees events in publish order.
//! - **Correlation:** the bus never rewrites envelopes; request/response
//!   pairs keep their `correlation_id`.
//! - **Backpressure:** a lagging subscriber skips the oldest events and the
//!   skip is logged; publishers never block.
//! - **Feeds:** an [`EventFeed`] is filtered on publish and never skips;
//!   the effects loop reads its requests from one.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod feed;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::EventFilter;
pub use feed::EventFeed;
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are skipped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
