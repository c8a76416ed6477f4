//! # Shared Types Crate
//!
//! This crate contains the entity record, identity types, paging descriptors
//! and the `EntityEvent` envelope that every other crate in the workspace
//! speaks.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: The event wire contract is defined here.
//! - **Plain Values**: Entities are JSON-shaped records behind an `Arc`,
//!   cheap to clone and never linked to a domain type at runtime.
//! - **Envelope Correlation**: Request/response pairs share the envelope's
//!   `correlation_id`; payloads never duplicate it.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod paging;

pub use entities::*;
pub use envelope::*;
pub use errors::*;
pub use paging::*;
