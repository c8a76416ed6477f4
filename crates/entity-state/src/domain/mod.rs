//! Domain layer: metadata, keys, the state tree and its addressing.

pub mod collection;
pub mod errors;
pub mod key;
pub mod locator;
pub mod metadata;
pub mod slice;
pub mod tree;

pub use collection::{EntityCollection, EntityMap, KeyList};
pub use errors::{ConfigurationError, EngineError};
pub use key::{resolve_key, resolve_keyed, resolve_keys, try_resolve_key, COMPOSITE_KEY_SEPARATOR};
pub use locator::{locate, write, StateAddress};
pub use metadata::{Comparer, EntityMetadata, EntityMetadataBuilder, EntityRegistry};
pub use slice::{EditBuffer, EntitySlice, Paging, Selections, Tracking};
pub use tree::{RootState, RootStateBuilder, StateNode};
