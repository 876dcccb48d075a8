//! Lot-scoped form state.
//!
//! - `backend` defines the key/value port and in-memory backends
//! - `registry` tracks lot descriptors and the current-lot pointer
//! - `store` scopes every field access to the current lot
//! - `reconcile` folds staged UI values into authoritative state

pub mod backend;
pub mod reconcile;
pub mod registry;
pub mod store;

pub use backend::{MemoryStore, SharedStore, StorePort};
pub use reconcile::{EPHEMERAL_PRECEDENCE, EphemeralReconciler, EphemeralSource, effective_value};
pub use registry::LotRegistry;
pub use store::{EPHEMERAL_PREFIX, ERROR_PREFIX, EphemeralSlot, ScopedStateStore};
