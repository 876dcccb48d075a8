//! Core types for lot-scoped wizard forms.
//!
//! A form instance is split into lots. Each lot owns a private copy of every
//! non-global field; a small closed set of global fields is shared.

pub mod error;
pub mod key;
pub mod lot;
pub mod options;
pub mod snapshot;
pub mod value;

pub use error::{ModelError, Result};
pub use key::{
    CURRENT_LOT, CURRENT_STEP, GLOBAL_FIELDS, KeyResolver, LOT_KEY_PREFIX, LOT_REGISTRY,
    SCHEMA_REF, ScopedKey, VALIDATION_MODE, is_global_field, lot_prefix,
};
pub use lot::Lot;
pub use options::EngineOptions;
pub use snapshot::{FormSnapshot, LotSnapshot};
pub use value::{FieldKind, is_missing, lookup_dotted};

/// Field values are plain JSON values.
pub use serde_json::Value;
