//! Lot-scoped wizard form engine.
//!
//! A form is split into lots, each owning a private copy of every
//! non-global field. Pre-entity steps are authored once and validated
//! across every lot. [`FormSession`] wires the pieces together:
//!
//! - `lotform-model` - scoped keys, lots, snapshots, options
//! - `lotform-schema` - flattened schema and requirement rules
//! - `lotform-state` - the scoped store and ephemeral reconciliation
//! - `lotform-validate` - requirement engine and step validation
//! - `lotform-persistence` - canonical and legacy documents
//!
//! # Example
//!
//! ```ignore
//! use lotform_core::FormSession;
//! use serde_json::json;
//!
//! let mut session = FormSession::from_sources(schema_json, None)?;
//! session.set("clientInfo.isSingleClient", json!(true));
//! session.add_lot(Some("Roads"));
//!
//! let (ok, errors) = session.validate(&["clientInfo"]);
//! let document = session.export_json()?;
//! ```

pub mod logging;
mod session;

pub use session::FormSession;

pub use lotform_model::{
    EngineOptions, FieldKind, FormSnapshot, Lot, LotSnapshot, ScopedKey, Value,
};
pub use lotform_persistence::{PersistenceError, SkippedKey};
pub use lotform_schema::{FormSchema, RequirementRule};
pub use lotform_state::{MemoryStore, SharedStore, StorePort};
pub use lotform_validate::{StepValidation, ValidationMode};
