//! Persisted form documents.
//!
//! This crate converts between in-memory [`FormSnapshot`]s and flat JSON
//! documents at the host boundary.
//!
//! # Document format
//!
//! Documents are written in one canonical shape with a `_meta` entry
//! carrying the format version. Older flat blobs without `_meta` are still
//! readable through pluggable key shape adapters:
//!
//! - `shape/` - one parse/emit adapter per key shape
//! - `transcoder.rs` - document encode/decode with shape precedence
//! - `document.rs` - format version and export metadata
//! - `hash.rs` - content fingerprints
//! - `error.rs` - error types with user-friendly messages
//!
//! [`FormSnapshot`]: lotform_model::FormSnapshot

mod document;
mod error;
mod hash;
pub mod shape;
mod transcoder;

pub use document::{DocumentMeta, FORMAT_VERSION, META_KEY};
pub use error::{PersistenceError, Result};
pub use hash::fingerprint;
pub use shape::{KeyShape, ShapeMatch};
pub use transcoder::{Decoded, LegacyTranscoder, SkippedKey};
