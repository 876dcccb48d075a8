//! Per-field checks.
//!
//! A field yields at most one issue: a missing required value is reported
//! before any kind concern.

pub mod kind;
pub mod required;

use lotform_model::{FieldKind, Value};

use crate::issue::Issue;

/// Run every check for one field value.
pub fn check_field(
    path: &str,
    kind: Option<FieldKind>,
    value: Option<&Value>,
    required: bool,
) -> Option<Issue> {
    required::check(path, value, required)
        .or_else(|| kind.and_then(|kind| kind::check(path, kind, value)))
}
