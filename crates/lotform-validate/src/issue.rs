//! Validation issue types.
//!
//! Each variant carries only the data it needs. Messages are produced with
//! the field's display label so hosts never see raw paths.

use serde::{Deserialize, Serialize};

use lotform_model::FieldKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Issue {
    /// Currently-required field has no value
    RequiredMissing { path: String },
    /// Present value does not match the field kind
    KindMismatch { path: String, expected: FieldKind },
}

impl Issue {
    pub fn path(&self) -> &str {
        match self {
            Issue::RequiredMissing { path } | Issue::KindMismatch { path, .. } => path,
        }
    }

    /// Message for this issue, using `label` for the field.
    pub fn format_message(&self, label: &str) -> String {
        match self {
            Issue::RequiredMissing { .. } => format!("{label} is required"),
            Issue::KindMismatch { expected, .. } => {
                format!("{label} must be {} {expected}", article(expected.as_str()))
            }
        }
    }
}

fn article(word: &str) -> &'static str {
    match word.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}
