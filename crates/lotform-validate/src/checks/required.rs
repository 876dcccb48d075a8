//! Required-value check.
//!
//! `null`, blank strings and empty lists or maps count as missing. Numeric
//! zero and `false` are values.

use lotform_model::{Value, is_missing};

use crate::issue::Issue;

pub fn check(path: &str, value: Option<&Value>, required: bool) -> Option<Issue> {
    (required && is_missing(value)).then(|| Issue::RequiredMissing {
        path: path.to_string(),
    })
}
