//! Field kind check.

use lotform_model::{FieldKind, Value};

use crate::issue::Issue;

pub fn check(path: &str, expected: FieldKind, value: Option<&Value>) -> Option<Issue> {
    let value = value?;
    (!expected.accepts(value)).then(|| Issue::KindMismatch {
        path: path.to_string(),
        expected,
    })
}
