//! Required-field label formatting.

use std::collections::BTreeMap;

use lotform_schema::FormSchema;

use crate::engine::is_required;

/// Display label for `path`, with `marker` appended while it is required.
pub fn format_label(
    schema: &FormSchema,
    required: &BTreeMap<String, bool>,
    path: &str,
    marker: &str,
) -> String {
    let label = schema.label(path);
    if is_required(required, path) {
        format!("{label}{marker}")
    } else {
        label.to_string()
    }
}
