//! Form schema loading.
//!
//! The schema is a nested object of `properties` with per-level `required`
//! lists and optional `render_if` / `render_if_any` / `render_if_all`
//! conditions. It is flattened once into dotted field paths; kinds and
//! inherited conditions are resolved at load time and never re-inspected.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use lotform_model::FieldKind;

use crate::condition::{Condition, Predicate, Visibility};
use crate::error::{Result, SchemaError};

/// One flattened schema field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Dotted path from the schema root.
    pub path: String,
    pub kind: FieldKind,
    pub title: Option<String>,
    /// Listed in the enclosing object's `required` array.
    pub required: bool,
    /// Inherited conditions first, then the field's own, all of which must hold.
    pub visibility: Vec<Visibility>,
    /// Object field with nested properties of its own.
    pub is_group: bool,
}

impl FieldSpec {
    /// The schema title, or the last path segment when there is none.
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .unwrap_or_else(|| self.path.rsplit('.').next().unwrap_or(&self.path))
    }

    pub fn is_conditional(&self) -> bool {
        !self.visibility.is_empty()
    }

    /// Combined render predicate, if the field has conditions.
    pub fn render_predicate(&self) -> Option<Predicate> {
        match self.visibility.as_slice() {
            [] => None,
            [single] => Some(single.to_predicate()),
            many => Some(Predicate::All(
                many.iter().map(Visibility::to_predicate).collect(),
            )),
        }
    }
}

/// A flattened, read-only form schema.
#[derive(Debug, Clone, Default)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
    by_path: HashMap<String, usize>,
}

impl FormSchema {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn from_value(root: &Value) -> Result<Self> {
        let root = root
            .as_object()
            .ok_or_else(|| SchemaError::invalid("$", "schema root must be an object"))?;
        let mut schema = Self::default();
        schema.collect_level(root, "", &[])?;
        debug!(fields = schema.fields.len(), "loaded form schema");
        Ok(schema)
    }

    fn collect_level(
        &mut self,
        object: &Map<String, Value>,
        prefix: &str,
        inherited: &[Visibility],
    ) -> Result<()> {
        let level = if prefix.is_empty() { "$" } else { prefix };
        let required = read_required(object, level)?;
        let Some(properties) = object.get("properties") else {
            return Ok(());
        };
        let properties = properties
            .as_object()
            .ok_or_else(|| SchemaError::invalid(level, "'properties' must be an object"))?;

        for (name, property) in properties {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            let property = property
                .as_object()
                .ok_or_else(|| SchemaError::invalid(&path, "property must be an object"))?;

            let mut visibility = inherited.to_vec();
            visibility.extend(read_visibility(property, &path)?);

            let is_group = property.contains_key("properties");
            let kind = match property.get("type") {
                Some(Value::String(kind)) => {
                    kind.parse::<FieldKind>()
                        .map_err(|_| SchemaError::UnknownFieldKind {
                            path: path.clone(),
                            kind: kind.clone(),
                        })?
                }
                Some(other) => {
                    return Err(SchemaError::invalid(
                        &path,
                        format!("'type' must be a string, found {other}"),
                    ));
                }
                None if is_group => FieldKind::Object,
                None => FieldKind::String,
            };

            self.push(FieldSpec {
                path: path.clone(),
                kind,
                title: property
                    .get("title")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                required: required.iter().any(|r| r == name),
                visibility: visibility.clone(),
                is_group,
            })?;

            if is_group {
                self.collect_level(property, &path, &visibility)?;
            }
        }
        Ok(())
    }

    fn push(&mut self, spec: FieldSpec) -> Result<()> {
        if self.by_path.contains_key(&spec.path) {
            return Err(SchemaError::invalid(&spec.path, "duplicate field path"));
        }
        self.by_path.insert(spec.path.clone(), self.fields.len());
        self.fields.push(spec);
        Ok(())
    }

    /// All fields in declaration order (parents before children).
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, path: &str) -> Option<&FieldSpec> {
        self.by_path.get(path).map(|&idx| &self.fields[idx])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Display label for `path`, falling back to the path itself.
    pub fn label<'a>(&'a self, path: &'a str) -> &'a str {
        self.field(path).map_or(path, FieldSpec::label)
    }

    /// Replace group paths with their leaf descendants, keeping order and
    /// dropping duplicates. Paths the schema does not know are kept as-is.
    pub fn expand<S: AsRef<str>>(&self, keys: &[S]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for key in keys {
            let key = key.as_ref();
            let leaves: Vec<&str> = match self.field(key) {
                Some(spec) if spec.is_group => {
                    let prefix = format!("{key}.");
                    self.fields
                        .iter()
                        .filter(|f| !f.is_group && f.path.starts_with(&prefix))
                        .map(|f| f.path.as_str())
                        .collect()
                }
                _ => vec![key],
            };
            for leaf in leaves {
                if !out.iter().any(|existing| existing == leaf) {
                    out.push(leaf.to_string());
                }
            }
        }
        out
    }
}

fn read_required(object: &Map<String, Value>, level: &str) -> Result<Vec<String>> {
    match object.get("required") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    SchemaError::invalid(level, "'required' entries must be strings")
                })
            })
            .collect(),
        Some(_) => Err(SchemaError::invalid(level, "'required' must be an array")),
    }
}

fn read_visibility(property: &Map<String, Value>, path: &str) -> Result<Vec<Visibility>> {
    let mut out = Vec::new();
    if let Some(raw) = property.get("render_if") {
        out.push(Visibility::If(parse_condition(raw, path)?));
    }
    if let Some(raw) = property.get("render_if_any") {
        out.push(Visibility::Any(parse_conditions(raw, path)?));
    }
    if let Some(raw) = property.get("render_if_all") {
        out.push(Visibility::All(parse_conditions(raw, path)?));
    }
    Ok(out)
}

fn parse_condition(raw: &Value, path: &str) -> Result<Condition> {
    serde_json::from_value(raw.clone()).map_err(|source| SchemaError::InvalidCondition {
        path: path.to_string(),
        source,
    })
}

fn parse_conditions(raw: &Value, path: &str) -> Result<Vec<Condition>> {
    serde_json::from_value(raw.clone()).map_err(|source| SchemaError::InvalidCondition {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> FormSchema {
        FormSchema::from_value(&json!({
            "properties": {
                "clientInfo": {
                    "type": "object",
                    "title": "Client",
                    "properties": {
                        "isSingleClient": {"type": "boolean", "title": "Single client"},
                        "singleClientName": {
                            "type": "string",
                            "title": "Client name",
                            "render_if": {"field": "clientInfo.isSingleClient", "value": true}
                        }
                    },
                    "required": ["isSingleClient", "singleClientName"]
                },
                "volume": {"type": "integer"}
            },
            "required": ["clientInfo"]
        }))
        .expect("valid schema")
    }

    #[test]
    fn flattens_nested_properties_in_order() {
        let schema = schema();
        let paths: Vec<&str> = schema.fields().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "clientInfo",
                "clientInfo.isSingleClient",
                "clientInfo.singleClientName",
                "volume"
            ]
        );
        let name = schema.field("clientInfo.singleClientName").unwrap();
        assert!(name.required);
        assert!(name.is_conditional());
        assert_eq!(name.kind, FieldKind::String);
        assert_eq!(schema.field("volume").unwrap().kind, FieldKind::Integer);
        assert!(!schema.field("volume").unwrap().required);
    }

    #[test]
    fn labels_fall_back_to_last_segment() {
        let schema = schema();
        assert_eq!(schema.label("clientInfo.singleClientName"), "Client name");
        assert_eq!(schema.label("volume"), "volume");
        assert_eq!(schema.label("unknown.path"), "unknown.path");
    }

    #[test]
    fn expands_groups_to_leaves() {
        let schema = schema();
        assert_eq!(
            schema.expand(&["clientInfo", "volume", "clientInfo.isSingleClient"]),
            vec![
                "clientInfo.isSingleClient".to_string(),
                "clientInfo.singleClientName".to_string(),
                "volume".to_string()
            ]
        );
    }

    #[test]
    fn children_inherit_parent_conditions() {
        let schema = FormSchema::from_value(&json!({
            "properties": {
                "hasLots": {"type": "boolean"},
                "lotDetails": {
                    "render_if": {"field": "hasLots", "value": true},
                    "properties": {
                        "count": {
                            "type": "integer",
                            "render_if_any": [{"field": "mode", "in": ["a", "b"]}]
                        }
                    }
                }
            }
        }))
        .unwrap();
        let count = schema.field("lotDetails.count").unwrap();
        assert_eq!(count.visibility.len(), 2);
        assert!(matches!(count.visibility[0], Visibility::If(_)));
        assert!(matches!(count.visibility[1], Visibility::Any(_)));
        assert_eq!(schema.field("lotDetails").unwrap().kind, FieldKind::Object);
    }

    #[test]
    fn rejects_malformed_schemas() {
        assert!(matches!(
            FormSchema::from_value(&json!({"properties": {"a": {"type": "date"}}})),
            Err(SchemaError::UnknownFieldKind { .. })
        ));
        assert!(matches!(
            FormSchema::from_value(&json!({"properties": {"a": {"render_if": 3}}})),
            Err(SchemaError::InvalidCondition { .. })
        ));
        assert!(FormSchema::from_value(&json!([])).is_err());
        assert!(FormSchema::from_json_str("{").is_err());
    }
}
