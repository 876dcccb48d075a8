//! Field kinds and value helpers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;

/// Declared kind of a schema field, resolved once when the schema is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Integer,
    Array,
    Object,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Integer => "integer",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }

    /// Returns true if `value` fits this kind. `null` fits every kind; missing
    /// values are a requirement concern, not a kind concern.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldKind::String, Value::String(_)) => true,
            (FieldKind::Number, Value::Number(_)) => true,
            (FieldKind::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            (FieldKind::Boolean, Value::Bool(_)) => true,
            (FieldKind::Array, Value::Array(_)) => true,
            (FieldKind::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(FieldKind::String),
            "number" => Ok(FieldKind::Number),
            "boolean" => Ok(FieldKind::Boolean),
            "integer" => Ok(FieldKind::Integer),
            "array" => Ok(FieldKind::Array),
            "object" => Ok(FieldKind::Object),
            _ => Err(ModelError::UnknownFieldKind(s.to_string())),
        }
    }
}

/// Returns true if a value counts as "not filled in".
///
/// Absent, `null`, blank strings and empty lists/maps are missing. Numeric
/// zero and `false` are real answers.
pub fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_) | Value::Number(_)) => false,
    }
}

/// Look up a dotted field path in a flat map.
///
/// The exact key wins. Otherwise the longest stored prefix holding an object
/// is descended into, so `a.b.c` also resolves through `{"a": {"b": {"c": 1}}}`
/// or `{"a.b": {"c": 1}}`.
pub fn lookup_dotted<'a>(map: &'a BTreeMap<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = map.get(path) {
        return Some(value);
    }
    let split_points: Vec<usize> = path.match_indices('.').map(|(idx, _)| idx).collect();
    for &idx in split_points.iter().rev() {
        let (head, tail) = (&path[..idx], &path[idx + 1..]);
        if let Some(found) = map.get(head).and_then(|value| descend(value, tail)) {
            return Some(found);
        }
    }
    None
}

fn descend<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_values() {
        assert!(is_missing(None));
        assert!(is_missing(Some(&Value::Null)));
        assert!(is_missing(Some(&json!(""))));
        assert!(is_missing(Some(&json!("   "))));
        assert!(is_missing(Some(&json!([]))));
        assert!(is_missing(Some(&json!({}))));

        assert!(!is_missing(Some(&json!(0))));
        assert!(!is_missing(Some(&json!(0.0))));
        assert!(!is_missing(Some(&json!(false))));
        assert!(!is_missing(Some(&json!("x"))));
        assert!(!is_missing(Some(&json!([1]))));
    }

    #[test]
    fn kind_acceptance() {
        assert!(FieldKind::Integer.accepts(&json!(3)));
        assert!(FieldKind::Integer.accepts(&json!(3.0)));
        assert!(!FieldKind::Integer.accepts(&json!(3.5)));
        assert!(FieldKind::Number.accepts(&json!(3.5)));
        assert!(!FieldKind::String.accepts(&json!(1)));
        assert!(FieldKind::Boolean.accepts(&Value::Null));
    }

    #[test]
    fn kind_parse() {
        assert_eq!("Boolean".parse::<FieldKind>().unwrap(), FieldKind::Boolean);
        assert!("date".parse::<FieldKind>().is_err());
    }

    #[test]
    fn dotted_lookup() {
        let mut map = BTreeMap::new();
        map.insert("a.b".to_string(), json!(1));
        map.insert("client".to_string(), json!({"info": {"name": "ACME"}}));
        assert_eq!(lookup_dotted(&map, "a.b"), Some(&json!(1)));
        assert_eq!(lookup_dotted(&map, "client.info.name"), Some(&json!("ACME")));
        assert_eq!(lookup_dotted(&map, "client.info.other"), None);
        assert_eq!(lookup_dotted(&map, "missing"), None);
    }
}
