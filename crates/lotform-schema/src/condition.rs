//! Render conditions and the predicates built from them.
//!
//! A condition reads one other field's current value. A field that is
//! missing makes every condition false except `exists: false`, so a rule
//! that points at the wrong field relaxes the form instead of breaking it.

use serde::{Deserialize, Serialize};

use lotform_model::{FormSnapshot, Value, is_missing};

/// Read access to current field values.
pub trait FieldSource {
    fn field(&self, path: &str) -> Option<&Value>;
}

/// One lot of a snapshot, as seen by condition evaluation.
#[derive(Debug, Clone, Copy)]
pub struct LotView<'a> {
    pub snapshot: &'a FormSnapshot,
    pub lot: usize,
}

impl<'a> LotView<'a> {
    pub fn new(snapshot: &'a FormSnapshot, lot: usize) -> Self {
        Self { snapshot, lot }
    }
}

impl FieldSource for LotView<'_> {
    fn field(&self, path: &str) -> Option<&Value> {
        self.snapshot.value(self.lot, path)
    }
}

impl FieldSource for std::collections::BTreeMap<String, Value> {
    fn field(&self, path: &str) -> Option<&Value> {
        lotform_model::lookup_dotted(self, path)
    }
}

/// `{ field, value?, in?, not_in?, exists? }` as written in the schema.
///
/// Every constraint present must hold. A condition with no constraint at all
/// checks that the field is filled in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_in: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

impl Condition {
    pub fn equals(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            one_of: Some(values),
            ..Self::default()
        }
    }

    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            not_in: Some(values),
            ..Self::default()
        }
    }

    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Self {
            field: field.into(),
            exists: Some(exists),
            ..Self::default()
        }
    }

    fn has_value_constraint(&self) -> bool {
        self.value.is_some() || self.one_of.is_some() || self.not_in.is_some()
    }

    /// Evaluate against the field's current value.
    pub fn holds(&self, actual: Option<&Value>) -> bool {
        let present = !is_missing(actual);
        if let Some(want) = self.exists {
            if present != want {
                return false;
            }
        } else if !self.has_value_constraint() {
            return present;
        }

        if !self.has_value_constraint() {
            return true;
        }
        let Some(actual) = actual.filter(|value| !value.is_null()) else {
            return false;
        };

        if let Some(expected) = &self.value {
            if !loose_eq(actual, expected) {
                return false;
            }
        }
        if let Some(allowed) = &self.one_of {
            if !allowed.iter().any(|candidate| loose_eq(actual, candidate)) {
                return false;
            }
        }
        if let Some(denied) = &self.not_in {
            if denied.iter().any(|candidate| loose_eq(actual, candidate)) {
                return false;
            }
        }
        true
    }

    pub fn evaluate(&self, source: &dyn FieldSource) -> bool {
        self.holds(source.field(&self.field))
    }
}

/// Numbers compare by value so `1` and `1.0` match.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => left == right,
    }
}

/// A boolean formula over conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Condition(Condition),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn evaluate(&self, source: &dyn FieldSource) -> bool {
        match self {
            Predicate::Condition(condition) => condition.evaluate(source),
            Predicate::All(parts) => parts.iter().all(|part| part.evaluate(source)),
            Predicate::Any(parts) => parts.iter().any(|part| part.evaluate(source)),
            Predicate::Not(inner) => !inner.evaluate(source),
        }
    }

    /// Every field this predicate reads, in declaration order, deduplicated.
    pub fn triggers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_triggers(&mut out);
        out
    }

    fn collect_triggers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Condition(condition) => {
                if !out.contains(&condition.field.as_str()) {
                    out.push(&condition.field);
                }
            }
            Predicate::All(parts) | Predicate::Any(parts) => {
                for part in parts {
                    part.collect_triggers(out);
                }
            }
            Predicate::Not(inner) => inner.collect_triggers(out),
        }
    }
}

impl From<Condition> for Predicate {
    fn from(condition: Condition) -> Self {
        Predicate::Condition(condition)
    }
}

/// A `render_if*` entry attached to a schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum Visibility {
    /// `render_if`
    If(Condition),
    /// `render_if_any`
    Any(Vec<Condition>),
    /// `render_if_all`
    All(Vec<Condition>),
}

impl Visibility {
    pub fn to_predicate(&self) -> Predicate {
        match self {
            Visibility::If(condition) => Predicate::Condition(condition.clone()),
            Visibility::Any(conditions) => {
                Predicate::Any(conditions.iter().cloned().map(Predicate::from).collect())
            }
            Visibility::All(conditions) => {
                Predicate::All(conditions.iter().cloned().map(Predicate::from).collect())
            }
        }
    }
}
