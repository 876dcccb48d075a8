//! Requirement rule generation.
//!
//! Rules are derived from the schema rather than hand-written: every field
//! that is listed as required *and* carries render conditions becomes a rule
//! whose predicate is the combined render condition. Hosts can add further
//! rules programmatically.

use serde_json::Value;

use crate::condition::{Condition, Predicate};
use crate::schema::FormSchema;

/// Declarative "is required" condition for one target field.
///
/// The target is required exactly when the predicate holds. A rule must never
/// read the field it governs.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementRule {
    pub target: String,
    pub predicate: Predicate,
}

impl RequirementRule {
    pub fn new(target: impl Into<String>, predicate: impl Into<Predicate>) -> Self {
        Self {
            target: target.into(),
            predicate: predicate.into(),
        }
    }

    /// Required when `trigger == value`.
    pub fn required_when(target: impl Into<String>, trigger: &str, value: Value) -> Self {
        Self::new(target, Condition::equals(trigger, value))
    }

    /// Required unless `trigger == value`.
    pub fn required_unless(target: impl Into<String>, trigger: &str, value: Value) -> Self {
        Self::new(
            target,
            Predicate::Not(Box::new(Condition::equals(trigger, value).into())),
        )
    }

    /// Fields whose values this rule reads.
    pub fn triggers(&self) -> Vec<&str> {
        self.predicate.triggers()
    }
}

/// Builds requirement rules from schema metadata.
#[derive(Debug, Default)]
pub struct RuleGenerator;

impl RuleGenerator {
    pub fn new() -> Self {
        Self
    }

    /// One rule per statically-required conditional field, in schema order.
    pub fn generate(&self, schema: &FormSchema) -> Vec<RequirementRule> {
        schema
            .fields()
            .iter()
            .filter(|spec| spec.required)
            .filter_map(|spec| {
                spec.render_predicate()
                    .map(|predicate| RequirementRule::new(spec.path.clone(), predicate))
            })
            .collect()
    }
}
