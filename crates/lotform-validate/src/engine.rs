//! Dynamic requirement engine.
//!
//! The required map is rebuilt from scratch on every call: static `required`
//! flags first, then every rule in declaration order. A later rule for the
//! same target overrides an earlier one.

use std::collections::BTreeMap;

use lotform_model::FormSnapshot;
use lotform_schema::{FormSchema, LotView, RequirementRule, RuleGenerator};
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct DynamicRequirementEngine {
    static_required: Vec<(String, bool)>,
    rules: Vec<RequirementRule>,
    /// Trigger field -> indices into `rules`.
    by_trigger: BTreeMap<String, Vec<usize>>,
}

impl DynamicRequirementEngine {
    /// Engine with the schema's static flags and its generated rules.
    pub fn new(schema: &FormSchema) -> Self {
        let mut engine = Self {
            static_required: schema
                .fields()
                .iter()
                .filter(|spec| !spec.is_group)
                .map(|spec| (spec.path.clone(), spec.required))
                .collect(),
            ..Self::default()
        };
        for rule in RuleGenerator::new().generate(schema) {
            engine.add_rule(rule);
        }
        engine
    }

    pub fn with_rule(mut self, rule: RequirementRule) -> Self {
        self.add_rule(rule);
        self
    }

    /// Register a rule after every rule already declared.
    pub fn add_rule(&mut self, rule: RequirementRule) {
        let position = self.rules.len();
        for trigger in rule.triggers() {
            self.by_trigger
                .entry(trigger.to_string())
                .or_default()
                .push(position);
        }
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RequirementRule] {
        &self.rules
    }

    /// Targets whose requirement depends on `trigger`, in declaration order.
    pub fn dependents_of(&self, trigger: &str) -> Vec<&str> {
        let mut targets: Vec<&str> = Vec::new();
        for &position in self.by_trigger.get(trigger).into_iter().flatten() {
            let target = self.rules[position].target.as_str();
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }

    /// Required map for the snapshot's current lot.
    pub fn recompute(&self, snapshot: &FormSnapshot) -> BTreeMap<String, bool> {
        self.recompute_for_lot(snapshot, snapshot.current_lot())
    }

    /// Required map as seen from `lot`.
    pub fn recompute_for_lot(&self, snapshot: &FormSnapshot, lot: usize) -> BTreeMap<String, bool> {
        let view = LotView::new(snapshot, lot);
        let mut required: BTreeMap<String, bool> = self.static_required.iter().cloned().collect();
        for rule in &self.rules {
            let holds = rule.predicate.evaluate(&view);
            required.insert(rule.target.clone(), holds);
        }
        trace!(
            lot,
            required = required.values().filter(|r| **r).count(),
            "recomputed requirements"
        );
        required
    }
}

/// Returns true if `path` is required in a map produced by the engine.
pub fn is_required(required: &BTreeMap<String, bool>, path: &str) -> bool {
    required.get(path).copied().unwrap_or(false)
}
