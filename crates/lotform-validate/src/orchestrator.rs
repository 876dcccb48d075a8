//! Step validation across lots.
//!
//! A step whose fields fall under a pre-entity prefix is authored once and
//! must hold in every lot, so it is validated lot by lot with each error
//! labelled by lot name. Every other step validates the current lot only.

use std::ops::{Deref, DerefMut};

use lotform_model::{ScopedKey, VALIDATION_MODE, Value};
use lotform_schema::FormSchema;
use lotform_state::{EphemeralReconciler, ScopedStateStore, StorePort};
use serde::Serialize;
use tracing::{debug, info_span};

use crate::checks::check_field;
use crate::engine::{DynamicRequirementEngine, is_required};
use crate::issue::Issue;

/// Which lots a step validation covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    CurrentLot,
    AllLots,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::CurrentLot => "current_lot",
            ValidationMode::AllLots => "all_lots",
        }
    }
}

/// Outcome of one step validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepValidation {
    pub ok: bool,
    pub errors: Vec<String>,
    pub mode: ValidationMode,
}

impl StepValidation {
    pub fn into_parts(self) -> (bool, Vec<String>) {
        (self.ok, self.errors)
    }
}

/// Restores the current-lot pointer when dropped, including during unwinding.
struct PointerGuard<'s, B: StorePort> {
    store: &'s mut ScopedStateStore<B>,
    original: usize,
}

impl<'s, B: StorePort> PointerGuard<'s, B> {
    fn new(store: &'s mut ScopedStateStore<B>) -> Self {
        let original = store.current_index();
        Self { store, original }
    }
}

impl<B: StorePort> Deref for PointerGuard<'_, B> {
    type Target = ScopedStateStore<B>;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl<B: StorePort> DerefMut for PointerGuard<'_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.store
    }
}

impl<B: StorePort> Drop for PointerGuard<'_, B> {
    fn drop(&mut self) {
        if self.store.current_index() != self.original {
            self.store.switch_lot(self.original);
        }
    }
}

pub struct ValidationOrchestrator<'a, B> {
    store: &'a mut ScopedStateStore<B>,
    schema: &'a FormSchema,
    engine: &'a DynamicRequirementEngine,
}

impl<'a, B: StorePort> ValidationOrchestrator<'a, B> {
    pub fn new(
        store: &'a mut ScopedStateStore<B>,
        schema: &'a FormSchema,
        engine: &'a DynamicRequirementEngine,
    ) -> Self {
        Self {
            store,
            schema,
            engine,
        }
    }

    /// Returns true if any of `step_keys` falls under a pre-entity prefix.
    pub fn is_pre_entity<S: AsRef<str>>(&self, step_keys: &[S]) -> bool {
        let options = self.store.options();
        step_keys.iter().any(|key| options.is_pre_entity(key.as_ref()))
            || self
                .schema
                .expand(step_keys)
                .iter()
                .any(|key| options.is_pre_entity(key))
    }

    /// Validate the fields of one wizard step.
    ///
    /// Staged UI values are reconciled first. Errors are also recorded in the
    /// store's error bag and the mode used is written to `validation_mode`.
    pub fn validate_step<S: AsRef<str>>(
        &mut self,
        step_keys: &[S],
        step: Option<usize>,
    ) -> StepValidation {
        EphemeralReconciler::new(self.store).ensure_ready();

        let keys = self.schema.expand(step_keys);
        let mode = if self.is_pre_entity(step_keys) && self.store.lot_count() > 1 {
            ValidationMode::AllLots
        } else {
            ValidationMode::CurrentLot
        };
        let span = info_span!("validate_step", step = ?step, mode = mode.as_str());
        let _entered = span.enter();

        let errors = match mode {
            ValidationMode::CurrentLot => {
                validate_lot(self.store, self.schema, self.engine, &keys)
                    .iter()
                    .map(|issue| issue.format_message(self.schema.label(issue.path())))
                    .collect()
            }
            ValidationMode::AllLots => self.validate_all_lots(&keys),
        };

        self.store
            .set_global(VALIDATION_MODE, Value::from(mode.as_str()));
        debug!(errors = errors.len(), "step validated");
        StepValidation {
            ok: errors.is_empty(),
            errors,
            mode,
        }
    }

    fn validate_all_lots(&mut self, keys: &[String]) -> Vec<String> {
        let schema = self.schema;
        let engine = self.engine;
        let mut guard = PointerGuard::new(self.store);
        let mut errors = Vec::new();
        for index in 0..guard.lot_count() {
            guard.switch_lot(index);
            let name = guard.registry().display_name(index);
            let issues = validate_lot(&mut guard, schema, engine, keys);
            for issue in issues {
                let message = issue.format_message(schema.label(issue.path()));
                errors.push(guard.options().format_lot_error(&name, &message));
            }
        }
        errors
    }
}

/// Validate `keys` in the store's current lot and refresh its error bag.
fn validate_lot<B: StorePort>(
    store: &mut ScopedStateStore<B>,
    schema: &FormSchema,
    engine: &DynamicRequirementEngine,
    keys: &[String],
) -> Vec<Issue> {
    let snapshot = store.snapshot();
    let lot = store.current_index();
    let required = engine.recompute_for_lot(&snapshot, lot);
    let resolver = store.resolver();

    let mut issues = Vec::new();
    for key in keys {
        let scoped: ScopedKey = resolver.resolve(key);
        store.clear_errors_at(&scoped);
        let kind = schema.field(key).map(|spec| spec.kind);
        let value = snapshot.value(lot, key);
        if let Some(issue) = check_field(key, kind, value, is_required(&required, key)) {
            store.add_error_at(&scoped, issue.format_message(schema.label(key)));
            issues.push(issue);
        }
    }
    issues
}
