//! The form session: one schema, one store, one interaction cycle at a time.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use lotform_model::{CURRENT_STEP, EngineOptions, FormSnapshot, Lot, SCHEMA_REF, ScopedKey, Value};
use lotform_persistence::{LegacyTranscoder, SkippedKey, fingerprint};
use lotform_schema::{FormSchema, RequirementRule};
use lotform_state::{EphemeralReconciler, MemoryStore, ScopedStateStore, StorePort, effective_value};
use lotform_validate::{DynamicRequirementEngine, StepValidation, ValidationOrchestrator, format_label};
use serde_json::Map;
use tracing::{debug, info, trace, warn};

use crate::logging::redact_value;

/// Everything a wizard page needs: field access, validation, lots,
/// navigation and document import/export.
///
/// Collaborators only ever talk to the store through this type.
pub struct FormSession<B = MemoryStore> {
    store: ScopedStateStore<B>,
    schema: FormSchema,
    engine: DynamicRequirementEngine,
    transcoder: LegacyTranscoder,
    schema_ref: String,
}

impl FormSession<MemoryStore> {
    /// Session over a fresh in-memory store.
    ///
    /// `schema_json` is the form schema; `options_toml` optionally overrides
    /// [`EngineOptions`] defaults.
    pub fn from_sources(schema_json: &str, options_toml: Option<&str>) -> Result<Self> {
        Self::from_sources_with_backend(MemoryStore::new(), schema_json, options_toml)
    }
}

impl<B: StorePort> FormSession<B> {
    /// Session over an existing backend. Lots and values already in the
    /// backend are kept.
    pub fn from_sources_with_backend(
        backend: B,
        schema_json: &str,
        options_toml: Option<&str>,
    ) -> Result<Self> {
        let options = match options_toml {
            Some(text) => {
                EngineOptions::from_toml_str(text).context("failed to parse engine options")?
            }
            None => EngineOptions::default(),
        };
        let schema = FormSchema::from_json_str(schema_json).context("failed to load form schema")?;
        Ok(Self::with_backend(
            backend,
            schema,
            fingerprint(schema_json),
            options,
        ))
    }

    /// Session from already-loaded parts. `schema_ref` identifies the schema
    /// revision and is recorded in the store.
    pub fn with_backend(
        backend: B,
        schema: FormSchema,
        schema_ref: impl Into<String>,
        options: EngineOptions,
    ) -> Self {
        let schema_ref = schema_ref.into();
        let mut store = ScopedStateStore::with_options(backend, options.clone());
        if let Some(stored) = store.get_global(SCHEMA_REF)
            && stored.as_str() != Some(schema_ref.as_str())
        {
            warn!(
                stored = %stored,
                schema_ref = %schema_ref,
                "backend was written with a different schema"
            );
        }
        store.set_global(SCHEMA_REF, Value::from(schema_ref.as_str()));

        let engine = DynamicRequirementEngine::new(&schema);
        info!(
            fields = schema.len(),
            rules = engine.rules().len(),
            lots = store.lot_count(),
            "form session ready"
        );
        Self {
            store,
            schema,
            engine,
            transcoder: LegacyTranscoder::new(options),
            schema_ref,
        }
    }

    pub fn store(&self) -> &ScopedStateStore<B> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ScopedStateStore<B> {
        &mut self.store
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn engine(&self) -> &DynamicRequirementEngine {
        &self.engine
    }

    /// Fingerprint of the schema this session was built with.
    pub fn schema_ref(&self) -> &str {
        &self.schema_ref
    }

    pub fn options(&self) -> &EngineOptions {
        self.store.options()
    }

    /// Register a hand-written requirement rule.
    pub fn add_rule(&mut self, rule: RequirementRule) {
        self.engine.add_rule(rule);
    }

    // Field access

    /// The value a reader of `path` sees, staged UI values included.
    pub fn get(&self, path: &str) -> Option<Value> {
        effective_value(&self.store, path)
    }

    /// Write `path` in the current lot, or globally for global fields.
    ///
    /// Values staged for `path` are reconciled first, so this write is the
    /// one that sticks.
    pub fn set(&mut self, path: &str, value: Value) {
        EphemeralReconciler::new(&mut self.store).sync_one(path);
        trace!(path, value = %redact_value(&value), "set field");
        self.store.set_field(path, value);
    }

    /// Stage a UI value for `path` in the current lot.
    pub fn stage(&mut self, path: &str, value: Value) {
        trace!(path, value = %redact_value(&value), "staged field");
        self.store.set_ephemeral(path, value);
    }

    pub fn delete(&mut self, path: &str) -> bool {
        EphemeralReconciler::new(&mut self.store).sync_one(path);
        self.store.delete_field(path)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Fold every staged UI value into the store. Returns the number of
    /// values that changed.
    pub fn sync(&mut self) -> usize {
        EphemeralReconciler::new(&mut self.store).sync_all()
    }

    /// Errors recorded for `path` by the last validation of the current lot.
    pub fn errors(&self, path: &str) -> Vec<String> {
        self.store.get_errors(path)
    }

    // Validation

    /// Validate a step's fields and return `(ok, errors)`.
    pub fn validate<S: AsRef<str>>(&mut self, step_keys: &[S]) -> (bool, Vec<String>) {
        self.validate_step(step_keys).into_parts()
    }

    pub fn validate_step<S: AsRef<str>>(&mut self, step_keys: &[S]) -> StepValidation {
        let step = self.current_step();
        ValidationOrchestrator::new(&mut self.store, &self.schema, &self.engine)
            .validate_step(step_keys, Some(step))
    }

    /// Which fields are required in the current lot right now.
    pub fn required_fields(&mut self) -> BTreeMap<String, bool> {
        EphemeralReconciler::new(&mut self.store).ensure_ready();
        self.engine
            .recompute_for_lot(&self.store.snapshot(), self.store.current_index())
    }

    /// Display label for `path`, marked when the field is required.
    pub fn label(&mut self, path: &str) -> String {
        let required = self.required_fields();
        format_label(
            &self.schema,
            &required,
            path,
            &self.store.options().required_marker,
        )
    }

    // Snapshots and documents

    /// Every lot's data plus global values, after reconciling staged values.
    pub fn snapshot(&mut self) -> FormSnapshot {
        EphemeralReconciler::new(&mut self.store).ensure_ready();
        self.store.snapshot()
    }

    /// Replace the session's state with `snapshot`.
    pub fn load(&mut self, snapshot: &FormSnapshot) {
        match snapshot.global.get(SCHEMA_REF) {
            Some(loaded) if loaded.as_str() != Some(self.schema_ref.as_str()) => {
                warn!(
                    loaded = %loaded,
                    schema_ref = %self.schema_ref,
                    "loaded snapshot was written with a different schema"
                );
            }
            _ => {}
        }
        self.store.load(snapshot);
        if self.store.get_global(SCHEMA_REF).is_none() {
            self.store
                .set_global(SCHEMA_REF, Value::from(self.schema_ref.as_str()));
        }
    }

    /// Export as a canonical document.
    pub fn export_document(&mut self) -> Map<String, Value> {
        let snapshot = self.snapshot();
        self.transcoder.encode(&snapshot)
    }

    pub fn export_json(&mut self) -> lotform_persistence::Result<String> {
        let snapshot = self.snapshot();
        self.transcoder.encode_string(&snapshot)
    }

    /// Load a canonical document or a legacy blob. Returns the keys that
    /// could not be read.
    pub fn import_document(
        &mut self,
        document: &Map<String, Value>,
    ) -> lotform_persistence::Result<Vec<SkippedKey>> {
        let decoded = self.transcoder.decode(document)?;
        self.load(&decoded.snapshot);
        Ok(decoded.skipped)
    }

    pub fn import_json(&mut self, text: &str) -> lotform_persistence::Result<Vec<SkippedKey>> {
        let decoded = self.transcoder.decode_str(text)?;
        self.load(&decoded.snapshot);
        Ok(decoded.skipped)
    }

    // Lots

    pub fn lots(&self) -> &[Lot] {
        self.store.lots()
    }

    pub fn current_lot(&self) -> usize {
        self.store.current_index()
    }

    pub fn add_lot(&mut self, name: Option<&str>) -> usize {
        self.store.add_lot(name)
    }

    pub fn remove_lot(&mut self, index: usize) -> bool {
        self.store.remove_lot(index)
    }

    pub fn rename_lot(&mut self, index: usize, name: &str) -> bool {
        self.store.rename_lot(index, name)
    }

    pub fn switch_lot(&mut self, index: usize) -> bool {
        self.store.switch_lot(index)
    }

    pub fn copy_lot(&mut self, from: usize, to: usize) -> bool {
        self.store.copy_lot_data(from, to)
    }

    pub fn clear_lot(&mut self, index: usize) -> bool {
        self.store.clear_lot_data(index)
    }

    /// Copy the current lot's value of `path` into every other lot, deleting
    /// it there when the current lot has none. Returns the number of lots
    /// that changed. Global fields are left alone.
    pub fn replicate(&mut self, path: &str) -> usize {
        EphemeralReconciler::new(&mut self.store).sync_one(path);
        let source = self.store.resolver().resolve(path);
        let Some(current) = source.lot_index() else {
            return 0;
        };
        let value = self.store.get_scoped(&source);

        let mut changed = 0;
        for index in (0..self.store.lot_count()).filter(|index| *index != current) {
            let target: ScopedKey = source.with_lot(index);
            if self.store.get_scoped(&target) == value {
                continue;
            }
            match &value {
                Some(value) => self.store.set_scoped(&target, value.clone()),
                None => {
                    self.store.delete_scoped(&target);
                }
            }
            changed += 1;
        }
        debug!(path, changed, "replicated field across lots");
        changed
    }

    /// Replicate every field of a step. Group keys expand to their fields.
    pub fn replicate_step<S: AsRef<str>>(&mut self, step_keys: &[S]) -> usize {
        let paths = self.schema.expand(step_keys);
        paths.iter().map(|path| self.replicate(path)).sum()
    }

    // Navigation

    /// Index of the current wizard step. Defaults to 0.
    pub fn current_step(&self) -> usize {
        self.store
            .get_global(CURRENT_STEP)
            .and_then(|step| step.as_u64())
            .and_then(|step| usize::try_from(step).ok())
            .unwrap_or(0)
    }

    pub fn go_to_step(&mut self, step: usize) {
        self.store.set_global(CURRENT_STEP, Value::from(step));
    }

    /// Validate the current step and move to the next one if it passes.
    pub fn advance<S: AsRef<str>>(&mut self, step_keys: &[S]) -> StepValidation {
        let result = self.validate_step(step_keys);
        if result.ok {
            let next = self.current_step() + 1;
            self.go_to_step(next);
            debug!(step = next, "advanced wizard step");
        }
        result
    }
}
