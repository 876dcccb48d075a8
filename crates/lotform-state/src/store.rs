//! Lot-scoped state store.
//!
//! The store owns a backend and a registry. Field paths are resolved through
//! a [`KeyResolver`] built from the current pointer, so every read and write
//! lands in the current lot unless the path is global.
//!
//! The backend holds three namespaces:
//!
//! - authoritative values under `lot:<i>:<path>` and bare global paths
//! - ephemeral UI values under `ui:lot:<i>:<path>` and legacy `ui:<path>`
//! - the error bag under `errors:<scoped key>`
//!
//! Lot removal migrates all three so indices stay contiguous.

use std::collections::BTreeMap;

use lotform_model::{
    CURRENT_LOT, EngineOptions, FormSnapshot, KeyResolver, LOT_KEY_PREFIX, LOT_REGISTRY, Lot,
    LotSnapshot, ScopedKey, Value, lot_prefix,
};
use tracing::{debug, info, warn};

use crate::backend::StorePort;
use crate::registry::LotRegistry;

/// Backend prefix of the ephemeral namespace.
pub const EPHEMERAL_PREFIX: &str = "ui:";
/// Backend prefix of the error bag.
pub const ERROR_PREFIX: &str = "errors:";

/// Every namespace holding per-lot keys.
const LOT_NAMESPACES: [&str; 3] = ["", EPHEMERAL_PREFIX, ERROR_PREFIX];

/// One pending ephemeral value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EphemeralSlot {
    /// Written by a lot-aware UI for one lot.
    Lot { index: usize, path: String },
    /// Written without a lot index. Legacy UIs and global fields use this.
    Flat(String),
}

impl EphemeralSlot {
    pub fn path(&self) -> &str {
        match self {
            Self::Lot { path, .. } | Self::Flat(path) => path,
        }
    }

    /// Backend key of this slot.
    pub fn to_key(&self) -> String {
        match self {
            Self::Lot { index, path } => format!("{EPHEMERAL_PREFIX}{}{path}", lot_prefix(*index)),
            Self::Flat(path) => format!("{EPHEMERAL_PREFIX}{path}"),
        }
    }

    /// Parse a backend key from the ephemeral namespace.
    pub fn parse(key: &str) -> Option<Self> {
        let rest = key.strip_prefix(EPHEMERAL_PREFIX)?;
        if rest.starts_with(LOT_KEY_PREFIX) {
            return match rest.parse::<ScopedKey>().ok()? {
                ScopedKey::Lot { index, path } => Some(Self::Lot { index, path }),
                ScopedKey::Global(_) => None,
            };
        }
        (!rest.is_empty()).then(|| Self::Flat(rest.to_string()))
    }
}

/// State store scoped to lots.
#[derive(Debug)]
pub struct ScopedStateStore<B> {
    backend: B,
    registry: LotRegistry,
    options: EngineOptions,
}

impl<B: StorePort> ScopedStateStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, EngineOptions::default())
    }

    /// Open a store over `backend`, adopting any registry already stored there.
    pub fn with_options(backend: B, options: EngineOptions) -> Self {
        let registry = LotRegistry::new(&options);
        let mut store = Self {
            backend,
            registry,
            options,
        };
        store.resync();
        store
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn registry(&self) -> &LotRegistry {
        &self.registry
    }

    /// Re-read the registry and pointer from the backend.
    ///
    /// Handles that share a backend keep a private pointer; call this to pick
    /// up lots or switches made through another handle.
    pub fn resync(&mut self) {
        let lots = match self.backend.get(LOT_REGISTRY) {
            None => Vec::new(),
            Some(stored) => LotRegistry::parse_value(&stored).unwrap_or_else(|| {
                warn!("stored lot registry is malformed, starting from the default lot");
                Vec::new()
            }),
        };
        let current = self
            .backend
            .get(CURRENT_LOT)
            .and_then(|v| v.as_u64())
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(0);
        self.registry = LotRegistry::from_parts(&self.options, lots, current);
        self.persist_registry();
    }

    /// Synthesize the default lot if none exists. Idempotent.
    pub fn ensure_default(&mut self) -> bool {
        let created = self.registry.ensure_default();
        if created {
            self.persist_registry();
        }
        created
    }

    fn persist_registry(&mut self) {
        self.backend.set(LOT_REGISTRY, self.registry.to_value());
        self.persist_pointer();
    }

    fn persist_pointer(&mut self) {
        self.backend
            .set(CURRENT_LOT, Value::from(self.registry.current_index()));
    }

    /// Resolver for the current lot.
    pub fn resolver(&self) -> KeyResolver {
        KeyResolver::new(self.registry.current_index())
    }

    pub fn current_index(&self) -> usize {
        self.registry.current_index()
    }

    pub fn current_lot(&self) -> Option<&Lot> {
        self.registry.current()
    }

    pub fn lots(&self) -> &[Lot] {
        self.registry.all()
    }

    pub fn lot_count(&self) -> usize {
        self.registry.count()
    }

    // Field access

    pub fn get_scoped(&self, key: &ScopedKey) -> Option<Value> {
        self.backend.get(&key.to_key())
    }

    pub fn set_scoped(&mut self, key: &ScopedKey, value: Value) {
        self.backend.set(&key.to_key(), value);
    }

    pub fn delete_scoped(&mut self, key: &ScopedKey) -> bool {
        self.backend.delete(&key.to_key())
    }

    /// Value of `path` in the current lot.
    pub fn get_field(&self, path: &str) -> Option<Value> {
        self.get_scoped(&self.resolver().resolve(path))
    }

    pub fn get_field_or(&self, path: &str, default: Value) -> Value {
        self.get_field(path).unwrap_or(default)
    }

    pub fn set_field(&mut self, path: &str, value: Value) {
        let key = self.resolver().resolve(path);
        self.set_scoped(&key, value);
    }

    pub fn delete_field(&mut self, path: &str) -> bool {
        let key = self.resolver().resolve(path);
        self.delete_scoped(&key)
    }

    pub fn field_exists(&self, path: &str) -> bool {
        self.backend.contains(&self.resolver().resolve(path).to_key())
    }

    /// Read `path` bypassing lot scoping.
    pub fn get_global(&self, path: &str) -> Option<Value> {
        self.get_scoped(&ScopedKey::global(path))
    }

    /// Write `path` bypassing lot scoping.
    pub fn set_global(&mut self, path: &str, value: Value) {
        self.set_scoped(&ScopedKey::global(path), value);
    }

    pub fn delete_global(&mut self, path: &str) -> bool {
        self.delete_scoped(&ScopedKey::global(path))
    }

    // Lot data

    /// Every field stored for `index`, keyed by field path.
    pub fn get_lot_data(&self, index: usize) -> BTreeMap<String, Value> {
        let prefix = lot_prefix(index);
        self.backend
            .keys()
            .into_iter()
            .filter_map(|key| {
                let path = key.strip_prefix(&prefix)?.to_string();
                let value = self.backend.get(&key)?;
                Some((path, value))
            })
            .collect()
    }

    /// Data of the current lot.
    pub fn current_lot_data(&self) -> BTreeMap<String, Value> {
        self.get_lot_data(self.current_index())
    }

    /// Global values: bare keys outside the ephemeral and error namespaces,
    /// excluding the registry itself.
    pub fn global_data(&self) -> BTreeMap<String, Value> {
        self.backend
            .keys()
            .into_iter()
            .filter(|key| is_bare_key(key) && key != LOT_REGISTRY)
            .filter_map(|key| {
                let value = self.backend.get(&key)?;
                Some((key, value))
            })
            .collect()
    }

    /// Copy every field of lot `from` into lot `to`.
    ///
    /// Fields that exist only in `to` are kept.
    pub fn copy_lot_data(&mut self, from: usize, to: usize) -> bool {
        if !self.registry.contains(from) || !self.registry.contains(to) {
            return false;
        }
        if from == to {
            return true;
        }
        let data = self.get_lot_data(from);
        debug!(from, to, fields = data.len(), "copying lot data");
        for (path, value) in data {
            self.set_scoped(&ScopedKey::lot(to, path), value);
        }
        true
    }

    /// Remove every key of lot `index`: authoritative values, staged UI
    /// values and errors. The lot descriptor stays.
    pub fn clear_lot_data(&mut self, index: usize) -> bool {
        if !self.registry.contains(index) {
            return false;
        }
        let removed: usize = LOT_NAMESPACES
            .iter()
            .map(|namespace| self.delete_with_prefix(&format!("{namespace}{}", lot_prefix(index))))
            .sum();
        debug!(index, removed, "cleared lot data");
        true
    }

    fn delete_with_prefix(&mut self, prefix: &str) -> usize {
        let keys: Vec<String> = self
            .backend
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect();
        for key in &keys {
            self.backend.delete(key);
        }
        keys.len()
    }

    // Lot lifecycle

    /// Append a lot and return its index.
    pub fn add_lot(&mut self, name: Option<&str>) -> usize {
        let index = self.registry.add(name);
        self.persist_registry();
        info!(index, name = %self.registry.display_name(index), "added lot");
        index
    }

    /// Remove a lot and shift the data of every later lot down by one.
    ///
    /// Authoritative values, ephemeral values and errors all move, so no
    /// data is orphaned under a stale index.
    pub fn remove_lot(&mut self, index: usize) -> bool {
        let before = self.registry.count();
        let name = self.registry.display_name(index);
        if !self.registry.remove(index) {
            warn!(index, lots = before, "refusing to remove lot");
            return false;
        }
        for namespace in LOT_NAMESPACES {
            self.delete_with_prefix(&format!("{namespace}{}", lot_prefix(index)));
            for source in index + 1..before {
                self.move_prefix(
                    &format!("{namespace}{}", lot_prefix(source)),
                    &format!("{namespace}{}", lot_prefix(source - 1)),
                );
            }
        }
        self.persist_registry();
        info!(index, name = %name, lots = self.registry.count(), "removed lot");
        true
    }

    fn move_prefix(&mut self, from: &str, to: &str) {
        let keys: Vec<String> = self
            .backend
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(from))
            .collect();
        for key in keys {
            if let Some(value) = self.backend.get(&key) {
                self.backend.delete(&key);
                self.backend.set(&format!("{to}{}", &key[from.len()..]), value);
            }
        }
    }

    pub fn rename_lot(&mut self, index: usize, name: &str) -> bool {
        let renamed = self.registry.rename(index, name);
        if renamed {
            self.persist_registry();
        }
        renamed
    }

    /// Move the current pointer. Lot data and the stored registry are
    /// untouched; only `current_lot` is written.
    pub fn switch_lot(&mut self, index: usize) -> bool {
        let switched = self.registry.switch_to(index);
        if switched {
            self.persist_pointer();
            debug!(index, "switched current lot");
        }
        switched
    }

    // Snapshot

    /// Every lot's data plus global values.
    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            lots: self
                .registry
                .all()
                .iter()
                .map(|lot| LotSnapshot {
                    name: lot.name.clone(),
                    index: lot.index,
                    data: self.get_lot_data(lot.index),
                })
                .collect(),
            global: self.global_data(),
        }
    }

    /// Replace all authoritative state with `snapshot`.
    ///
    /// Lots are taken in index order and re-indexed from 0. Pending
    /// ephemeral values and errors are discarded.
    pub fn load(&mut self, snapshot: &FormSnapshot) {
        for key in self.backend.keys() {
            self.backend.delete(&key);
        }

        let mut lots: Vec<&LotSnapshot> = snapshot.lots.iter().collect();
        lots.sort_by_key(|lot| lot.index);
        let recorded_current = snapshot.current_lot();
        let current = lots
            .iter()
            .position(|lot| lot.index == recorded_current)
            .unwrap_or(0);

        for (position, lot) in lots.iter().enumerate() {
            for (path, value) in &lot.data {
                self.set_scoped(&ScopedKey::lot(position, path.clone()), value.clone());
            }
        }
        for (path, value) in &snapshot.global {
            if path != LOT_REGISTRY && path != CURRENT_LOT {
                self.set_global(path, value.clone());
            }
        }

        let descriptors = lots.iter().map(|lot| lot.descriptor()).collect();
        self.registry = LotRegistry::from_parts(&self.options, descriptors, current);
        self.persist_registry();
        info!(lots = self.registry.count(), "loaded form snapshot");
    }

    // Error bag

    fn error_key(key: &ScopedKey) -> String {
        format!("{ERROR_PREFIX}{}", key.to_key())
    }

    /// Errors recorded for one scoped key.
    pub fn errors_at(&self, key: &ScopedKey) -> Vec<String> {
        self.backend
            .get(&Self::error_key(key))
            .and_then(|stored| serde_json::from_value(stored).ok())
            .unwrap_or_default()
    }

    /// Record an error for a scoped key. Duplicate messages are ignored.
    pub fn add_error_at(&mut self, key: &ScopedKey, message: impl Into<String>) {
        let message = message.into();
        let mut errors = self.errors_at(key);
        if errors.contains(&message) {
            return;
        }
        errors.push(message);
        self.backend.set(&Self::error_key(key), Value::from(errors));
    }

    pub fn clear_errors_at(&mut self, key: &ScopedKey) -> bool {
        self.backend.delete(&Self::error_key(key))
    }

    /// Record an error for `path` in the current lot.
    pub fn add_error(&mut self, path: &str, message: impl Into<String>) {
        let key = self.resolver().resolve(path);
        self.add_error_at(&key, message);
    }

    /// Errors for `path` in the current lot.
    pub fn get_errors(&self, path: &str) -> Vec<String> {
        self.errors_at(&self.resolver().resolve(path))
    }

    /// Every recorded error, across all lots.
    pub fn all_errors(&self) -> BTreeMap<ScopedKey, Vec<String>> {
        self.backend
            .keys()
            .into_iter()
            .filter_map(|key| {
                let scoped = key.strip_prefix(ERROR_PREFIX)?.parse::<ScopedKey>().ok()?;
                let errors = self.errors_at(&scoped);
                (!errors.is_empty()).then_some((scoped, errors))
            })
            .collect()
    }

    /// Clear errors for `path` in the current lot, or the whole bag when
    /// `path` is `None`.
    pub fn clear_errors(&mut self, path: Option<&str>) {
        match path {
            Some(path) => {
                let key = self.resolver().resolve(path);
                self.clear_errors_at(&key);
            }
            None => {
                self.delete_with_prefix(ERROR_PREFIX);
            }
        }
    }

    /// Whether `path` in the current lot has errors, or whether any error
    /// exists when `path` is `None`.
    pub fn has_errors(&self, path: Option<&str>) -> bool {
        match path {
            Some(path) => !self.get_errors(path).is_empty(),
            None => !self.all_errors().is_empty(),
        }
    }

    // Ephemeral values

    /// Slot a UI write for `path` lands in for the current lot.
    pub fn ephemeral_slot(&self, path: &str) -> EphemeralSlot {
        match self.resolver().resolve(path) {
            ScopedKey::Lot { index, path } => EphemeralSlot::Lot { index, path },
            ScopedKey::Global(path) => EphemeralSlot::Flat(path),
        }
    }

    /// Stage a UI value for `path` in the current lot.
    pub fn set_ephemeral(&mut self, path: &str, value: Value) {
        let slot = self.ephemeral_slot(path);
        self.set_ephemeral_slot(&slot, value);
    }

    /// Stage a UI value without a lot index, as pre-lot UIs did.
    ///
    /// Returns false for paths starting with `lot:`, which would read back
    /// as a lot slot.
    pub fn set_legacy_ephemeral(&mut self, path: &str, value: Value) -> bool {
        self.set_ephemeral_slot(&EphemeralSlot::Flat(path.to_string()), value)
    }

    /// Stage `value` in `slot`. Flat slots whose path is empty or starts with
    /// `lot:` are refused.
    pub fn set_ephemeral_slot(&mut self, slot: &EphemeralSlot, value: Value) -> bool {
        if let EphemeralSlot::Flat(path) = slot
            && (path.is_empty() || path.starts_with(LOT_KEY_PREFIX))
        {
            warn!(path = %path, "refusing flat ephemeral slot that would not read back");
            return false;
        }
        self.backend.set(&slot.to_key(), value);
        true
    }

    pub fn ephemeral(&self, slot: &EphemeralSlot) -> Option<Value> {
        self.backend.get(&slot.to_key())
    }

    pub fn clear_ephemeral(&mut self, slot: &EphemeralSlot) -> bool {
        self.backend.delete(&slot.to_key())
    }

    /// Every pending ephemeral slot, in key order.
    pub fn ephemeral_slots(&self) -> Vec<EphemeralSlot> {
        self.backend
            .keys()
            .iter()
            .filter_map(|key| EphemeralSlot::parse(key))
            .collect()
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.starts_with(LOT_KEY_PREFIX)
        && !key.starts_with(EPHEMERAL_PREFIX)
        && !key.starts_with(ERROR_PREFIX)
}
