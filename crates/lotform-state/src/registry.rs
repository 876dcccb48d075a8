//! The ordered lot registry and current-lot pointer.
//!
//! The registry only tracks descriptors. Moving the data that belongs to a
//! lot is the state store's job; every mutation here reports whether it was
//! accepted so the store can decide whether to migrate.

use lotform_model::{EngineOptions, Lot, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotRegistry {
    lots: Vec<Lot>,
    current: usize,
    options: EngineOptions,
}

impl LotRegistry {
    /// An empty registry. Call [`LotRegistry::ensure_default`] before use.
    pub fn new(options: &EngineOptions) -> Self {
        Self {
            lots: Vec::new(),
            current: 0,
            options: options.clone(),
        }
    }

    /// Rebuild a registry from stored descriptors and a stored pointer.
    ///
    /// Descriptors are re-indexed by position. An out-of-range pointer is
    /// reset to 0.
    pub fn from_parts(options: &EngineOptions, lots: Vec<Lot>, current: usize) -> Self {
        let mut registry = Self::new(options);
        registry.lots = lots;
        registry.reindex();
        registry.ensure_default();
        if current >= registry.lots.len() {
            warn!(
                current,
                lots = registry.lots.len(),
                "current lot pointer out of range, resetting to 0"
            );
            registry.current = 0;
        } else {
            registry.current = current;
        }
        registry
    }

    /// Synthesize the default lot if the registry is empty.
    ///
    /// Returns true if a lot was created. Idempotent.
    pub fn ensure_default(&mut self) -> bool {
        if !self.lots.is_empty() {
            return false;
        }
        self.lots
            .push(Lot::new(self.options.default_lot_name.clone(), 0));
        self.current = 0;
        debug!(name = %self.options.default_lot_name, "created default lot");
        true
    }

    /// Append a lot and return its index. Unnamed lots get an automatic name.
    pub fn add(&mut self, name: Option<&str>) -> usize {
        self.ensure_default();
        let index = self.lots.len();
        let name = name.map_or_else(
            || self.options.auto_lot_name(index + 1),
            str::to_string,
        );
        self.lots.push(Lot::new(name, index));
        index
    }

    /// Remove a lot, compacting indices and adjusting the pointer.
    ///
    /// The last remaining lot and out-of-range indices are rejected.
    pub fn remove(&mut self, index: usize) -> bool {
        if self.lots.len() <= 1 || index >= self.lots.len() {
            return false;
        }
        self.lots.remove(index);
        self.reindex();
        if self.current > index {
            self.current -= 1;
        } else if self.current == index {
            self.current = index.saturating_sub(1);
        }
        true
    }

    pub fn rename(&mut self, index: usize, name: &str) -> bool {
        match self.lots.get_mut(index) {
            Some(lot) => {
                lot.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn switch_to(&mut self, index: usize) -> bool {
        if index >= self.lots.len() {
            return false;
        }
        self.current = index;
        true
    }

    pub fn count(&self) -> usize {
        self.lots.len()
    }

    pub fn all(&self) -> &[Lot] {
        &self.lots
    }

    pub fn get(&self, index: usize) -> Option<&Lot> {
        self.lots.get(index)
    }

    pub fn current(&self) -> Option<&Lot> {
        self.lots.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.lots.len()
    }

    /// Name of the lot at `index`, or the index itself for unknown lots.
    pub fn display_name(&self, index: usize) -> String {
        self.get(index)
            .map_or_else(|| index.to_string(), |lot| lot.name.clone())
    }

    /// Registry as stored under the global `lots` key.
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.lots
                .iter()
                .map(|lot| serde_json::json!({"name": lot.name, "index": lot.index}))
                .collect(),
        )
    }

    /// Parse descriptors stored under the global `lots` key.
    pub fn parse_value(value: &Value) -> Option<Vec<Lot>> {
        serde_json::from_value(value.clone()).ok()
    }

    fn reindex(&mut self) {
        for (position, lot) in self.lots.iter_mut().enumerate() {
            lot.index = position;
        }
    }
}
