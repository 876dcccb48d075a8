//! Reconciliation of ephemeral UI values into authoritative state.
//!
//! UI code may stage values in the ephemeral namespace before they reach the
//! store. Reconciliation copies the winning staged value into the
//! authoritative key and then consumes the slots it read, so a later
//! programmatic write is never overwritten by a stale UI value.
//!
//! Every consumed slot is also written into its own scope: a pending value
//! staged for lot 0 lands in lot 0 even when it was read as a fallback for
//! another lot.

use lotform_model::{ScopedKey, Value};
use tracing::{debug, trace};

use crate::backend::StorePort;
use crate::store::{EphemeralSlot, ScopedStateStore};

/// Where an effective value can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EphemeralSource {
    /// Staged for the current lot.
    CurrentLot,
    /// Staged for lot 0. Read when the current lot has nothing staged.
    DefaultLot,
    /// Staged without a lot index.
    LegacyFlat,
    /// The authoritative store value.
    Authoritative,
}

/// Lookup order for effective values, highest precedence first.
pub const EPHEMERAL_PRECEDENCE: [EphemeralSource; 4] = [
    EphemeralSource::CurrentLot,
    EphemeralSource::DefaultLot,
    EphemeralSource::LegacyFlat,
    EphemeralSource::Authoritative,
];

/// Ephemeral slots that can supply `path` for the current lot, in
/// precedence order.
fn precedence_chain<B: StorePort>(store: &ScopedStateStore<B>, path: &str) -> Vec<EphemeralSlot> {
    let target = store.resolver().resolve(path);
    EPHEMERAL_PRECEDENCE
        .iter()
        .filter_map(|source| match (source, &target) {
            (EphemeralSource::CurrentLot, ScopedKey::Lot { index, path }) => {
                Some(EphemeralSlot::Lot {
                    index: *index,
                    path: path.clone(),
                })
            }
            (EphemeralSource::DefaultLot, ScopedKey::Lot { index, path }) if *index != 0 => {
                Some(EphemeralSlot::Lot {
                    index: 0,
                    path: path.clone(),
                })
            }
            (EphemeralSource::LegacyFlat, _) => Some(EphemeralSlot::Flat(path.to_string())),
            _ => None,
        })
        .collect()
}

/// The value a reader of `path` sees: the first staged value in precedence
/// order, else the authoritative value.
pub fn effective_value<B: StorePort>(store: &ScopedStateStore<B>, path: &str) -> Option<Value> {
    precedence_chain(store, path)
        .iter()
        .find_map(|slot| store.ephemeral(slot))
        .or_else(|| store.get_field(path))
}

/// Folds staged UI values into the store.
pub struct EphemeralReconciler<'a, B> {
    store: &'a mut ScopedStateStore<B>,
}

impl<'a, B: StorePort> EphemeralReconciler<'a, B> {
    pub fn new(store: &'a mut ScopedStateStore<B>) -> Self {
        Self { store }
    }

    /// The value a reader of `path` sees right now.
    pub fn effective_value(&self, path: &str) -> Option<Value> {
        effective_value(&*self.store, path)
    }

    /// Reconcile one path for the current lot.
    ///
    /// Returns true if the current lot's authoritative value changed.
    pub fn sync_one(&mut self, path: &str) -> bool {
        self.settle(path).0
    }

    /// Reconcile every staged value and return the number of authoritative
    /// values that changed. A second call with nothing staged returns 0.
    pub fn sync_all(&mut self) -> usize {
        let mut changed = 0;

        let mut current_paths: Vec<String> = Vec::new();
        let current = self.store.current_index();
        for slot in self.store.ephemeral_slots() {
            let reaches_current = match &slot {
                EphemeralSlot::Lot { index, .. } => *index == current || *index == 0,
                EphemeralSlot::Flat(_) => true,
            };
            if reaches_current && !current_paths.iter().any(|p| p == slot.path()) {
                current_paths.push(slot.path().to_string());
            }
        }
        for path in &current_paths {
            changed += self.settle(path).1;
        }

        for slot in self.store.ephemeral_slots() {
            if let EphemeralSlot::Lot { index, path } = &slot
                && let Some(value) = self.store.ephemeral(&slot)
            {
                if self.write(&ScopedKey::lot(*index, path.clone()), value) {
                    changed += 1;
                }
                self.store.clear_ephemeral(&slot);
            }
        }

        if changed > 0 {
            debug!(changed, "reconciled ephemeral values");
        }
        changed
    }

    /// Make sure the store is ready for validation or export.
    pub fn ensure_ready(&mut self) -> usize {
        self.store.ensure_default();
        self.sync_all()
    }

    /// Apply the winning value for `path` to the current lot, then consume
    /// the chain. Returns whether the current target changed and the total
    /// number of authoritative writes that changed a value.
    fn settle(&mut self, path: &str) -> (bool, usize) {
        let target = self.store.resolver().resolve(path);
        let staged: Vec<(EphemeralSlot, Value)> = precedence_chain(&*self.store, path)
            .into_iter()
            .filter_map(|slot| {
                let value = self.store.ephemeral(&slot)?;
                Some((slot, value))
            })
            .collect();
        let Some((_, winner)) = staged.first() else {
            return (false, 0);
        };

        let target_changed = self.write(&target, winner.clone());
        let mut total = usize::from(target_changed);

        for (slot, value) in staged {
            if let EphemeralSlot::Lot { index, path } = &slot {
                let own = ScopedKey::lot(*index, path.clone());
                if own != target && self.write(&own, value) {
                    total += 1;
                }
            }
            self.store.clear_ephemeral(&slot);
        }
        trace!(path, target = %target, target_changed, "settled ephemeral chain");
        (target_changed, total)
    }

    fn write(&mut self, key: &ScopedKey, value: Value) -> bool {
        if self.store.get_scoped(key).as_ref() == Some(&value) {
            return false;
        }
        self.store.set_scoped(key, value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use serde_json::json;

    fn flat(path: &str) -> EphemeralSlot {
        EphemeralSlot::Flat(path.to_string())
    }

    fn lot(index: usize, path: &str) -> EphemeralSlot {
        EphemeralSlot::Lot {
            index,
            path: path.to_string(),
        }
    }

    #[test]
    fn precedence_prefers_current_lot_slot() {
        let mut store = ScopedStateStore::new(MemoryStore::new());
        store.add_lot(None);
        store.switch_lot(1);
        store.set_field("title", json!("stored"));
        store.set_ephemeral_slot(&flat("title"), json!("legacy"));
        store.set_ephemeral_slot(&lot(0, "title"), json!("default"));

        let reconciler = EphemeralReconciler::new(&mut store);
        assert_eq!(reconciler.effective_value("title"), Some(json!("default")));

        store.set_ephemeral_slot(&lot(1, "title"), json!("current"));
        let reconciler = EphemeralReconciler::new(&mut store);
        assert_eq!(reconciler.effective_value("title"), Some(json!("current")));
    }

    #[test]
    fn sync_one_consumes_slots_so_later_writes_stick() {
        let mut store = ScopedStateStore::new(MemoryStore::new());
        store.set_ephemeral("title", json!("typed"));
        assert!(EphemeralReconciler::new(&mut store).sync_one("title"));
        assert_eq!(store.get_field("title"), Some(json!("typed")));

        store.set_field("title", json!("programmatic"));
        assert!(!EphemeralReconciler::new(&mut store).sync_one("title"));
        assert_eq!(store.get_field("title"), Some(json!("programmatic")));
    }

    #[test]
    fn fallback_slot_lands_in_lot_zero_too() {
        let mut store = ScopedStateStore::new(MemoryStore::new());
        store.add_lot(None);
        store.switch_lot(1);
        store.set_ephemeral_slot(&lot(0, "title"), json!("shared"));

        assert!(EphemeralReconciler::new(&mut store).sync_one("title"));
        assert_eq!(store.get_field("title"), Some(json!("shared")));
        assert_eq!(
            store.get_scoped(&ScopedKey::lot(0, "title")),
            Some(json!("shared"))
        );
        assert!(store.ephemeral_slots().is_empty());
    }

    #[test]
    fn sync_all_is_idempotent() {
        let mut store = ScopedStateStore::new(MemoryStore::new());
        store.add_lot(None);
        store.add_lot(None);
        store.set_ephemeral_slot(&lot(0, "a"), json!(1));
        store.set_ephemeral_slot(&lot(2, "b"), json!(2));
        store.set_ephemeral_slot(&flat("current_step"), json!("review"));

        let mut reconciler = EphemeralReconciler::new(&mut store);
        assert_eq!(reconciler.sync_all(), 3);
        assert_eq!(reconciler.sync_all(), 0);

        assert_eq!(store.get_scoped(&ScopedKey::lot(0, "a")), Some(json!(1)));
        assert_eq!(store.get_scoped(&ScopedKey::lot(2, "b")), Some(json!(2)));
        assert_eq!(store.get_global("current_step"), Some(json!("review")));
    }

    #[test]
    fn unchanged_values_are_not_counted() {
        let mut store = ScopedStateStore::new(MemoryStore::new());
        store.set_field("a", json!(1));
        store.set_ephemeral("a", json!(1));
        assert_eq!(EphemeralReconciler::new(&mut store).sync_all(), 0);
        assert!(store.ephemeral_slots().is_empty());
    }
}
