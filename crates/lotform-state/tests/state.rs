//! Integration tests for the lot-scoped store.

use std::rc::Rc;

use lotform_model::{EngineOptions, FormSnapshot, LotSnapshot, ScopedKey};
use lotform_state::{EphemeralReconciler, MemoryStore, ScopedStateStore, StorePort};
use proptest::prelude::*;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("lotform_state=debug")
        .try_init();
}

#[test]
fn handles_sharing_a_backend_resync_explicitly() {
    init_tracing();
    let shared = MemoryStore::shared();
    let mut first = ScopedStateStore::new(Rc::clone(&shared));
    let mut second = ScopedStateStore::new(Rc::clone(&shared));

    let lot = first.add_lot(Some("Roads"));
    first.switch_lot(lot);
    first.set_field("title", json!("roads"));

    assert_eq!(second.lot_count(), 1);
    assert_eq!(second.current_index(), 0);
    assert_eq!(second.get_field("title"), None);

    second.resync();
    assert_eq!(second.lot_count(), 2);
    assert_eq!(second.current_index(), 1);
    assert_eq!(second.get_field("title"), Some(json!("roads")));
}

#[test]
fn switching_on_a_stale_handle_keeps_other_handles_lots() {
    init_tracing();
    let shared = MemoryStore::shared();
    let mut first = ScopedStateStore::new(Rc::clone(&shared));
    let mut stale = ScopedStateStore::new(Rc::clone(&shared));

    let lot = first.add_lot(Some("Roads"));
    first.switch_lot(lot);
    first.set_field("title", json!("roads"));

    assert!(stale.switch_lot(0));
    stale.set_field("title", json!("general"));

    first.resync();
    let names: Vec<&str> = first.lots().iter().map(|lot| lot.name.as_str()).collect();
    assert_eq!(names, vec!["General", "Roads"]);
    assert_eq!(first.current_index(), 0);
    assert_eq!(
        first.get_scoped(&ScopedKey::lot(1, "title")),
        Some(json!("roads"))
    );
}

#[test]
fn cleared_lot_does_not_come_back_on_reconcile() {
    let mut store = ScopedStateStore::new(MemoryStore::new());
    store.add_lot(Some("Roads"));
    store.switch_lot(1);
    store.set_field("title", json!("stored"));
    store.set_ephemeral("title", json!("typed"));
    store.add_error("title", "Title is required");
    store.switch_lot(0);
    store.set_field("title", json!("general"));
    store.set_ephemeral("title", json!("general typed"));

    assert!(store.clear_lot_data(1));
    assert!(store.get_lot_data(1).is_empty());
    assert!(store.errors_at(&ScopedKey::lot(1, "title")).is_empty());

    assert_eq!(EphemeralReconciler::new(&mut store).ensure_ready(), 1);
    assert!(store.get_lot_data(1).is_empty());
    assert_eq!(store.get_field("title"), Some(json!("general typed")));
}

#[test]
fn legacy_slot_paths_must_read_back() {
    let mut store = ScopedStateStore::new(MemoryStore::new());
    assert!(!store.set_legacy_ephemeral("lot:abc", json!("x")));
    assert!(!store.set_legacy_ephemeral("", json!("x")));
    assert!(store.ephemeral_slots().is_empty());

    assert!(store.set_legacy_ephemeral("lotDetails.title", json!("x")));
    assert_eq!(store.ephemeral_slots().len(), 1);
}

#[test]
fn invalid_stored_pointer_resets_to_zero() {
    init_tracing();
    let shared = MemoryStore::shared();
    {
        let mut backend = Rc::clone(&shared);
        backend.set("lots", json!([{"name": "General", "index": 0}]));
        backend.set("current_lot", json!(4));
    }
    let store = ScopedStateStore::new(Rc::clone(&shared));
    assert_eq!(store.current_index(), 0);
    assert_eq!(shared.get("current_lot"), Some(json!(0)));
}

#[test]
fn malformed_registry_falls_back_to_default_lot() {
    init_tracing();
    let backend: MemoryStore = [("lots".to_string(), json!({"not": "a list"}))]
        .into_iter()
        .collect();
    let store = ScopedStateStore::with_options(
        backend,
        EngineOptions::default().with_default_lot_name("Main"),
    );
    assert_eq!(store.lots().len(), 1);
    assert_eq!(store.lots()[0].name, "Main");
}

#[test]
fn load_compacts_sparse_lot_indices() {
    let snapshot = FormSnapshot {
        lots: vec![
            LotSnapshot::new("B", 7).with_value("title", json!("b")),
            LotSnapshot::new("General", 0).with_value("title", json!("g")),
        ],
        global: [("current_lot".to_string(), json!(7))].into_iter().collect(),
    };
    let mut store = ScopedStateStore::new(MemoryStore::new());
    store.set_ephemeral("stale", json!(true));
    store.load(&snapshot);

    let names: Vec<&str> = store.lots().iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["General", "B"]);
    assert_eq!(store.current_index(), 1);
    assert_eq!(store.get_field("title"), Some(json!("b")));
    assert!(store.ephemeral_slots().is_empty());
}

#[test]
fn ensure_ready_on_fresh_store_is_a_no_op() {
    let mut store = ScopedStateStore::new(MemoryStore::new());
    assert_eq!(EphemeralReconciler::new(&mut store).ensure_ready(), 0);
    assert_eq!(store.lot_count(), 1);
}

fn populated(lots: usize) -> ScopedStateStore<MemoryStore> {
    let mut store = ScopedStateStore::new(MemoryStore::new());
    for _ in 1..lots {
        store.add_lot(None);
    }
    for index in 0..lots {
        store.set_scoped(&ScopedKey::lot(index, "tag"), json!(index));
        store.add_error_at(&ScopedKey::lot(index, "tag"), format!("error {index}"));
    }
    store
}

proptest! {
    #[test]
    fn writes_never_leak_between_lots(
        lots in 2usize..6,
        writes in proptest::collection::vec((0usize..6, "[a-c]{1,2}", any::<i32>()), 1..20),
    ) {
        let mut store = populated(lots);
        let mut expected = store.snapshot();
        for (lot, path, value) in writes {
            let lot = lot % lots;
            store.switch_lot(lot);
            store.set_field(&path, json!(value));
            expected.lots[lot].data.insert(path, json!(value));
        }
        let actual = store.snapshot();
        for (got, want) in actual.lots.iter().zip(expected.lots.iter()) {
            prop_assert_eq!(&got.data, &want.data);
        }
    }

    #[test]
    fn removal_shifts_later_lots_down(lots in 2usize..8, removed in 0usize..8, current in 0usize..8) {
        let removed = removed % lots;
        let current = current % lots;
        let mut store = populated(lots);
        store.switch_lot(current);

        prop_assert!(store.remove_lot(removed));
        prop_assert_eq!(store.lot_count(), lots - 1);

        let survivors: Vec<usize> = (0..lots).filter(|i| *i != removed).collect();
        for (position, original) in survivors.iter().enumerate() {
            let key = ScopedKey::lot(position, "tag");
            prop_assert_eq!(store.get_scoped(&key), Some(json!(original)));
            prop_assert_eq!(store.errors_at(&key), vec![format!("error {original}")]);
        }
        prop_assert_eq!(store.get_scoped(&ScopedKey::lot(lots - 1, "tag")), None);

        let expected_current = if current > removed {
            current - 1
        } else if current == removed {
            removed.saturating_sub(1)
        } else {
            current
        };
        prop_assert_eq!(store.current_index(), expected_current);
    }
}
