//! Step validation across lots.

use lotform_model::{FormSnapshot, LotSnapshot, ScopedKey};
use lotform_schema::FormSchema;
use lotform_state::{MemoryStore, ScopedStateStore};
use lotform_validate::{
    DynamicRequirementEngine, ValidationMode, ValidationOrchestrator, format_label, is_required,
};
use proptest::prelude::*;
use serde_json::json;

const SCHEMA: &str = r#"{
  "properties": {
    "clientInfo": {
      "type": "object",
      "properties": {
        "isSingleClient": {"type": "boolean", "title": "Single client"},
        "singleClientName": {
          "type": "string",
          "title": "Client name",
          "render_if": {"field": "clientInfo.isSingleClient", "value": true}
        },
        "clients": {
          "type": "array",
          "title": "Clients",
          "render_if": {"field": "clientInfo.isSingleClient", "value": false}
        }
      },
      "required": ["isSingleClient", "singleClientName", "clients"]
    },
    "lotDetails": {
      "type": "object",
      "properties": {
        "title": {"type": "string", "title": "Lot title"},
        "quantity": {"type": "integer", "title": "Quantity"}
      },
      "required": ["title"]
    }
  }
}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("lotform_validate=debug")
        .try_init();
}

fn fixture() -> (FormSchema, DynamicRequirementEngine) {
    let schema = FormSchema::from_json_str(SCHEMA).expect("schema loads");
    let engine = DynamicRequirementEngine::new(&schema);
    (schema, engine)
}

fn three_lot_store() -> ScopedStateStore<MemoryStore> {
    let mut store = ScopedStateStore::new(MemoryStore::new());
    store.add_lot(Some("A"));
    store.add_lot(Some("B"));
    for index in 0..3 {
        store.set_scoped(
            &ScopedKey::lot(index, "clientInfo.isSingleClient"),
            json!(true),
        );
        store.set_scoped(
            &ScopedKey::lot(index, "clientInfo.singleClientName"),
            json!(format!("Client {index}")),
        );
    }
    store
}

#[test]
fn pre_entity_step_reports_only_the_failing_lot() {
    init_tracing();
    let (schema, engine) = fixture();
    let mut store = three_lot_store();
    store.delete_scoped(&ScopedKey::lot(1, "clientInfo.singleClientName"));
    store.switch_lot(2);

    let result = ValidationOrchestrator::new(&mut store, &schema, &engine)
        .validate_step(&["clientInfo"], Some(1));

    assert!(!result.ok);
    assert_eq!(result.mode, ValidationMode::AllLots);
    assert_eq!(result.errors, vec!["A: Client name is required".to_string()]);
    assert!(result.errors.iter().all(|e| !e.starts_with("General") && !e.starts_with("B")));
    assert_eq!(store.current_index(), 2);
    assert_eq!(
        store.errors_at(&ScopedKey::lot(1, "clientInfo.singleClientName")),
        vec!["Client name is required"]
    );
    assert_eq!(store.get_global("validation_mode"), Some(json!("all_lots")));
}

#[test]
fn entity_step_validates_current_lot_only() {
    let (schema, engine) = fixture();
    let mut store = three_lot_store();
    store.switch_lot(1);
    store.set_field("lotDetails.quantity", json!(2.5));

    let (ok, errors) = ValidationOrchestrator::new(&mut store, &schema, &engine)
        .validate_step(&["lotDetails"], None)
        .into_parts();

    assert!(!ok);
    assert_eq!(
        errors,
        vec![
            "Lot title is required".to_string(),
            "Quantity must be an integer".to_string()
        ]
    );
    assert_eq!(store.get_global("validation_mode"), Some(json!("current_lot")));
}

#[test]
fn single_lot_pre_entity_step_uses_current_lot_mode() {
    let (schema, engine) = fixture();
    let mut store = ScopedStateStore::new(MemoryStore::new());
    store.set_field("clientInfo.isSingleClient", json!(false));

    let result = ValidationOrchestrator::new(&mut store, &schema, &engine)
        .validate_step(&["clientInfo"], None);

    assert_eq!(result.mode, ValidationMode::CurrentLot);
    assert_eq!(result.errors, vec!["Clients is required".to_string()]);

    store.set_field("clientInfo.clients", json!(["Acme"]));
    let result = ValidationOrchestrator::new(&mut store, &schema, &engine)
        .validate_step(&["clientInfo"], None);
    assert!(result.ok);
    assert!(!store.has_errors(None));
}

#[test]
fn staged_ui_values_are_reconciled_before_validation() {
    let (schema, engine) = fixture();
    let mut store = ScopedStateStore::new(MemoryStore::new());
    store.set_ephemeral("lotDetails.title", json!("Road works"));

    let result = ValidationOrchestrator::new(&mut store, &schema, &engine)
        .validate_step(&["lotDetails.title"], None);

    assert!(result.ok);
    assert_eq!(store.get_field("lotDetails.title"), Some(json!("Road works")));
}

#[test]
fn step_result_serializes() {
    let (schema, engine) = fixture();
    let mut store = ScopedStateStore::new(MemoryStore::new());
    let result = ValidationOrchestrator::new(&mut store, &schema, &engine)
        .validate_step(&["lotDetails.title"], Some(2));
    insta::assert_snapshot!(serde_json::to_string_pretty(&result).unwrap(), @r#"
    {
      "ok": false,
      "errors": [
        "Lot title is required"
      ],
      "mode": "current_lot"
    }
    "#);
}

proptest! {
    #[test]
    fn single_client_flag_toggles_requirements(flag in any::<bool>()) {
        let (schema, engine) = fixture();
        let snapshot = FormSnapshot {
            lots: vec![LotSnapshot::new("General", 0).with_value("clientInfo.isSingleClient", json!(flag))],
            ..FormSnapshot::default()
        };
        let required = engine.recompute(&snapshot);
        prop_assert_eq!(is_required(&required, "clientInfo.singleClientName"), flag);
        prop_assert_eq!(is_required(&required, "clientInfo.clients"), !flag);

        let marked = format_label(&schema, &required, "clientInfo.singleClientName", " *");
        prop_assert_eq!(marked.ends_with(" *"), flag);
    }
}
