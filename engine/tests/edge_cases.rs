//! Edge case tests for shopfront-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use serde_json::{json, Value};
use shopfront_engine::{
    CacheBlob, CollectionSchema, CollectionState, Entity, FieldDef, FieldType, Fields, Snapshot,
};

fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

fn create_test_state() -> CollectionState {
    CollectionState::new("items").with_schema(CollectionSchema::new(
        "items",
        vec![
            FieldDef::required("name", FieldType::String),
            FieldDef::optional("count", FieldType::Int),
            FieldDef::optional("data", FieldType::Json),
        ],
    ))
}

// ============================================================================
// String Edge Cases
// ============================================================================

#[test]
fn empty_string_fields() {
    let mut state = create_test_state();

    let result = state.create("item1", fields(json!({"name": ""})), 1000);
    assert!(result.is_ok());

    let entity = state.get("item1").unwrap();
    assert_eq!(entity.fields["name"], "");
}

#[test]
fn unicode_strings() {
    let mut state = create_test_state();

    let names = vec![
        "日本語テスト",
        "Привет мир",
        "مرحبا بالعالم",
        "🎉🚀💯",
        "Hello\nWorld\tTab",
        "Null\0Test",
    ];

    for (i, name) in names.iter().enumerate() {
        let id = format!("item_{}", i);
        let result = state.create(id.as_str(), fields(json!({"name": name})), 1000);
        assert!(result.is_ok(), "Failed for: {}", name);
        assert_eq!(state.get(&id).unwrap().fields["name"], *name);
    }

    // Confirmation works for non-ASCII values too.
    let snapshot: Vec<Entity> = state.visible().to_vec();
    let report = state.apply_snapshot(Snapshot::new(snapshot));
    assert_eq!(report.confirmed.len(), names.len());
}

#[test]
fn very_long_strings() {
    let mut state = create_test_state();
    let long_string = "x".repeat(1024 * 1024);

    state
        .create("item1", fields(json!({"name": long_string.clone()})), 1000)
        .unwrap();

    let entity = state.get("item1").unwrap();
    assert_eq!(entity.fields["name"].as_str().unwrap().len(), 1024 * 1024);
}

// ============================================================================
// Numeric Edge Cases
// ============================================================================

#[test]
fn integer_boundaries() {
    let mut state = create_test_state();
    let values = vec![i64::MIN, i64::MAX, 0i64, -1i64, 1i64];

    for (i, value) in values.iter().enumerate() {
        let id = format!("item_{}", i);
        state
            .create(id.as_str(), fields(json!({"name": "n", "count": value})), 1000)
            .unwrap();
        assert_eq!(state.get(&id).unwrap().fields["count"], *value);
    }
}

#[test]
fn remote_float_normalization_confirms_integer_write() {
    let mut state = create_test_state();
    state
        .create("item1", fields(json!({"name": "n", "count": 3, "data": {"w": 2}})), 1)
        .unwrap();

    let report = state.apply_snapshot(Snapshot::new(vec![Entity::new(
        "item1",
        fields(json!({"name": "n", "count": 3.0, "data": {"w": 2.0}})),
        2,
    )]));
    assert_eq!(report.confirmed, vec!["item1".to_string()]);
}

// ============================================================================
// JSON Edge Cases
// ============================================================================

#[test]
fn deeply_nested_json() {
    let mut state = create_test_state();

    let mut nested = json!({"value": "deep"});
    for _ in 0..64 {
        nested = json!({"child": nested});
    }

    state
        .create("item1", fields(json!({"name": "n", "data": nested.clone()})), 1)
        .unwrap();
    assert_eq!(state.get("item1").unwrap().fields["data"], nested);
}

#[test]
fn partial_update_replaces_nested_object_whole() {
    let mut state = create_test_state();
    state
        .create("item1", fields(json!({"name": "n", "data": {"a": 1, "b": 2}})), 1)
        .unwrap();

    state
        .update("item1", &fields(json!({"data": {"a": 5}})), 2)
        .unwrap();
    assert_eq!(state.get("item1").unwrap().fields["data"], json!({"a": 5}));
}

// ============================================================================
// Timing Edge Cases
// ============================================================================

#[test]
fn rapid_updates_same_entity() {
    let mut state = create_test_state();
    state.create("item1", fields(json!({"name": "n", "count": 0})), 0).unwrap();

    for i in 1..=100 {
        state
            .update("item1", &fields(json!({"count": i})), i as u64)
            .unwrap();
    }

    assert_eq!(state.get("item1").unwrap().fields["count"], 100);
    assert_eq!(state.ledger().len(), 1);

    // An intermediate value from the remote does not confirm.
    state.apply_snapshot(Snapshot::new(vec![Entity::new(
        "item1",
        fields(json!({"name": "n", "count": 42})),
        50,
    )]));
    assert_eq!(state.get("item1").unwrap().fields["count"], 100);
    assert_eq!(state.ledger().len(), 1);
}

#[test]
fn same_snapshot_delivered_repeatedly() {
    let mut state = create_test_state();
    state.create("local", fields(json!({"name": "l"})), 10).unwrap();

    let snapshot = Snapshot::new(vec![
        Entity::new("a", fields(json!({"name": "a"})), 1),
        Entity::new("b", fields(json!({"name": "b"})), 1),
    ]);

    let mut seen = Vec::new();
    for _ in 0..5 {
        state.apply_snapshot(snapshot.clone());
        seen.push(state.visible().to_vec());
    }

    assert!(seen.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(seen[0][0].id, "local");
}

// ============================================================================
// Deletion Edge Cases
// ============================================================================

#[test]
fn delete_pending_creation() {
    let mut state = create_test_state();
    state.create("item1", fields(json!({"name": "n"})), 1).unwrap();
    state.delete("item1", 2).unwrap();

    assert!(state.get("item1").is_none());
    assert!(state.ledger().is_deleting("item1"));

    // The create landed remotely before the delete did.
    state.apply_snapshot(Snapshot::new(vec![Entity::new(
        "item1",
        fields(json!({"name": "n"})),
        3,
    )]));
    assert!(state.get("item1").is_none());

    state.apply_snapshot(Snapshot::empty());
    assert!(state.ledger().is_empty());
}

#[test]
fn remote_deletion_of_confirmed_entity() {
    let mut state = create_test_state();
    state.apply_snapshot(Snapshot::new(vec![Entity::new(
        "item1",
        fields(json!({"name": "n"})),
        1,
    )]));
    state.apply_snapshot(Snapshot::empty());
    assert!(state.visible().is_empty());
}

// ============================================================================
// Cache Edge Cases
// ============================================================================

#[test]
fn cache_blob_of_empty_collection() {
    let blob = CacheBlob::new("items", Vec::new(), 0);
    let restored = CacheBlob::from_json(&blob.to_json().unwrap()).unwrap();
    assert!(restored.entities.is_empty());
}

#[test]
fn cache_blob_with_duplicate_ids_is_deduplicated() {
    let blob = CacheBlob::new(
        "items",
        vec![
            Entity::new("a", fields(json!({"name": "first"})), 1),
            Entity::new("a", fields(json!({"name": "second"})), 2),
        ],
        0,
    );

    let mut state = create_test_state();
    state.load_cache(blob.into_snapshot().into_entities());
    assert_eq!(state.visible().len(), 1);
    assert_eq!(state.get("a").unwrap().fields["name"], "first");
}

// ============================================================================
// ID Edge Cases
// ============================================================================

#[test]
fn ids_with_special_characters() {
    let mut state = create_test_state();
    let long = "x".repeat(512);
    let ids = vec!["with space", "slash/inside", "ünïcödé", "a:b:c", long.as_str()];

    for id in ids.iter().copied() {
        state.create(id, fields(json!({"name": "n"})), 1).unwrap();
        assert!(state.get(id).is_some());
    }
    assert_eq!(state.visible().len(), ids.len());
}

#[test]
fn many_pending_creations() {
    let mut state = create_test_state();
    for i in 0..1000u64 {
        state
            .create(format!("item_{}", i), fields(json!({"name": "n"})), i)
            .unwrap();
    }

    assert_eq!(state.ledger().len(), 1000);
    // Most recent first.
    assert_eq!(state.visible()[0].id, "item_999");
    assert_eq!(state.visible()[999].id, "item_0");
}
