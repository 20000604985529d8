//! Entity types for storing collection data.

use crate::{EntityId, Fields, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A record in a synchronized collection.
///
/// Identity is the `id`; every field is replaceable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Stable identifier, assigned locally for optimistic creates
    pub id: EntityId,
    /// The entity's fields
    #[serde(default)]
    pub fields: Fields,
    /// When the entity was last modified (milliseconds since epoch)
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Entity {
    /// Create a new entity.
    pub fn new(id: impl Into<EntityId>, fields: Fields, updated_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            fields,
            updated_at,
        }
    }

    /// Get a single field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Merge `partial` into this entity's fields (merge-write semantics).
    ///
    /// Top-level keys in `partial` replace existing keys; keys not mentioned
    /// are kept.
    pub fn merge_fields(&mut self, partial: &Fields, timestamp: Timestamp) {
        for (key, value) in partial {
            self.fields.insert(key.clone(), value.clone());
        }
        self.updated_at = timestamp;
    }

    /// Compare two entities field by field, skipping volatile fields and the
    /// `updated_at` stamp.
    pub fn field_eq(&self, other: &Entity, volatile: &VolatileFields) -> bool {
        if self.id != other.id {
            return false;
        }

        let relevant = |fields: &Fields| {
            fields
                .iter()
                .filter(|(key, _)| !volatile.contains(key))
                .count()
        };
        if relevant(&self.fields) != relevant(&other.fields) {
            return false;
        }

        self.fields
            .iter()
            .filter(|(key, _)| !volatile.contains(key))
            .all(|(key, value)| match other.fields.get(key) {
                Some(theirs) => values_eq(value, theirs),
                None => false,
            })
    }
}

/// Structural equality for field values.
///
/// Numbers compare by value, so `20` and `20.0` are equal. Stores that
/// normalize integers to doubles would otherwise never confirm a write.
pub fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                return x == y;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_eq(x, y)))
        }
        _ => a == b,
    }
}

/// Field names excluded from reconciliation equality.
///
/// Defaults to `createdAt` and `updatedAt`, which the remote store usually
/// rewrites with its own clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatileFields(BTreeSet<String>);

impl VolatileFields {
    /// No volatile fields: every field takes part in equality.
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// Builder-style method to add a field name.
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into());
        self
    }

    /// Check whether a field is volatile.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

impl Default for VolatileFields {
    fn default() -> Self {
        Self::none().with("createdAt").with("updatedAt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn create_entity() {
        let entity = Entity::new("p1", fields(json!({"name": "Tee", "price": 20})), 1000);

        assert_eq!(entity.id, "p1");
        assert_eq!(entity.field("name"), Some(&json!("Tee")));
        assert_eq!(entity.updated_at, 1000);
    }

    #[test]
    fn merge_fields_keeps_untouched_keys() {
        let mut entity = Entity::new("p1", fields(json!({"name": "Tee", "price": 20})), 1000);
        entity.merge_fields(&fields(json!({"price": 25, "stock": 3})), 2000);

        assert_eq!(
            entity.fields,
            fields(json!({"name": "Tee", "price": 25, "stock": 3}))
        );
        assert_eq!(entity.updated_at, 2000);
    }

    #[test]
    fn field_eq_ignores_timestamps() {
        let volatile = VolatileFields::default();
        let local = Entity::new(
            "p1",
            fields(json!({"name": "Tee", "updatedAt": 1000})),
            1000,
        );
        let remote = Entity::new(
            "p1",
            fields(json!({"name": "Tee", "updatedAt": 1234, "createdAt": 999})),
            1234,
        );

        assert!(local.field_eq(&remote, &volatile));
        assert!(!local.field_eq(&remote, &VolatileFields::none()));
    }

    #[test]
    fn field_eq_detects_differences() {
        let volatile = VolatileFields::default();
        let a = Entity::new("p1", fields(json!({"price": 20})), 0);
        let b = Entity::new("p1", fields(json!({"price": 25})), 0);
        let c = Entity::new("p1", fields(json!({"price": 20, "stock": 1})), 0);
        let d = Entity::new("p2", fields(json!({"price": 20})), 0);

        assert!(!a.field_eq(&b, &volatile));
        assert!(!a.field_eq(&c, &volatile));
        assert!(!c.field_eq(&a, &volatile));
        assert!(!a.field_eq(&d, &volatile));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(values_eq(&json!(20), &json!(20.0)));
        assert!(values_eq(&json!({"a": [1, 2.5]}), &json!({"a": [1.0, 2.5]})));
        assert!(!values_eq(&json!(20), &json!("20")));
        assert!(!values_eq(&json!([1, 2]), &json!([2, 1])));
    }

    #[test]
    fn null_is_not_missing() {
        let volatile = VolatileFields::default();
        let a = Entity::new("p1", fields(json!({"note": null})), 0);
        let b = Entity::new("p1", fields(json!({"other": null})), 0);
        assert!(!a.field_eq(&b, &volatile));
    }

    #[test]
    fn serialization_format() {
        let entity = Entity::new("p1", fields(json!({"name": "Tee"})), 1000);
        let json = serde_json::to_string(&entity).unwrap();
        assert!(json.contains("updatedAt")); // camelCase

        let parsed: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(entity, parsed);
    }
}
