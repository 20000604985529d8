//! Customer wishlist. Entities are keyed by product id.

use crate::facade::Collection;
use serde_json::json;
use shopfront_engine::{CollectionSchema, Entity, EntityId, FieldDef, FieldType, Fields, Timestamp};
use std::cmp::Reverse;

pub fn path(user_id: &str) -> String {
    format!("users/{}/wishlist", user_id)
}

pub fn schema(collection: &str) -> CollectionSchema {
    CollectionSchema::new(
        collection,
        vec![
            FieldDef::required("productId", FieldType::String),
            FieldDef::optional("addedAt", FieldType::Timestamp),
        ],
    )
}

#[derive(Debug, Clone)]
pub struct Wishlist {
    collection: Collection,
}

impl Wishlist {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.collection.get(product_id).is_some()
    }

    /// Wishlisted product ids, most recent additions first.
    pub fn product_ids(&self) -> Vec<EntityId> {
        let view = self.collection.view();
        let mut entries: Vec<_> = view.entities.iter().map(|e| (added_at(e), &e.id)).collect();
        entries.sort_by_key(|(added, _)| Reverse(*added));
        entries.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Add or remove `product_id`. Returns whether it is wishlisted afterwards,
    /// or `None` if the change was refused.
    pub fn toggle(&self, product_id: &str) -> Option<bool> {
        if self.contains(product_id) {
            return self.collection.delete(product_id).then_some(false);
        }

        let mut fields = Fields::new();
        fields.insert("productId".into(), json!(product_id));
        fields.insert("addedAt".into(), json!(self.collection.now()));
        self.collection
            .create_with_id(product_id, fields)
            .map(|_| true)
    }
}

fn added_at(entity: &Entity) -> Timestamp {
    entity
        .field("addedAt")
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}
