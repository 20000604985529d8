//! Product catalog, shared by every visitor of the store.

use super::{decode, encode};
use crate::facade::Collection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shopfront_engine::{CollectionSchema, EntityId, FieldDef, FieldType, Fields};

/// Collection path of the catalog.
pub const COLLECTION: &str = "products";

/// Schema every product must satisfy.
pub fn schema() -> CollectionSchema {
    CollectionSchema::new(
        COLLECTION,
        vec![
            FieldDef::required("name", FieldType::String),
            FieldDef::required("price", FieldType::Float),
            FieldDef::required("category", FieldType::String),
            FieldDef::optional("stock", FieldType::Int),
            FieldDef::optional("images", FieldType::List),
        ],
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, skip_serializing)]
    pub id: EntityId,
    pub name: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: f64, category: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            price,
            category: category.into(),
            stock: 0,
            images: Vec::new(),
        }
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Typed access to the product catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    collection: Collection,
}

impl Catalog {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Visible products in display order.
    pub fn products(&self) -> Vec<Product> {
        self.collection.view().entities.iter().filter_map(decode).collect()
    }

    pub fn product(&self, id: &str) -> Option<Product> {
        self.collection.get(id).as_ref().and_then(decode)
    }

    pub fn by_category(&self, category: &str) -> Vec<Product> {
        self.products()
            .into_iter()
            .filter(|p| p.category == category)
            .collect()
    }

    /// Add a product under a generated id.
    pub fn add_product(&self, product: &Product) -> Option<EntityId> {
        if product.price < 0.0 {
            self.collection.record_error("price must not be negative");
            return None;
        }
        match encode(product) {
            Ok(fields) => self.collection.create(fields),
            Err(err) => {
                self.collection.record_error(err);
                None
            }
        }
    }

    /// Merge `changes` into a product.
    pub fn edit_product(&self, id: &str, changes: &Fields) -> bool {
        self.collection.update(id, changes)
    }

    pub fn set_stock(&self, id: &str, stock: i64) -> bool {
        if stock < 0 {
            self.collection.record_error("stock must not be negative");
            return false;
        }
        let mut changes = Fields::new();
        changes.insert("stock".into(), json!(stock));
        self.collection.update(id, &changes)
    }

    pub fn remove_product(&self, id: &str) -> bool {
        self.collection.delete(id)
    }
}
