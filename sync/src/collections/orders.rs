//! Orders, per customer and store-wide for staff.

use super::{decode, encode};
use crate::facade::Collection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shopfront_engine::{CollectionSchema, EntityId, FieldDef, FieldType, Fields};

/// Store-wide orders, readable by staff only.
pub const ADMIN_COLLECTION: &str = "orders";

/// Cache name of the store-wide orders, distinct from the customer's own.
pub const ADMIN_CACHE: &str = "all_orders";

/// Collection path of one customer's orders.
pub fn customer_path(user_id: &str) -> String {
    format!("users/{}/orders", user_id)
}

pub fn schema(collection: &str) -> CollectionSchema {
    CollectionSchema::new(
        collection,
        vec![
            FieldDef::required("userId", FieldType::String),
            FieldDef::required("items", FieldType::List),
            FieldDef::required("total", FieldType::Float),
            FieldDef::required("status", FieldType::String),
            FieldDef::optional("placedAt", FieldType::Timestamp),
        ],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Delivered and cancelled orders never change again.
    pub fn is_final(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: EntityId,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl OrderItem {
    pub fn new(
        product_id: impl Into<EntityId>,
        name: impl Into<String>,
        unit_price: f64,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, skip_serializing)]
    pub id: EntityId,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub status: OrderStatus,
    #[serde(default)]
    pub placed_at: u64,
}

/// Sum of item subtotals, rounded to cents.
pub fn order_total(items: &[OrderItem]) -> f64 {
    let total: f64 = items.iter().map(OrderItem::subtotal).sum();
    (total * 100.0).round() / 100.0
}

/// Typed access to an order collection.
#[derive(Debug, Clone)]
pub struct Orders {
    collection: Collection,
    user_id: Option<String>,
}

impl Orders {
    /// Orders of `user_id`.
    pub fn customer(collection: Collection, user_id: impl Into<String>) -> Self {
        Self {
            collection,
            user_id: Some(user_id.into()),
        }
    }

    /// Store-wide orders. Placing orders through this view is refused.
    pub fn admin(collection: Collection) -> Self {
        Self {
            collection,
            user_id: None,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Visible orders in display order.
    pub fn orders(&self) -> Vec<Order> {
        self.collection
            .view()
            .entities
            .iter()
            .filter_map(decode)
            .collect()
    }

    pub fn order(&self, id: &str) -> Option<Order> {
        self.collection.get(id).as_ref().and_then(decode)
    }

    pub fn by_status(&self, status: OrderStatus) -> Vec<Order> {
        self.orders()
            .into_iter()
            .filter(|o| o.status == status)
            .collect()
    }

    /// Place a pending order for the signed-in customer.
    pub fn place_order(&self, items: Vec<OrderItem>) -> Option<EntityId> {
        let Some(user_id) = self.user_id.clone() else {
            self.collection
                .record_error("orders can only be placed by a signed-in customer");
            return None;
        };
        if items.is_empty() || items.iter().any(|item| item.quantity == 0) {
            self.collection
                .record_error("an order needs at least one item with a positive quantity");
            return None;
        }

        let order = Order {
            id: EntityId::new(),
            user_id,
            total: order_total(&items),
            items,
            status: OrderStatus::Pending,
            placed_at: self.collection.now(),
        };
        match encode(&order) {
            Ok(fields) => self.collection.create(fields),
            Err(err) => {
                self.collection.record_error(err);
                None
            }
        }
    }

    /// Move an order to `status`. Final orders are left untouched.
    pub fn set_status(&self, id: &str, status: OrderStatus) -> bool {
        let Some(order) = self.order(id) else {
            self.collection.record_error(format!("order not found: {}", id));
            return false;
        };
        if order.status.is_final() {
            self.collection.record_error(format!(
                "order {} is already {}",
                id,
                order.status.as_str()
            ));
            return false;
        }

        let mut changes = Fields::new();
        changes.insert("status".into(), json!(status.as_str()));
        self.collection.update(id, &changes)
    }

    /// Cancel an order that has not shipped yet.
    pub fn cancel(&self, id: &str) -> bool {
        match self.order(id).map(|o| o.status) {
            Some(OrderStatus::Pending | OrderStatus::Paid) => {
                self.set_status(id, OrderStatus::Cancelled)
            }
            Some(status) => {
                self.collection.record_error(format!(
                    "order {} is {} and cannot be cancelled",
                    id,
                    status.as_str()
                ));
                false
            }
            None => {
                self.collection.record_error(format!("order not found: {}", id));
                false
            }
        }
    }
}
