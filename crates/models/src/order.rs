use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{EntityKeys, TableEntity};
use crate::errors::{require, ModelError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    Submitted,
    Processing,
    Completed,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    #[serde(flatten)]
    pub keys: EntityKeys,
    #[serde(default)]
    pub order_id: String,
    /// RowKey of the ordering customer; not enforced by the store.
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub username: String,
    /// RowKey of the ordered product; not enforced by the store.
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    pub order_date: DateTime<Utc>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            keys: EntityKeys::default(),
            order_id: String::new(),
            customer_id: String::new(),
            username: String::new(),
            product_id: String::new(),
            product_name: String::new(),
            order_date: Utc::now(),
            quantity: 1,
            unit_price: Decimal::ZERO,
            total_price: Decimal::ZERO,
            status: OrderStatus::Pending,
        }
    }
}

impl Order {
    /// Short human-facing order number: 8 upper-case hex characters.
    pub fn generate_order_id() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase()
    }

    /// Set unit price and recompute the total for the current quantity.
    /// Leaves the order untouched when the total does not fit a `Decimal`.
    pub fn price_at(&mut self, unit_price: Decimal) -> Result<(), ModelError> {
        let total = unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| ModelError::Validation("TotalPrice out of range".into()))?;
        self.unit_price = unit_price;
        self.total_price = total;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require("CustomerId", &self.customer_id)?;
        require("ProductId", &self.product_id)?;
        if self.quantity < 1 {
            return Err(ModelError::Validation("Quantity must be >= 1".into()));
        }
        Ok(())
    }
}

impl TableEntity for Order {
    const TABLE: &'static str = "Order";

    fn keys(&self) -> &EntityKeys { &self.keys }
    fn keys_mut(&mut self) -> &mut EntityKeys { &mut self.keys }
}
