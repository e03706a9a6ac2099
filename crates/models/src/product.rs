use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::{EntityKeys, TableEntity};
use crate::errors::{require, ModelError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Product {
    #[serde(flatten)]
    pub keys: EntityKeys,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub stock_available: i32,
    /// Blob reference (`/media/...`) returned by an image upload.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    pub fn new(product_name: &str, price: Decimal, stock_available: i32) -> Self {
        Self {
            product_name: product_name.to_string(),
            price,
            stock_available,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require("ProductName", &self.product_name)?;
        if self.price.is_sign_negative() {
            return Err(ModelError::Validation("Price must be >= 0".into()));
        }
        if self.stock_available < 0 {
            return Err(ModelError::Validation("StockAvailable must be >= 0".into()));
        }
        Ok(())
    }
}

impl TableEntity for Product {
    const TABLE: &'static str = "Product";

    fn keys(&self) -> &EntityKeys { &self.keys }
    fn keys_mut(&mut self) -> &mut EntityKeys { &mut self.keys }
}
