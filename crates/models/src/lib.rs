//! Entity model for the retail application.
//! - `entity` holds the two-part key block and the `TableEntity` trait the storage engine persists.
//! - `customer`, `product` and `order` are the concrete record types, one collection each.

pub mod errors;
pub mod entity;
pub mod customer;
pub mod product;
pub mod order;

pub use customer::Customer;
pub use entity::{EntityKeys, TableEntity};
pub use order::{Order, OrderStatus};
pub use product::Product;
