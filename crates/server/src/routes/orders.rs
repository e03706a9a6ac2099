//! Order workflow: orders copy customer/product details at placement time and
//! announce themselves on the queue.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use models::{Customer, EntityKeys, Order, OrderStatus, Product, TableEntity};
use serde::Deserialize;
use service::StorageService;
use tracing::info;
use uuid::Uuid;

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct OrderInput {
    pub customer_id: Option<String>,
    pub product_id: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

fn default_quantity() -> i32 { 1 }

/// Look up the referenced customer and product; both must exist.
async fn resolve(state: &ServerState, input: &OrderInput) -> Result<(Customer, Product), JsonApiError> {
    let customer_id = input
        .customer_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| JsonApiError::bad_request("Select a customer."))?;
    let product_id = input
        .product_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| JsonApiError::bad_request("Select a product."))?;
    if input.quantity < 1 {
        return Err(JsonApiError::bad_request("Quantity must be >= 1"));
    }

    let customer = state
        .storage
        .get::<Customer>(Customer::TABLE, customer_id)
        .await?
        .ok_or_else(|| JsonApiError::bad_request(format!("unknown customer {customer_id}")))?;
    let product = state
        .storage
        .get::<Product>(Product::TABLE, product_id)
        .await?
        .ok_or_else(|| JsonApiError::bad_request(format!("unknown product {product_id}")))?;
    Ok((customer, product))
}

fn apply(order: &mut Order, input: &OrderInput, customer: &Customer, product: &Product) -> Result<(), JsonApiError> {
    order.customer_id = customer.keys.row_key.clone();
    order.username = customer.username.clone();
    order.product_id = product.keys.row_key.clone();
    order.product_name = product.product_name.clone();
    if let Some(date) = input.order_date {
        order.order_date = date;
    }
    if let Some(status) = input.status {
        order.status = status;
    }
    order.quantity = input.quantity;
    order.price_at(product.price)?;
    Ok(())
}

/// Newest orders first.
pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<Order>>, JsonApiError> {
    let mut orders = state.storage.list_all::<Order>().await?;
    orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
    Ok(Json(orders))
}

pub async fn get_one(State(state): State<ServerState>, Path(id): Path<String>) -> Result<Json<Order>, JsonApiError> {
    state
        .storage
        .get::<Order>(Order::TABLE, &id)
        .await?
        .map(Json)
        .ok_or_else(|| JsonApiError::not_found(format!("Order {id} not found")))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(input): Json<OrderInput>,
) -> Result<(StatusCode, Json<Order>), JsonApiError> {
    let (customer, product) = resolve(&state, &input).await?;

    let mut order = Order {
        keys: EntityKeys::new(Order::TABLE, Uuid::new_v4().to_string()),
        order_id: Order::generate_order_id(),
        ..Order::default()
    };
    apply(&mut order, &input, &customer, &product)?;
    order.validate()?;

    let order = state.storage.add(order).await?;
    state
        .storage
        .send_message(&format!(
            "Order {} placed for {} x{} {}",
            order.order_id, customer.username, order.quantity, product.product_name
        ))
        .await?;
    info!(order_id = %order.order_id, row_key = %order.keys.row_key, total = %order.total_price, "order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn edit(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(input): Json<OrderInput>,
) -> Result<Json<Order>, JsonApiError> {
    let (customer, product) = resolve(&state, &input).await?;
    let mut order = state
        .storage
        .get::<Order>(Order::TABLE, &id)
        .await?
        .ok_or_else(|| JsonApiError::not_found(format!("Order {id} not found")))?;

    apply(&mut order, &input, &customer, &product)?;
    order.validate()?;
    let order = state.storage.update(order).await?;
    info!(order_id = %order.order_id, row_key = %id, "order updated");
    Ok(Json(order))
}

pub async fn remove(State(state): State<ServerState>, Path(id): Path<String>) -> Result<StatusCode, JsonApiError> {
    match state.storage.delete::<Order>(Order::TABLE, &id).await? {
        0 => Err(JsonApiError::not_found(format!("Order {id} not found"))),
        _ => {
            info!(row_key = %id, "order deleted");
            Ok(StatusCode::NO_CONTENT)
        }
    }
}
