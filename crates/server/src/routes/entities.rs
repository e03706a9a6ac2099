//! CRUD handlers shared by the customer and product collections.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use models::{errors::ModelError, Customer, EntityKeys, Product, TableEntity};
use rust_decimal::Decimal;
use serde::Serialize;
use service::StorageService;
use tracing::info;

use crate::errors::JsonApiError;
use crate::state::ServerState;

/// An entity type exposed as a REST collection.
pub trait Resource: TableEntity {
    fn validate(&self) -> Result<(), ModelError>;
    /// Order used when listing the collection.
    fn sort(list: &mut [Self]);
}

impl Resource for Customer {
    fn validate(&self) -> Result<(), ModelError> { Customer::validate(self) }
    fn sort(list: &mut [Self]) {
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.surname.cmp(&b.surname)));
    }
}

impl Resource for Product {
    fn validate(&self) -> Result<(), ModelError> { Product::validate(self) }
    fn sort(list: &mut [Self]) {
        list.sort_by(|a, b| a.product_name.cmp(&b.product_name));
    }
}

pub async fn list<T: Resource>(State(state): State<ServerState>) -> Result<Json<Vec<T>>, JsonApiError> {
    let mut items = state.storage.list_all::<T>().await?;
    T::sort(&mut items);
    Ok(Json(items))
}

pub async fn get_one<T: Resource>(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<T>, JsonApiError> {
    state
        .storage
        .get::<T>(T::TABLE, &id)
        .await?
        .map(Json)
        .ok_or_else(|| JsonApiError::not_found(format!("{} {} not found", T::TABLE, id)))
}

/// Create with store-assigned keys; client-supplied keys are ignored.
pub async fn create<T: Resource>(
    State(state): State<ServerState>,
    Json(mut input): Json<T>,
) -> Result<(StatusCode, Json<T>), JsonApiError> {
    input.validate()?;
    *input.keys_mut() = EntityKeys::default();
    let stored = state.storage.add(input).await?;
    info!(table = T::TABLE, row_key = %stored.row_key(), "created");
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Full replace keyed by the path id; creates the record when it does not exist.
pub async fn replace<T: Resource>(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(mut input): Json<T>,
) -> Result<Json<T>, JsonApiError> {
    input.validate()?;
    let keys = input.keys_mut();
    keys.partition_key = T::TABLE.to_string();
    keys.row_key = id;
    let stored = state.storage.update(input).await?;
    info!(table = T::TABLE, row_key = %stored.row_key(), "updated");
    Ok(Json(stored))
}

pub async fn remove<T: Resource>(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, JsonApiError> {
    match state.storage.delete::<T>(T::TABLE, &id).await? {
        0 => Err(JsonApiError::not_found(format!("{} {id} not found", T::TABLE))),
        _ => {
            info!(table = T::TABLE, row_key = %id, "deleted");
            Ok(StatusCode::NO_CONTENT)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductInfo {
    pub price: Decimal,
    pub stock: i32,
}

/// Price and stock for the order form; zeros for an unknown product.
pub async fn product_info(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<ProductInfo>, JsonApiError> {
    let product = state.storage.get::<Product>(Product::TABLE, &id).await?;
    Ok(Json(ProductInfo {
        price: product.as_ref().map(|p| p.price).unwrap_or_default(),
        stock: product.map(|p| p.stock_available).unwrap_or_default(),
    }))
}
