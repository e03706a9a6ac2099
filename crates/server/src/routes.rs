pub mod entities;
pub mod media;
pub mod orders;
pub mod uploads;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;
use models::{Customer, Order, Product};
use service::StorageService;

use crate::errors::JsonApiError;
use crate::state::ServerState;

/// Upload ceiling for image and file-share multipart bodies.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const FEATURED_PRODUCTS: usize = 5;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub customer_count: usize,
    pub product_count: usize,
    pub order_count: usize,
    pub featured_products: Vec<Product>,
}

/// Landing-page numbers: collection sizes plus a few products to feature.
pub async fn summary(State(state): State<ServerState>) -> Result<Json<Summary>, JsonApiError> {
    let customers = state.storage.list_all::<Customer>().await?;
    let products = state.storage.list_all::<Product>().await?;
    let orders = state.storage.list_all::<Order>().await?;
    Ok(Json(Summary {
        customer_count: customers.len(),
        product_count: products.len(),
        order_count: orders.len(),
        featured_products: products.into_iter().take(FEATURED_PRODUCTS).collect(),
    }))
}

/// Build the full application router
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/api/summary", get(summary))
        .route(
            "/api/customers",
            get(entities::list::<Customer>).post(entities::create::<Customer>),
        )
        .route(
            "/api/customers/:id",
            get(entities::get_one::<Customer>)
                .put(entities::replace::<Customer>)
                .delete(entities::remove::<Customer>),
        )
        .route(
            "/api/products",
            get(entities::list::<Product>).post(entities::create::<Product>),
        )
        .route(
            "/api/products/:id",
            get(entities::get_one::<Product>)
                .put(entities::replace::<Product>)
                .delete(entities::remove::<Product>),
        )
        .route("/api/products/:id/info", get(entities::product_info))
        .route("/api/products/:id/image", post(uploads::product_image))
        .route("/api/orders", get(orders::list).post(orders::create))
        .route(
            "/api/orders/:id",
            get(orders::get_one).put(orders::edit).delete(orders::remove),
        )
        .route("/api/uploads", post(uploads::upload_proof))
        .route("/api/uploads/:name", get(uploads::download_proof))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .route("/health", get(health))
        .route("/media/:file", get(media::serve))
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
