//! Multipart uploads: product images go to the blob store, proofs of payment
//! to the file share.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use models::{Product, TableEntity};
use serde::Serialize;
use service::StorageService;
use tracing::info;

use crate::errors::JsonApiError;
use crate::state::ServerState;

/// A file part read from a multipart body.
struct FilePart {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Collect the named file part plus any text fields.
async fn read_parts(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<(Option<FilePart>, Vec<(String, String)>), JsonApiError> {
    let mut file = None;
    let mut fields = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| JsonApiError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
            let bytes = field.bytes().await.map_err(|e| JsonApiError::bad_request(e.to_string()))?;
            file = Some(FilePart { file_name, content_type, bytes: bytes.to_vec() });
        } else {
            let value = field.text().await.map_err(|e| JsonApiError::bad_request(e.to_string()))?;
            fields.push((name, value));
        }
    }
    // an empty part is treated as no file selected
    Ok((file.filter(|f| !f.bytes.is_empty()), fields))
}

fn field<'a>(fields: &'a [(String, String)], name: &str) -> &'a str {
    fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str()).unwrap_or_default()
}

/// Attach an image to an existing product (multipart field `image`).
pub async fn product_image(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Product>, JsonApiError> {
    let mut product = state
        .storage
        .get::<Product>(Product::TABLE, &id)
        .await?
        .ok_or_else(|| JsonApiError::not_found(format!("Product {id} not found")))?;
    let (file, _) = read_parts(multipart, "image").await?;
    let file = file.ok_or_else(|| JsonApiError::bad_request("Please select an image to upload."))?;

    let reference = state
        .storage
        .upload_image(file.bytes.as_slice(), &file.file_name, &file.content_type)
        .await?;
    product.image_url = Some(reference);
    let product = state.storage.update(product).await?;
    Ok(Json(product))
}

#[derive(Debug, Serialize)]
pub struct UploadOutput {
    pub name: String,
}

/// Store a proof of payment (multipart: `file`, `order_id`, `customer_name`).
pub async fn upload_proof(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadOutput>), JsonApiError> {
    let (file, fields) = read_parts(multipart, "file").await?;
    let file = file.ok_or_else(|| JsonApiError::bad_request("Please select a file to upload."))?;

    let saved = state.storage.upload_to_share(file.bytes.as_slice(), &file.file_name).await?;
    state
        .storage
        .send_message(&format!(
            "Uploaded contract/proof {} for Order {}, Customer {}",
            saved,
            field(&fields, "order_id"),
            field(&fields, "customer_name")
        ))
        .await?;
    info!(file = %saved, "proof of payment stored");
    Ok((StatusCode::CREATED, Json(UploadOutput { name: saved })))
}

pub async fn download_proof(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, JsonApiError> {
    let bytes = state.storage.download_from_share(&name).await?;
    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
