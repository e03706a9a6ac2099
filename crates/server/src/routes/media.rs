use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use service::StorageService;

use crate::errors::JsonApiError;
use crate::state::ServerState;

/// Resolve a `/media/<name>` blob reference back to the stored image bytes.
pub async fn serve(
    State(state): State<ServerState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, JsonApiError> {
    let bytes = state.storage.read_image(&file).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
