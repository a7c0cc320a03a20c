//! Provider catalog handlers.

use axum::Json;
use axum::extract::Path;
use axum::response::{IntoResponse, Response};

use crate::catalog::{self, ProviderInfo};
use crate::response;

/// GET /api/v1/providers
pub async fn list_providers() -> Json<&'static [ProviderInfo]> {
    Json(catalog::PROVIDERS)
}

/// GET /api/v1/providers/{id}
pub async fn get_provider(Path(id): Path<String>) -> Response {
    match catalog::provider(&id) {
        Some(info) => Json(info).into_response(),
        None => response::not_found(format!("Provider '{id}' not found")),
    }
}
