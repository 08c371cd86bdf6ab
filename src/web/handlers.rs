use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::Product;
use crate::web::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub url: String,
    pub owner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub status: &'static str,
    pub product: Product,
}

pub async fn track_product(
    State(state): State<AppState>,
    Json(request): Json<TrackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .tracker
        .track(request.owner.as_deref(), &request.url)
        .await?;

    let (code, status) = if outcome.created {
        (StatusCode::CREATED, "new")
    } else {
        (StatusCode::OK, "exists")
    };

    Ok((
        code,
        Json(TrackResponse {
            status,
            product: outcome.product,
        }),
    ))
}

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.tracker.list().await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.tracker.remove(&id).await?;
    Ok(Json(json!({ "success": true })))
}
