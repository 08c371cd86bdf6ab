use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, post};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::tracker::ProductTracker;
use crate::utils::error::AppError;

pub mod handlers;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<ProductTracker>,
}

pub fn build_router(tracker: Arc<ProductTracker>) -> Router {
    Router::new()
        .route(
            "/api/products",
            post(handlers::track_product).get(handlers::list_products),
        )
        .route("/api/products/:id", delete(handlers::delete_product))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { tracker })
}

/// Wrapper so core errors can map onto HTTP responses.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::InvalidUrl(_) | AppError::PriceNotFound { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
