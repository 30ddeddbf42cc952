//! HTTP request handlers for the tool surface.

pub mod health;
pub mod tools;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use catastro_common::CatastroError;
use serde_json::json;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Error response: `{"error": {"kind", "message"}}` with the error's status.
#[derive(Debug)]
pub struct ApiError(pub CatastroError);

impl From<CatastroError> for ApiError {
    fn from(err: CatastroError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Tools
        .route("/tools", get(tools::list_tools_handler))
        .route("/tools/:name", post(tools::call_tool_handler))
        // Health and metrics
        .route("/health", get(health::health_handler))
        .route("/metrics", get(health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status() {
        let response = ApiError(CatastroError::UnknownTool("x".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError(CatastroError::RateLimited {
            service: "wfs_cp".to_string(),
            status: 403,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
