pub mod products;
pub mod report;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use tracing::warn;

use crate::AppState;

const SERVICE: &str = "product-catalog";

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok", "service": SERVICE }))),
        Err(err) => {
            warn!(error = %err, "Health check could not reach the document store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "service": SERVICE })),
            )
        }
    }
}
