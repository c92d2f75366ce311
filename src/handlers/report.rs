use std::time::Instant;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::{
    error::{AppError, JsonError},
    models::ReportEntry,
    AppState,
};

/// `GET /products/raport/:name` — quantity and stock value for every product
/// with the given name. Errors on this route are JSON bodies.
pub async fn product_report(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<ReportEntry>>, JsonError> {
    let start = Instant::now();
    let entries = state.store.report(&name).await?;

    if entries.is_empty() {
        info!(name = %name, "No product to report on");
        return Err(AppError::NotFound.into());
    }

    info!(
        name = %name,
        count = entries.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Generated product report"
    );

    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn report_for_unknown_name_is_json_404() {
        let app = TestApp::new();
        app.create(json!({ "name": "Gadget", "price": 1, "quantity": 1 })).await;

        let response = app
            .request(Method::GET, "/products/raport/Widget", None)
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.json(), json!({ "error": "Product not found" }));
    }

    #[tokio::test]
    async fn report_multiplies_price_by_quantity() {
        let app = TestApp::new();
        app.create(json!({ "name": "Widget", "price": 10, "quantity": 3, "color": "red" }))
            .await;

        let response = app
            .request(Method::GET, "/products/raport/Widget", None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.json(),
            json!([{ "productName": "Widget", "quantity": 3, "totalValue": 30 }])
        );
    }

    #[tokio::test]
    async fn report_decodes_name_from_path() {
        let app = TestApp::new();
        app.create(json!({ "name": "Blue Widget", "price": 2.5, "quantity": 4 }))
            .await;

        let response = app
            .request(Method::GET, "/products/raport/Blue%20Widget", None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.json(),
            json!([{ "productName": "Blue Widget", "quantity": 4, "totalValue": 10.0 }])
        );
    }

    #[tokio::test]
    async fn report_with_missing_price_has_null_total() {
        let app = TestApp::new();
        app.create(json!({ "name": "Widget", "quantity": 3 })).await;

        let response = app
            .request(Method::GET, "/products/raport/Widget", None)
            .await;
        assert_eq!(
            response.json(),
            json!([{ "productName": "Widget", "quantity": 3, "totalValue": null }])
        );
    }

    #[tokio::test]
    async fn report_store_failure_is_json_500() {
        let app = TestApp::new();
        app.create(json!({ "name": "Widget", "price": "ten", "quantity": 3 }))
            .await;

        let response = app
            .request(Method::GET, "/products/raport/Widget", None)
            .await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.json(), json!({ "error": "Internal Server Error" }));
    }
}
