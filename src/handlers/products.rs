use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, AppResult},
    models::{
        strip_identifier, DeleteAck, Fields, InsertAck, ListQuery, NewProduct, Product, ProductId,
        UpdateAck,
    },
    AppState,
};

fn parse_id(raw: &str) -> AppResult<ProductId> {
    raw.parse()
        .map_err(|_| AppError::InvalidId(raw.to_string()))
}

/// The listing query travels in the body of a GET, so an empty body is allowed.
fn parse_list_query(body: &[u8]) -> AppResult<ListQuery> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ListQuery::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(e.to_string()))
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_products(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<Vec<Product>>> {
    let query = parse_list_query(&body)?;
    debug!(?query, "List products request");

    let filter = query.validated_filter().map_err(AppError::BadRequest)?;
    let start = Instant::now();
    let products = state.store.list(&filter, query.sort_field()).await?;

    info!(
        count = products.len(),
        sort_by = query.sort_field(),
        elapsed_ms = start.elapsed().as_millis(),
        "Listed products"
    );

    Ok(Json(products))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<NewProduct>,
) -> AppResult<Json<InsertAck>> {
    if state.store.find_by_name(&payload.name).await?.is_some() {
        warn!(name = %payload.name, "Rejected product with duplicate name");
        return Err(AppError::DuplicateName(payload.name));
    }

    let name = payload.name.clone();
    let start = Instant::now();
    let ack = state.store.insert(payload).await?;

    info!(
        id = %ack.inserted_id,
        name = %name,
        elapsed_ms = start.elapsed().as_millis(),
        "Created product"
    );

    Ok(Json(ack))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut changes): Json<Fields>,
) -> AppResult<Json<UpdateAck>> {
    let id = parse_id(&id)?;
    if strip_identifier(&mut changes) {
        debug!(id = %id, "Ignoring _id in update body");
    }

    let start = Instant::now();
    let ack = state.store.update(id, changes).await?;

    info!(
        id = %id,
        matched = ack.matched_count,
        modified = ack.modified_count,
        elapsed_ms = start.elapsed().as_millis(),
        "Updated product"
    );

    Ok(Json(ack))
}

// ── Delete ────────────────────────────────────────────────────────────────────

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteAck>> {
    let id = parse_id(&id)?;

    let start = Instant::now();
    let ack = state.store.delete(id).await?;

    info!(
        id = %id,
        deleted = ack.deleted_count,
        elapsed_ms = start.elapsed().as_millis(),
        "Deleted product"
    );

    Ok(Json(ack))
}
