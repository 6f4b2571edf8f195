//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::{Money, ProductDraft, ProductId};
use ledger_store::{Product, Store};
use projections::StockReport;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam};
use crate::routes::caller::Caller;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Deserialize)]
pub struct RepriceRequest {
    pub price_cents: i64,
}

// -- Handlers --

/// GET /products: the whole catalog, ordered by id.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.queries.products().await?))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.queries.product(ProductId::new(id)).await?))
}

/// GET /products/{id}/stock: stock count with its availability bucket.
#[tracing::instrument(skip(state))]
pub async fn stock<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<StockReport>, ApiError> {
    Ok(Json(state.queries.stock(ProductId::new(id)).await?))
}

/// POST /products: add a product (privileged).
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    JsonBody(req): JsonBody<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let draft = ProductDraft::new(
        req.name,
        req.description,
        Money::from_cents(req.price_cents),
        req.stock,
    );
    let product = state
        .coordinator
        .create_product(draft, caller.privileged)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id}/price: change the catalog price (privileged).
#[tracing::instrument(skip(state, req))]
pub async fn reprice<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<RepriceRequest>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .coordinator
        .reprice_product(
            ProductId::new(id),
            Money::from_cents(req.price_cents),
            caller.privileged,
        )
        .await?;
    Ok(Json(product))
}

/// DELETE /products/{id}: remove a product no order references (privileged).
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .coordinator
        .delete_product(ProductId::new(id), caller.privileged)
        .await?;
    Ok(Json(product))
}
