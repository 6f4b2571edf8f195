//! Purchase, cancellation and order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::UnknownStatus;
use domain::{BuyerId, Cancellation, OrderId, OrderStatus, ProductId, Purchase};
use ledger_store::{Order, Store};
use projections::OrderSummary;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam};
use crate::routes::caller::Caller;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub buyer_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub buyer_id: i64,
    pub product_id: i64,
    /// `DD/MM/YYYY`
    pub date: String,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

// -- Handlers --

/// POST /orders: buy a quantity of one product.
#[tracing::instrument(skip(state, req))]
pub async fn place<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    JsonBody(req): JsonBody<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Purchase>), ApiError> {
    let purchase = state
        .coordinator
        .place_order(
            BuyerId::new(req.buyer_id),
            ProductId::new(req.product_id),
            req.quantity,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// GET /orders: every order, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(state.queries.all_orders().await?))
}

/// GET /buyers/{id}/orders: one buyer's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn by_buyer<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    Ok(Json(state.queries.buyer_orders(BuyerId::new(id)).await?))
}

/// POST /orders/{id}/status: move an order along its lifecycle (privileged).
#[tracing::instrument(skip(state, req))]
pub async fn advance_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<StatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|e: UnknownStatus| ApiError::BadRequest(e.to_string()))?;
    let order = state
        .coordinator
        .advance_status(OrderId::new(id), status, caller.privileged)
        .await?;
    Ok(Json(order))
}

/// POST /orders/cancel: remove a buyer's orders of one product for one day.
///
/// Allowed for privileged callers and for the buyer named in the request.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    JsonBody(req): JsonBody<CancelOrderRequest>,
) -> Result<Json<Cancellation>, ApiError> {
    let buyer = BuyerId::new(req.buyer_id);
    let cancellation = state
        .coordinator
        .cancel_order(
            buyer,
            ProductId::new(req.product_id),
            &req.date,
            caller.may_act_for(buyer),
        )
        .await?;
    Ok(Json(cancellation))
}
