//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{NewOrder, Order, OrderStatus};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// `{ "data": ... }` response envelope.
#[derive(Serialize)]
pub struct Data<T> {
    pub data: T,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}

/// GET /orders: all orders for administrators, the caller's own otherwise.
#[tracing::instrument(skip_all)]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Data<Vec<Order>>>, ApiError> {
    let orders = state.orders.list(&principal).await?;
    Ok(Json(Data { data: orders }))
}

/// POST /orders: place an order from a checkout payload.
#[tracing::instrument(skip_all)]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<Data<Order>>), ApiError> {
    let Json(payload) = payload?;
    let order = state.orders.create(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(Data { data: order })))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state, _user))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Data<Order>>, ApiError> {
    let order = state.orders.get(parse_order_id(&id)?).await?;
    Ok(Json(Data { data: order }))
}

/// PATCH /orders/{id}/status: administrators only.
#[tracing::instrument(skip(state, principal, payload))]
pub async fn set_status<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Data<Order>>, ApiError> {
    principal.require_admin()?;
    let Json(request) = payload?;
    let status: OrderStatus = request
        .status
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Missing required field: status".to_string()))?
        .parse()
        .map_err(|e: domain::OrderError| ApiError::BadRequest(e.to_string()))?;

    let (order, reconciliation) = state
        .orders
        .set_status(&principal, parse_order_id(&id)?, status)
        .await?;
    if let Some(report) = reconciliation.as_ref().and_then(|o| o.report()) {
        if report.is_oversold() {
            tracing::warn!(
                order_id = %order.id(),
                shortfall_units = report.shortfall_units(),
                "fulfilled order was oversold"
            );
        }
    }
    Ok(Json(Data { data: order }))
}
