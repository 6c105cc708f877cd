//! VNPay payment endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use domain::{Money, PaymentStatus};
use serde::Serialize;
use services::{CreatePayment, ServiceError};
use store::Store;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub success: bool,
    pub payment_url: String,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub data: PaymentStatusData,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusData {
    pub txn_ref: String,
    pub status: PaymentStatus,
    pub amount: Money,
    pub transaction_no: Option<String>,
    pub bank_code: Option<String>,
    pub pay_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("127.0.0.1")
        .to_string()
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "success": false, "message": message });
    (status, Json(body)).into_response()
}

/// POST /vnpay/create-payment
#[tracing::instrument(skip_all)]
pub async fn create_payment<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: AuthUser,
    headers: HeaderMap,
    payload: Result<Json<CreatePayment>, JsonRejection>,
) -> Result<Json<CreatePaymentResponse>, ApiError> {
    let Json(request) = payload?;
    let payment_url = state
        .payments
        .create_payment_url(request, &client_ip(&headers))
        .await?;
    Ok(Json(CreatePaymentResponse {
        success: true,
        payment_url,
        message: "Payment URL created successfully",
    }))
}

/// GET /vnpay/return: the customer's browser, sent back by the gateway.
///
/// Settled returns redirect to the frontend. Unexpected failures are
/// logged and still redirect, marked as failed.
#[tracing::instrument(skip_all)]
pub async fn handle_return<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let txn_ref = params.get("vnp_TxnRef").cloned().unwrap_or_default();
    let transaction_no = params.get("vnp_TransactionNo").cloned().unwrap_or_default();

    match state.payments.handle_return(params).await {
        Ok(settled) => found(&settled.redirect_url),
        Err(ServiceError::InvalidSignature) => {
            failure(StatusCode::BAD_REQUEST, "Invalid signature")
        }
        Err(ServiceError::NotFound(message)) => failure(StatusCode::NOT_FOUND, &message),
        Err(e) => {
            tracing::error!(error = %e, %txn_ref, "failed to process payment return");
            found(&state.payments.redirect_url(
                PaymentStatus::Failed,
                &txn_ref,
                &transaction_no,
            ))
        }
    }
}

/// GET /vnpay/status/{txn_ref}
#[tracing::instrument(skip(state, _user))]
pub async fn status<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _user: AuthUser,
    Path(txn_ref): Path<String>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let record = state.payments.payment_status(&txn_ref).await?;
    Ok(Json(PaymentStatusResponse {
        success: true,
        data: PaymentStatusData {
            txn_ref: record.txn_ref,
            status: record.status,
            amount: record.amount,
            transaction_no: record.transaction_no,
            bank_code: record.bank_code,
            pay_date: record.pay_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
        },
    }))
}
