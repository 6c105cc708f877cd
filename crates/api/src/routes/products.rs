//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use common::ProductId;
use domain::{NewProduct, Product, ProductPatch};
use serde::Serialize;
use services::ProductListing;
use store::Store;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::orders::Data;

/// GET /products: `{ source, data }` with `inStock` resolved per product.
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ProductListing>, ApiError> {
    Ok(Json(state.catalog.list().await?))
}

/// POST /products: administrators only.
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Data<Product>>), ApiError> {
    principal.require_admin()?;
    let Json(payload) = payload?;
    let product = state.catalog.create(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(Data { data: product })))
}

/// PUT /products/{id}: merge the submitted fields; administrators only.
pub async fn update<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<Json<Data<Product>>, ApiError> {
    principal.require_admin()?;
    let Json(patch) = payload?;
    let product = state
        .catalog
        .update(&principal, &ProductId::new(id), patch)
        .await?;
    Ok(Json(Data { data: product }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub ok: bool,
    pub deleted_id: String,
}

/// DELETE /products/{id}: administrators only.
pub async fn delete<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state
        .catalog
        .delete(&principal, &ProductId::new(id.clone()))
        .await?;
    Ok(Json(Deleted {
        ok: true,
        deleted_id: id,
    }))
}
