//! Cart endpoints. All require an authenticated user.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use domain::{CartAggregate, CartItem, ItemKey, Money, NewCartItem};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// Optional variant filter narrowing a product-id path segment.
#[derive(Debug, Default, Deserialize)]
pub struct VariantQuery {
    pub color: Option<String>,
    pub size: Option<String>,
}

impl VariantQuery {
    fn key(self, product_id: String) -> ItemKey {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());
        ItemKey::from_parts(product_id, present(self.color), present(self.size))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub total_price: Money,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationResponse {
    pub success: bool,
    pub message: &'static str,
    pub total_price: Money,
}

impl CartMutationResponse {
    fn new(message: &'static str, cart: &CartAggregate) -> Json<Self> {
        Json(Self {
            success: true,
            message,
            total_price: cart.total_price(),
        })
    }
}

/// GET /carts
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.carts.get(&principal.user_id).await?;
    Ok(Json(CartResponse {
        total_price: cart.total_price(),
        items: cart.items().to_vec(),
    }))
}

/// POST /carts/items
pub async fn add_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
    payload: Result<Json<NewCartItem>, JsonRejection>,
) -> Result<Json<CartMutationResponse>, ApiError> {
    let Json(request) = payload?;
    let cart = state.carts.add_item(&principal.user_id, request).await?;
    Ok(CartMutationResponse::new("Item added to cart", &cart))
}

/// PUT /carts/items/{product_id}?color=..&size=..
pub async fn update_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
    Path(product_id): Path<String>,
    variant: Result<Query<VariantQuery>, QueryRejection>,
    payload: Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Json<CartMutationResponse>, ApiError> {
    let Query(variant) = variant?;
    let Json(request) = payload?;
    let quantity = request
        .quantity
        .ok_or_else(|| ApiError::BadRequest("Invalid quantity".to_string()))?;

    let key = variant.key(product_id);
    let cart = state
        .carts
        .update_item(&principal.user_id, &key, quantity)
        .await?;
    Ok(CartMutationResponse::new("Cart updated", &cart))
}

/// DELETE /carts/items/{product_id}?color=..&size=..
pub async fn remove_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
    Path(product_id): Path<String>,
    variant: Result<Query<VariantQuery>, QueryRejection>,
) -> Result<Json<CartMutationResponse>, ApiError> {
    let Query(variant) = variant?;
    let key = variant.key(product_id);
    let cart = state.carts.remove_item(&principal.user_id, &key).await?;
    Ok(CartMutationResponse::new("Item removed from cart", &cart))
}

/// DELETE /carts
pub async fn clear<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(principal): AuthUser,
) -> Result<Json<CartMutationResponse>, ApiError> {
    let cart = state.carts.clear(&principal.user_id).await?;
    Ok(CartMutationResponse::new("Cart cleared", &cart))
}
