//! Cart manager: per-user cart reads and mutations with a read-through cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::UserId;
use domain::{CartAggregate, ItemKey, NewCartItem};
use store::{Cache, CacheExt, CartUpdate, Store};

use crate::Result;

/// How long a cart read stays cached.
pub const CART_CACHE_TTL: Duration = Duration::from_secs(86_400);

fn cache_key(user: &UserId) -> String {
    format!("cart:{}", user.as_str())
}

/// Reads and mutates a user's cart.
///
/// Every mutation is applied by the store as one atomic change to the cart
/// document, so concurrent writers never drop each other's lines. Each
/// mutation invalidates the cached copy, and the total is recomputed from
/// the lines on every load and every mutation.
pub struct CartService<S: Store> {
    store: Arc<S>,
    cache: Arc<dyn Cache>,
}

impl<S: Store> Clone for CartService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: Store> CartService<S> {
    pub fn new(store: Arc<S>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// Returns the user's cart, or an empty one if none was ever written.
    #[tracing::instrument(skip_all, fields(user_id = %user))]
    pub async fn get(&self, user: &UserId) -> Result<CartAggregate> {
        let key = cache_key(user);
        let cached: Option<CartAggregate> = self.cache.get_json(&key).await;
        if let Some(mut cart) = cached {
            cart.recalculate();
            return Ok(cart);
        }

        let cart = match self.store.get_cart(user).await? {
            Some(mut cart) => {
                cart.recalculate();
                cart
            }
            None => CartAggregate::empty(user.clone(), Utc::now()),
        };
        self.cache.set_json(&key, &cart, CART_CACHE_TTL).await;
        Ok(cart)
    }

    /// Validates and appends a line item.
    #[tracing::instrument(skip_all, fields(user_id = %user))]
    pub async fn add_item(&self, user: &UserId, request: NewCartItem) -> Result<CartAggregate> {
        let item = request.validate(Utc::now())?;
        self.apply(user, CartUpdate::Add(item)).await
    }

    /// Sets the quantity of the first matching line; zero removes every
    /// match. A key with no matching line leaves the cart as it is.
    #[tracing::instrument(skip_all, fields(user_id = %user, key = %key, quantity = quantity))]
    pub async fn update_item(
        &self,
        user: &UserId,
        key: &ItemKey,
        quantity: i64,
    ) -> Result<CartAggregate> {
        let quantity = CartAggregate::checked_quantity(quantity)?;
        self.apply(
            user,
            CartUpdate::SetQuantity {
                key: key.clone(),
                quantity,
            },
        )
        .await
    }

    /// Removes every line matching `key`.
    #[tracing::instrument(skip_all, fields(user_id = %user, key = %key))]
    pub async fn remove_item(&self, user: &UserId, key: &ItemKey) -> Result<CartAggregate> {
        self.apply(user, CartUpdate::Remove(key.clone())).await
    }

    /// Empties the cart without deleting it.
    #[tracing::instrument(skip_all, fields(user_id = %user))]
    pub async fn clear(&self, user: &UserId) -> Result<CartAggregate> {
        self.apply(user, CartUpdate::Clear).await
    }

    async fn apply(&self, user: &UserId, update: CartUpdate) -> Result<CartAggregate> {
        let cart = self.store.update_cart(user, &update, Utc::now()).await?;
        self.cache.invalidate(&cache_key(user)).await;

        let op = update.op();
        metrics::counter!("cart_mutations_total", "op" => op).increment(1);
        tracing::info!(
            op,
            items = cart.item_count(),
            total = %cart.total_price(),
            "cart updated"
        );
        Ok(cart)
    }
}
