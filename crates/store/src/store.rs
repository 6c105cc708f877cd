use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerNumber, OrderId, ProductId, UserId};
use domain::{
    CartAggregate, CartItem, GatewayReturn, ItemKey, Order, OrderStatus, PaymentRecord, Product,
    ProductPatch, User, VariantDecrement,
};

use crate::Result;

/// A single-document change to an order, applied atomically by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderUpdate {
    /// Administrator status change.
    Status(OrderStatus),
    /// Gateway reported a successful payment.
    PaymentConfirmed,
    /// Gateway reported a failed payment; the order is cancelled.
    PaymentFailed,
}

impl OrderUpdate {
    /// Applies the change to an order document.
    pub fn apply(&self, order: &mut Order, now: DateTime<Utc>) {
        match *self {
            OrderUpdate::Status(status) => order.set_status(status, now),
            OrderUpdate::PaymentConfirmed => order.confirm_payment(now),
            OrderUpdate::PaymentFailed => order.fail_payment(now),
        }
    }
}

/// A single-cart change, applied atomically by the store.
#[derive(Debug, Clone)]
pub enum CartUpdate {
    /// Append a validated line item.
    Add(CartItem),
    /// Set the first matching line's quantity; zero removes every match.
    SetQuantity { key: ItemKey, quantity: u32 },
    /// Remove every matching line.
    Remove(ItemKey),
    /// Remove every line, keeping the document.
    Clear,
}

impl CartUpdate {
    /// Short name used in logs and metrics.
    pub fn op(&self) -> &'static str {
        match self {
            CartUpdate::Add(_) => "add",
            CartUpdate::SetQuantity { .. } => "update",
            CartUpdate::Remove(_) => "remove",
            CartUpdate::Clear => "clear",
        }
    }

    /// Applies the change to a cart document.
    pub fn apply(&self, cart: &mut CartAggregate, now: DateTime<Utc>) {
        match self {
            CartUpdate::Add(item) => cart.add_item(item.clone(), now),
            CartUpdate::SetQuantity { key, quantity } => cart.set_quantity(key, *quantity, now),
            CartUpdate::Remove(key) => {
                cart.remove_item(key, now);
            }
            CartUpdate::Clear => cart.clear(now),
        }
    }
}

/// Outcome of settling a payment record with a gateway return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSettlement {
    /// No record exists for the transaction reference.
    NotFound,
    /// This return moved the record out of `Pending`.
    Settled(PaymentRecord),
    /// The record had already been settled and was left as it was.
    AlreadySettled(PaymentRecord),
}

/// Outcome of an atomic per-variant stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecrementResult {
    Applied(VariantDecrement),
    ProductNotFound,
    VariantNotFound,
}

/// Document store over the `users`, `products`, `carts`, `orders` and
/// `payments` collections.
///
/// Every method touches a single document and is atomic with respect to
/// that document. Nothing spans documents; callers that walk several
/// documents accept partial completion.
#[async_trait]
pub trait Store: Send + Sync {
    /// Retrieves a user by principal id.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Inserts or replaces a user.
    async fn upsert_user(&self, user: &User) -> Result<()>;

    /// Retrieves every product.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Retrieves a product by id.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// Inserts or replaces a product.
    async fn upsert_product(&self, product: &Product) -> Result<()>;

    /// Applies `patch` to a product and returns the updated document.
    ///
    /// Returns `None` if the product does not exist.
    async fn update_product(
        &self,
        id: &ProductId,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>>;

    /// Deletes a product, returning whether it existed.
    async fn delete_product(&self, id: &ProductId) -> Result<bool>;

    /// Removes up to `quantity` units from the product's `(color, size)`
    /// stock entry, never going below zero.
    async fn decrement_variant(
        &self,
        id: &ProductId,
        color: &str,
        size: &str,
        quantity: u32,
    ) -> Result<DecrementResult>;

    /// Retrieves a user's cart document, if one was ever written.
    async fn get_cart(&self, user: &UserId) -> Result<Option<CartAggregate>>;

    /// Applies `update` to the user's cart, starting from an empty cart if
    /// none exists, and returns the stored document.
    async fn update_cart(
        &self,
        user: &UserId,
        update: &CartUpdate,
        now: DateTime<Utc>,
    ) -> Result<CartAggregate>;

    /// Inserts a new order.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Retrieves an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders newest first, optionally only those of one customer.
    async fn list_orders(&self, customer: Option<CustomerNumber>) -> Result<Vec<Order>>;

    /// Applies `update` to an order and returns the updated document.
    ///
    /// Returns `None` if the order does not exist.
    async fn update_order(
        &self,
        id: OrderId,
        update: OrderUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>>;

    /// Deletes an order, returning whether it existed.
    async fn delete_order(&self, id: OrderId) -> Result<bool>;

    /// Sets the order's reconciliation marker if and only if it is unset.
    ///
    /// Returns true for the single caller that set it.
    async fn mark_inventory_reconciled(&self, id: OrderId, at: DateTime<Utc>) -> Result<bool>;

    /// Inserts or replaces a payment record, keyed by `txn_ref`.
    async fn upsert_payment(&self, record: &PaymentRecord) -> Result<()>;

    /// Records a gateway return on a pending payment record.
    ///
    /// Only the first return for a transaction is recorded; later ones
    /// leave the record untouched.
    async fn settle_payment(
        &self,
        ret: &GatewayReturn,
        now: DateTime<Utc>,
    ) -> Result<PaymentSettlement>;

    /// Retrieves a payment record by transaction reference.
    async fn get_payment(&self, txn_ref: &str) -> Result<Option<PaymentRecord>>;
}
