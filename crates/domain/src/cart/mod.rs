//! Per-user shopping cart and its line items.

mod aggregate;
mod item;
mod key;

pub use aggregate::CartAggregate;
pub use item::{CartItem, NewCartItem};
pub use key::ItemKey;

use thiserror::Error;

use crate::money::Money;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Product ID is required.
    #[error("Missing required field: productId")]
    MissingProductId,

    /// Quantity was missing or out of range.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// Price was missing or not positive.
    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: Money },
}
