//! Domain error types.

use thiserror::Error;

use crate::cart::CartError;
use crate::order::OrderError;

/// Errors raised by domain rules before anything is persisted.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A cart rule was violated.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// An order rule was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),
}
