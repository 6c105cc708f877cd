//! Order aggregate and related types.

mod aggregate;
mod number;
mod state;

pub use aggregate::{CustomerInfo, NewCustomerInfo, NewOrder, Order, OrderLine};
pub use number::OrderNumber;
pub use state::{OrderStatus, PaymentMethod, PaymentStatus};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The requested status is not one the order lifecycle knows.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    /// An order line carried a zero quantity.
    #[error("Invalid quantity for product {product_id}: must be greater than 0")]
    InvalidLineQuantity { product_id: String },
}
