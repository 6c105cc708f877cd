//! Service error types.

use domain::{CartError, DomainError, OrderError};
use store::StoreError;
use thiserror::Error;

/// Errors returned by the application services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A request field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// No usable principal accompanied the request.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The principal lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A gateway return failed signature verification.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The payment gateway could not serve the request.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Persistence failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<CartError> for ServiceError {
    fn from(err: CartError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<OrderError> for ServiceError {
    fn from(err: OrderError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Cart(e) => e.into(),
            DomainError::Order(e) => e.into(),
        }
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;
