//! Gateway payments: building signed payment URLs and settling returns.

mod gateway;
mod service;

pub use gateway::{PaymentGateway, PaymentRequest, VnpayConfig, VnpayGateway};
pub use service::{CreatePayment, FailurePolicy, PaymentReturn, PaymentService};
