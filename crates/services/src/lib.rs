//! Application services for the storefront backend.
//!
//! Each service owns one workflow over the [`store::Store`] and the optional
//! [`store::Cache`]:
//! - [`CartService`] keeps the per-user cart and its derived total
//! - [`CatalogService`] lists and creates products
//! - [`OrderService`] places orders and applies administrator status changes
//! - [`InventoryReconciler`] decrements stock exactly once per fulfilled order
//! - [`PaymentService`] builds gateway payment URLs and settles their returns

pub mod cart;
pub mod catalog;
pub mod error;
pub mod inventory;
pub mod order;
pub mod payment;
pub mod principal;

pub use cart::CartService;
pub use catalog::{CatalogService, ListingSource, ProductListing};
pub use error::{Result, ServiceError};
pub use inventory::{InventoryReconciler, ReconciliationOutcome};
pub use order::OrderService;
pub use payment::{
    CreatePayment, FailurePolicy, PaymentGateway, PaymentRequest, PaymentReturn, PaymentService,
    VnpayConfig, VnpayGateway,
};
pub use principal::Principal;
