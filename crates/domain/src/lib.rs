//! Domain layer for the storefront backend.
//!
//! This crate holds the persisted documents and the rules that keep them
//! consistent, with no I/O:
//! - Cart aggregate with composite-key line items and the pricing invariant
//! - Order aggregate with its status pair and the fulfilment guard
//! - Catalog products with a per-variant stock ledger
//! - Payment records for gateway transactions
//! - Reconciliation reports produced when stock is decremented

pub mod cart;
pub mod catalog;
pub mod error;
pub mod inventory;
pub mod money;
pub mod order;
pub mod payment;
pub mod user;

pub use cart::{CartAggregate, CartError, CartItem, ItemKey, NewCartItem};
pub use catalog::{NewProduct, Product, ProductPatch, StockVariant, listing_order, next_product_id};
pub use common::{CustomerNumber, OrderId, ProductId, UserId};
pub use error::DomainError;
pub use inventory::{ReconciliationReport, SkipReason, SkippedItem, VariantDecrement};
pub use money::Money;
pub use order::{
    CustomerInfo, NewCustomerInfo, NewOrder, Order, OrderError, OrderLine, OrderNumber, OrderStatus,
    PaymentMethod, PaymentStatus,
};
pub use payment::{GatewayReturn, PaymentRecord};
pub use user::{Role, User};
