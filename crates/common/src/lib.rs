//! Identifier types shared by every storefront crate.

mod types;

pub use types::{CustomerNumber, OrderId, ProductId, UserId};
