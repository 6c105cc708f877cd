use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use super::CartError;
use crate::money::Money;

/// A line item in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub quantity: u32,
    pub price: Money,
    /// Last written `quantity * price`. Kept for readers of the document;
    /// totals are never computed from it.
    #[serde(default)]
    pub subtotal: Money,
    #[serde(default)]
    pub selected_color: String,
    #[serde(default)]
    pub selected_size: String,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Returns `quantity * price`.
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.subtotal = self.line_total();
    }
}

/// An unvalidated add-to-cart request.
///
/// Every field is optional so that missing values surface as
/// [`CartError`]s rather than deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Money>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub selected_color: Option<String>,
    pub selected_size: Option<String>,
}

impl NewCartItem {
    /// Validates the request and builds the line item to append.
    pub fn validate(self, now: DateTime<Utc>) -> Result<CartItem, CartError> {
        let product_id = self
            .product_id
            .filter(|id| !id.is_empty())
            .ok_or(CartError::MissingProductId)?;

        let quantity = match self.quantity {
            Some(q) if q > 0 => {
                u32::try_from(q).map_err(|_| CartError::InvalidQuantity { quantity: q })?
            }
            other => {
                return Err(CartError::InvalidQuantity {
                    quantity: other.unwrap_or(0),
                });
            }
        };

        let price = match self.price {
            Some(p) if p.is_positive() => p,
            other => {
                return Err(CartError::InvalidPrice {
                    price: other.unwrap_or_default(),
                });
            }
        };

        Ok(CartItem {
            id: format!("{product_id}-{}", now.timestamp_millis()),
            product_id: ProductId::new(product_id),
            name: self
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown Product".to_string()),
            image: self.image.unwrap_or_default(),
            quantity,
            price,
            subtotal: price.multiply(quantity),
            selected_color: self.selected_color.unwrap_or_default(),
            selected_size: self.selected_size.unwrap_or_default(),
            added_at: now,
        })
    }
}
