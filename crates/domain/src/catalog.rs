//! Catalog products and their per-variant stock ledger.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::inventory::VariantDecrement;
use crate::money::Money;

/// Stock held for one color/size variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockVariant {
    pub color: String,
    pub size: String,
    pub quantity: u32,
}

impl StockVariant {
    pub fn new(color: impl Into<String>, size: impl Into<String>, quantity: u32) -> Self {
        Self {
            color: color.into(),
            size: size.into(),
            quantity,
        }
    }

    fn is(&self, color: &str, size: &str) -> bool {
        self.color == color && self.size == size
    }
}

/// A product document.
///
/// Descriptive catalog fields the backend never interprets are kept in
/// `attributes` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub stock: Vec<StockVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock: Vec::new(),
            in_stock: None,
            updated_at: None,
            attributes: serde_json::Map::new(),
        }
    }

    pub fn with_variant(mut self, variant: StockVariant) -> Self {
        self.stock.push(variant);
        self
    }

    /// Returns the first stock entry for the exact color and size.
    pub fn variant(&self, color: &str, size: &str) -> Option<&StockVariant> {
        self.stock.iter().find(|v| v.is(color, size))
    }

    /// Whether the product can be sold.
    ///
    /// An explicitly stored flag wins; otherwise any variant with stock, or
    /// no stock ledger at all, counts as in stock.
    pub fn available(&self) -> bool {
        self.in_stock.unwrap_or_else(|| {
            self.stock.is_empty() || self.stock.iter().any(|v| v.quantity > 0)
        })
    }

    /// Removes `requested` units from the matching variant, clamping at zero.
    ///
    /// Only the first matching entry is touched. Returns `None` if the
    /// product has no such variant.
    pub fn decrement_variant(
        &mut self,
        color: &str,
        size: &str,
        requested: u32,
        now: DateTime<Utc>,
    ) -> Option<VariantDecrement> {
        let variant = self.stock.iter_mut().find(|v| v.is(color, size))?;
        let previous = variant.quantity;
        variant.quantity = previous.saturating_sub(requested);
        let decrement = VariantDecrement {
            product_id: self.id.clone(),
            color: color.to_string(),
            size: size.to_string(),
            requested,
            previous,
            remaining: variant.quantity,
        };
        self.updated_at = Some(now);
        Some(decrement)
    }
}

/// A product submitted for creation. Missing fields take catalog defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: Option<String>,
    pub price: Option<Money>,
    #[serde(alias = "inventory")]
    pub stock: Option<Vec<StockVariant>>,
    pub in_stock: Option<bool>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl NewProduct {
    /// Builds the product document under an assigned id.
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> Product {
        let mut attributes = self.attributes;
        for reserved in ["id", "_id", "updatedAt", "createdAt"] {
            attributes.remove(reserved);
        }
        attributes.insert(
            "createdAt".to_string(),
            serde_json::Value::String(now.to_rfc3339()),
        );

        Product {
            id,
            name: self.name.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            stock: self.stock.unwrap_or_default(),
            in_stock: Some(self.in_stock.unwrap_or(true)),
            updated_at: Some(now),
            attributes,
        }
    }
}

/// Fields an administrator changes on an existing product.
///
/// Only the fields present are written; everything else on the document is
/// kept. The id and creation time cannot be changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Money>,
    #[serde(alias = "inventory")]
    pub stock: Option<Vec<StockVariant>>,
    pub in_stock: Option<bool>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ProductPatch {
    /// Overlays the patch onto `product`.
    pub fn apply(&self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = &self.stock {
            product.stock = stock.clone();
        }
        if self.in_stock.is_some() {
            product.in_stock = self.in_stock;
        }
        for (key, value) in &self.attributes {
            if !matches!(key.as_str(), "id" | "_id" | "createdAt" | "updatedAt") {
                product.attributes.insert(key.clone(), value.clone());
            }
        }
        product.updated_at = Some(now);
    }
}

/// Sort key for product listings: numeric ids in numeric order, then the
/// rest by text.
pub fn listing_order(id: &ProductId) -> (bool, u64, &str) {
    let raw = id.as_str();
    let numeric = !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit());
    match raw.parse::<u64>() {
        Ok(n) if numeric => (false, n, raw),
        _ => (true, 0, raw),
    }
}

/// One past the largest numeric id in `ids`, or `"1"` if none is numeric.
pub fn next_product_id<'a>(ids: impl IntoIterator<Item = &'a ProductId>) -> ProductId {
    let next = ids
        .into_iter()
        .filter_map(|id| id.as_str().parse::<u64>().ok())
        .max()
        .map_or(1, |max| max + 1);
    ProductId::new(next.to_string())
}
