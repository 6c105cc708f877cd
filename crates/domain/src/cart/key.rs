use common::ProductId;
use serde::{Deserialize, Serialize};

use super::CartItem;

/// Identity of one or more cart line items.
///
/// A key with only a product id addresses every line of that product; adding
/// a color and/or size narrows the match to lines with exactly those values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub product_id: ProductId,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl ItemKey {
    /// Addresses every line item for a product.
    pub fn product(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: product_id.into(),
            color: None,
            size: None,
        }
    }

    /// Addresses the line items for one color/size variant of a product.
    pub fn variant(
        product_id: impl Into<ProductId>,
        color: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            color: Some(color.into()),
            size: Some(size.into()),
        }
    }

    /// Builds a key from optional boundary parameters.
    pub fn from_parts(
        product_id: impl Into<ProductId>,
        color: Option<String>,
        size: Option<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            color,
            size,
        }
    }

    /// Returns true if the key addresses the given line item.
    pub fn matches(&self, item: &CartItem) -> bool {
        item.product_id == self.product_id
            && self
                .color
                .as_deref()
                .is_none_or(|c| c == item.selected_color)
            && self.size.as_deref().is_none_or(|s| s == item.selected_size)
    }

    /// Returns true if the key carries no variant filter.
    pub fn is_product_only(&self) -> bool {
        self.color.is_none() && self.size.is_none()
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.product_id)?;
        if !self.is_product_only() {
            write!(
                f,
                " [{}/{}]",
                self.color.as_deref().unwrap_or("*"),
                self.size.as_deref().unwrap_or("*")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::NewCartItem;
    use crate::money::Money;
    use chrono::Utc;

    fn item(product: &str, color: &str, size: &str) -> CartItem {
        NewCartItem {
            product_id: Some(product.to_string()),
            quantity: Some(1),
            price: Some(Money::from_units(10)),
            selected_color: Some(color.to_string()),
            selected_size: Some(size.to_string()),
            ..Default::default()
        }
        .validate(Utc::now())
        .unwrap()
    }

    #[test]
    fn test_product_key_matches_every_variant() {
        let key = ItemKey::product("P1");
        assert!(key.matches(&item("P1", "red", "M")));
        assert!(key.matches(&item("P1", "", "")));
        assert!(!key.matches(&item("P2", "red", "M")));
    }

    #[test]
    fn test_variant_key_requires_exact_color_and_size() {
        let key = ItemKey::variant("P1", "red", "M");
        assert!(key.matches(&item("P1", "red", "M")));
        assert!(!key.matches(&item("P1", "red", "L")));
        assert!(!key.matches(&item("P1", "", "")));
    }

    #[test]
    fn test_hyphenated_product_ids_are_not_split() {
        let key = ItemKey::variant("HELM-01", "black", "XL");
        assert!(key.matches(&item("HELM-01", "black", "XL")));
        assert!(!key.matches(&item("HELM", "01", "black")));
    }

    #[test]
    fn test_color_only_key() {
        let key = ItemKey::from_parts("P1", Some("red".to_string()), None);
        assert!(key.matches(&item("P1", "red", "M")));
        assert!(key.matches(&item("P1", "red", "L")));
        assert!(!key.matches(&item("P1", "blue", "M")));
    }

    #[test]
    fn test_display() {
        assert_eq!(ItemKey::product("P1").to_string(), "P1");
        assert_eq!(ItemKey::variant("P1", "red", "M").to_string(), "P1 [red/M]");
    }
}
