use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use super::{CartError, CartItem, ItemKey};
use crate::money::Money;

/// A user's cart document.
///
/// `total_price` is derived state: every mutation recomputes it from
/// `quantity * price` over the current items, and [`CartAggregate::recalculate`]
/// must be called on documents loaded from storage before the value is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAggregate {
    user_id: UserId,
    items: Vec<CartItem>,
    #[serde(default)]
    total_price: Money,
    updated_at: DateTime<Utc>,
}

impl CartAggregate {
    /// Creates an empty cart for a user.
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            total_price: Money::zero(),
            updated_at: now,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends a line item. Lines for the same variant are not merged.
    pub fn add_item(&mut self, item: CartItem, now: DateTime<Utc>) {
        self.items.push(item);
        self.touch(now);
    }

    /// Sets the quantity of the first line matching `key`.
    ///
    /// A quantity of zero removes every matching line instead. A key that
    /// matches no line leaves the cart unchanged.
    pub fn update_item(
        &mut self,
        key: &ItemKey,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CartError> {
        let quantity = Self::checked_quantity(quantity)?;
        self.set_quantity(key, quantity, now);
        Ok(())
    }

    /// Validates a requested line quantity.
    pub fn checked_quantity(quantity: i64) -> Result<u32, CartError> {
        u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity { quantity })
    }

    /// [`CartAggregate::update_item`] for an already validated quantity.
    pub fn set_quantity(&mut self, key: &ItemKey, quantity: u32, now: DateTime<Utc>) {
        if quantity == 0 {
            self.remove_item(key, now);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| key.matches(i)) {
            item.set_quantity(quantity);
            self.touch(now);
        }
    }

    /// Removes every line matching `key`, returning how many were removed.
    pub fn remove_item(&mut self, key: &ItemKey, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !key.matches(i));
        self.touch(now);
        before - self.items.len()
    }

    /// Empties the cart, keeping the document.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.touch(now);
    }

    /// Recomputes `total_price` from the current items.
    pub fn recalculate(&mut self) {
        self.total_price = Self::compute_total(&self.items);
    }

    /// `round2(sum(quantity * price))` over `items`, ignoring stored subtotals.
    pub fn compute_total(items: &[CartItem]) -> Money {
        items.iter().map(CartItem::line_total).sum::<Money>().round2()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.recalculate();
        self.updated_at = now;
    }
}
