//! Results of reconciling catalog stock against a fulfilled order.

use common::{OrderId, ProductId};
use serde::Serialize;

/// One applied stock decrement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDecrement {
    pub product_id: ProductId,
    pub color: String,
    pub size: String,
    pub requested: u32,
    pub previous: u32,
    pub remaining: u32,
}

impl VariantDecrement {
    /// Units requested beyond what was on hand.
    pub fn shortfall(&self) -> u32 {
        self.requested.saturating_sub(self.previous)
    }
}

/// Why an order line was not applied to stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ProductNotFound,
    VariantNotFound,
    /// The store failed while applying the line.
    StoreFailure,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ProductNotFound => "product_not_found",
            SkipReason::VariantNotFound => "variant_not_found",
            SkipReason::StoreFailure => "store_failure",
        }
    }
}

/// An order line that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub product_id: ProductId,
    pub color: String,
    pub size: String,
    pub quantity: u32,
    pub reason: SkipReason,
}

/// Per-line outcome of reconciling one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub order_id: OrderId,
    pub decremented: Vec<VariantDecrement>,
    pub skipped: Vec<SkippedItem>,
}

impl ReconciliationReport {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            decremented: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Decrements that asked for more than was available.
    pub fn shortfalls(&self) -> impl Iterator<Item = &VariantDecrement> {
        self.decremented.iter().filter(|d| d.shortfall() > 0)
    }

    /// Returns true if any line was oversold.
    pub fn is_oversold(&self) -> bool {
        self.shortfalls().next().is_some()
    }

    /// Total units that could not be covered by stock.
    pub fn shortfall_units(&self) -> u64 {
        self.shortfalls().map(|d| u64::from(d.shortfall())).sum()
    }

    /// Returns true if every line was applied.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
