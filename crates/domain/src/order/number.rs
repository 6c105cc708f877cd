use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Human-facing order number, `ORD-YYYYMMDD-NNNNNN`.
///
/// The suffix is the last six digits of the creation time in epoch
/// milliseconds, so it is not guaranteed unique; documents are keyed by
/// [`common::OrderId`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Derives the order number for an order created at `now`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self(format!(
            "ORD-{}-{:06}",
            now.format("%Y%m%d"),
            now.timestamp_millis().rem_euclid(1_000_000)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
