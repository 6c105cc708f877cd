//! Inventory reconciler: applies a fulfilled order to catalog stock.

use std::sync::Arc;

use chrono::Utc;
use common::OrderId;
use domain::{ReconciliationReport, SkipReason, SkippedItem};
use store::{Cache, DecrementResult, Store};

use crate::Result;
use crate::catalog::PRODUCTS_CACHE_KEY;

/// Outcome of a reconciliation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// The order does not exist; nothing was touched.
    OrderNotFound,
    /// Another trigger already reconciled this order.
    AlreadyReconciled,
    /// Stock was decremented for the order's lines.
    Reconciled(ReconciliationReport),
}

impl ReconciliationOutcome {
    /// True if this call walked the order's lines.
    pub fn applied(&self) -> bool {
        matches!(self, ReconciliationOutcome::Reconciled(_))
    }

    pub fn report(&self) -> Option<&ReconciliationReport> {
        match self {
            ReconciliationOutcome::Reconciled(report) => Some(report),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ReconciliationOutcome::OrderNotFound => "order_not_found",
            ReconciliationOutcome::AlreadyReconciled => "already_reconciled",
            ReconciliationOutcome::Reconciled(_) => "reconciled",
        }
    }
}

/// Decrements catalog stock for fulfilled orders.
///
/// The order's reconciliation marker is claimed before any stock moves, so
/// concurrent or repeated triggers for one order decrement at most once.
/// Lines are applied one by one; a line that cannot be applied is recorded
/// and skipped rather than aborting the rest.
pub struct InventoryReconciler<S: Store> {
    store: Arc<S>,
    cache: Arc<dyn Cache>,
}

impl<S: Store> Clone for InventoryReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: Store> InventoryReconciler<S> {
    pub fn new(store: Arc<S>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn decrement(&self, order_id: OrderId) -> Result<ReconciliationOutcome> {
        let outcome = self.reconcile(order_id).await?;
        metrics::counter!("inventory_reconciliations_total", "outcome" => outcome.label())
            .increment(1);
        Ok(outcome)
    }

    async fn reconcile(&self, order_id: OrderId) -> Result<ReconciliationOutcome> {
        let Some(order) = self.store.get_order(order_id).await? else {
            tracing::warn!("order not found, nothing to reconcile");
            return Ok(ReconciliationOutcome::OrderNotFound);
        };

        if !self
            .store
            .mark_inventory_reconciled(order_id, Utc::now())
            .await?
        {
            tracing::info!("order already reconciled, skipping");
            return Ok(ReconciliationOutcome::AlreadyReconciled);
        }

        let mut report = ReconciliationReport::new(order_id);
        for line in order.items() {
            let result = self
                .store
                .decrement_variant(&line.product_id, &line.color, &line.size, line.quantity)
                .await;

            let reason = match result {
                Ok(DecrementResult::Applied(decrement)) => {
                    tracing::info!(
                        product_id = %decrement.product_id,
                        color = %decrement.color,
                        size = %decrement.size,
                        previous = decrement.previous,
                        new = decrement.remaining,
                        "stock decremented"
                    );
                    if decrement.shortfall() > 0 {
                        tracing::warn!(
                            product_id = %decrement.product_id,
                            color = %decrement.color,
                            size = %decrement.size,
                            shortfall = decrement.shortfall(),
                            "order line oversold"
                        );
                        metrics::counter!("inventory_shortfall_units_total")
                            .increment(u64::from(decrement.shortfall()));
                    }
                    report.decremented.push(decrement);
                    continue;
                }
                Ok(DecrementResult::ProductNotFound) => SkipReason::ProductNotFound,
                Ok(DecrementResult::VariantNotFound) => SkipReason::VariantNotFound,
                Err(e) => {
                    tracing::error!(
                        product_id = %line.product_id,
                        error = %e,
                        "stock decrement failed"
                    );
                    SkipReason::StoreFailure
                }
            };

            tracing::warn!(
                product_id = %line.product_id,
                color = %line.color,
                size = %line.size,
                reason = reason.as_str(),
                "order line skipped"
            );
            report.skipped.push(SkippedItem {
                product_id: line.product_id.clone(),
                color: line.color.clone(),
                size: line.size.clone(),
                quantity: line.quantity,
                reason,
            });
        }

        self.cache.invalidate(PRODUCTS_CACHE_KEY).await;
        tracing::info!(
            decremented = report.decremented.len(),
            skipped = report.skipped.len(),
            shortfall_units = report.shortfall_units(),
            "order reconciled"
        );
        Ok(ReconciliationOutcome::Reconciled(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerNumber, ProductId};
    use domain::{Money, NewOrder, Order, OrderLine, Product, StockVariant};
    use store::{InMemoryStore, NoopCache};

    async fn setup(lines: Vec<OrderLine>) -> (InventoryReconciler<InMemoryStore>, InMemoryStore, OrderId) {
        let store = InMemoryStore::new();
        store
            .upsert_product(
                &Product::new("P1", "Helmet", Money::from_units(100))
                    .with_variant(StockVariant::new("red", "M", 5))
                    .with_variant(StockVariant::new("red", "L", 1)),
            )
            .await
            .unwrap();

        let order = Order::place(
            OrderId::new(),
            CustomerNumber::new(1),
            NewOrder {
                items: Some(lines),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        store.insert_order(&order).await.unwrap();

        let reconciler = InventoryReconciler::new(Arc::new(store.clone()), Arc::new(NoopCache));
        (reconciler, store, order.id())
    }

    fn line(product: &str, quantity: u32, color: &str, size: &str) -> OrderLine {
        OrderLine::new(product, "Helmet", Money::from_units(100), quantity, color, size)
    }

    async fn quantity(store: &InMemoryStore, color: &str, size: &str) -> u32 {
        store
            .get_product(&ProductId::new("P1"))
            .await
            .unwrap()
            .unwrap()
            .variant(color, size)
            .unwrap()
            .quantity
    }

    #[tokio::test]
    async fn test_decrements_matching_variant() {
        let (reconciler, store, order_id) = setup(vec![line("P1", 3, "red", "M")]).await;

        let outcome = reconciler.decrement(order_id).await.unwrap();
        assert!(outcome.applied());
        assert_eq!(quantity(&store, "red", "M").await, 2);
        assert_eq!(quantity(&store, "red", "L").await, 1);
    }

    #[tokio::test]
    async fn test_second_call_is_noop() {
        let (reconciler, store, order_id) = setup(vec![line("P1", 3, "red", "M")]).await;

        reconciler.decrement(order_id).await.unwrap();
        let again = reconciler.decrement(order_id).await.unwrap();

        assert_eq!(again, ReconciliationOutcome::AlreadyReconciled);
        assert!(!again.applied());
        assert_eq!(quantity(&store, "red", "M").await, 2);
    }

    #[tokio::test]
    async fn test_oversell_clamps_and_reports() {
        let (reconciler, store, order_id) = setup(vec![line("P1", 4, "red", "L")]).await;

        let outcome = reconciler.decrement(order_id).await.unwrap();
        let report = outcome.report().unwrap();
        assert!(report.is_oversold());
        assert_eq!(report.shortfall_units(), 3);
        assert_eq!(quantity(&store, "red", "L").await, 0);
    }

    #[tokio::test]
    async fn test_missing_product_and_variant_are_skipped() {
        let (reconciler, store, order_id) = setup(vec![
            line("P404", 1, "red", "M"),
            line("P1", 1, "blue", "M"),
            line("P1", 1, "red", "M"),
        ])
        .await;

        let outcome = reconciler.decrement(order_id).await.unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.decremented.len(), 1);
        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason).collect();
        assert_eq!(
            reasons,
            vec![SkipReason::ProductNotFound, SkipReason::VariantNotFound]
        );
        assert_eq!(quantity(&store, "red", "M").await, 4);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let (reconciler, _, _) = setup(vec![]).await;
        let outcome = reconciler.decrement(OrderId::new()).await.unwrap();
        assert_eq!(outcome, ReconciliationOutcome::OrderNotFound);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_decrement_once() {
        let (reconciler, store, order_id) = setup(vec![line("P1", 2, "red", "M")]).await;

        let a = reconciler.clone();
        let b = reconciler.clone();
        let (ra, rb) = tokio::join!(a.decrement(order_id), b.decrement(order_id));

        let applied = [ra.unwrap(), rb.unwrap()]
            .iter()
            .filter(|o| o.applied())
            .count();
        assert_eq!(applied, 1);
        assert_eq!(quantity(&store, "red", "M").await, 3);
    }
}
