//! Order manager: checkout, listing and administrator status changes.

use std::sync::Arc;

use chrono::Utc;
use common::OrderId;
use domain::{NewOrder, Order, OrderStatus, User};
use store::{OrderUpdate, Store};

use crate::inventory::{InventoryReconciler, ReconciliationOutcome};
use crate::{Principal, Result, ServiceError};

pub struct OrderService<S: Store> {
    store: Arc<S>,
    reconciler: InventoryReconciler<S>,
}

impl<S: Store> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            reconciler: self.reconciler.clone(),
        }
    }
}

impl<S: Store> OrderService<S> {
    pub fn new(store: Arc<S>, reconciler: InventoryReconciler<S>) -> Self {
        Self { store, reconciler }
    }

    async fn resolve_user(&self, principal: &Principal) -> Result<User> {
        self.store
            .get_user(&principal.user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    /// Places a pending order owned by the caller.
    ///
    /// The owner is always the caller's customer number, whatever the
    /// payload says.
    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id))]
    pub async fn create(&self, principal: &Principal, payload: NewOrder) -> Result<Order> {
        let user = self.resolve_user(principal).await?;
        let order = Order::place(OrderId::new(), user.customer_number, payload, Utc::now())?;

        self.store.insert_order(&order).await?;
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            order_number = %order.order_number(),
            total = %order.total_amount(),
            "order created"
        );
        Ok(order)
    }

    /// Lists orders newest first: all of them for administrators, the
    /// caller's own otherwise.
    #[tracing::instrument(skip_all, fields(user_id = %principal.user_id))]
    pub async fn list(&self, principal: &Principal) -> Result<Vec<Order>> {
        let user = self.resolve_user(principal).await?;
        let filter = if user.role.is_admin() {
            None
        } else {
            Some(user.customer_number)
        };
        Ok(self.store.list_orders(filter).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Order> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    /// Sets an order's status. Administrators only.
    ///
    /// When the change fulfils the order (a cash-on-delivery order is
    /// delivered, or a paid order is completed) its stock is reconciled.
    /// Any status may follow any other.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub async fn set_status(
        &self,
        principal: &Principal,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(Order, Option<ReconciliationOutcome>)> {
        principal.require_admin()?;

        let order = self
            .store
            .update_order(id, OrderUpdate::Status(status), Utc::now())
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        metrics::counter!("order_status_changes_total", "status" => status.as_str()).increment(1);
        tracing::info!(%status, "order status changed");

        let reconciliation = if order.fulfils_on(status) {
            Some(self.reconciler.decrement(id).await?)
        } else {
            None
        };
        Ok((order, reconciliation))
    }
}
