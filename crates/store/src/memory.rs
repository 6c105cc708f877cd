use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerNumber, OrderId, ProductId, UserId};
use domain::{
    CartAggregate, GatewayReturn, Order, PaymentRecord, Product, ProductPatch, User, listing_order,
};
use tokio::sync::RwLock;

use crate::{
    Result,
    store::{CartUpdate, DecrementResult, OrderUpdate, PaymentSettlement, Store},
};

#[derive(Default)]
struct Collections {
    users: HashMap<UserId, User>,
    products: Vec<Product>,
    carts: HashMap<UserId, CartAggregate>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<String, PaymentRecord>,
}

/// In-memory document store for testing and local runs.
///
/// All collections live behind one lock, so every operation is atomic.
/// Product listings are sorted the way [`crate::PostgresStore`] sorts them.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        self.inner
            .write()
            .await
            .users
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let mut products = self.inner.read().await.products.clone();
        products.sort_by(|a, b| listing_order(&a.id).cmp(&listing_order(&b.id)));
        Ok(products)
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let inner = self.inner.read().await;
        Ok(inner.products.iter().find(|p| &p.id == id).cloned())
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product.clone(),
            None => inner.products.push(product.clone()),
        }
        Ok(())
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>> {
        let mut inner = self.inner.write().await;
        Ok(inner.products.iter_mut().find(|p| &p.id == id).map(|product| {
            patch.apply(product, now);
            product.clone()
        }))
    }

    async fn delete_product(&self, id: &ProductId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.products.len();
        inner.products.retain(|p| &p.id != id);
        Ok(inner.products.len() != before)
    }

    async fn decrement_variant(
        &self,
        id: &ProductId,
        color: &str,
        size: &str,
        quantity: u32,
    ) -> Result<DecrementResult> {
        let mut inner = self.inner.write().await;
        let Some(product) = inner.products.iter_mut().find(|p| &p.id == id) else {
            return Ok(DecrementResult::ProductNotFound);
        };
        Ok(
            match product.decrement_variant(color, size, quantity, Utc::now()) {
                Some(d) => DecrementResult::Applied(d),
                None => DecrementResult::VariantNotFound,
            },
        )
    }

    async fn get_cart(&self, user: &UserId) -> Result<Option<CartAggregate>> {
        Ok(self.inner.read().await.carts.get(user).cloned())
    }

    async fn update_cart(
        &self,
        user: &UserId,
        update: &CartUpdate,
        now: DateTime<Utc>,
    ) -> Result<CartAggregate> {
        let mut inner = self.inner.write().await;
        let cart = inner
            .carts
            .entry(user.clone())
            .or_insert_with(|| CartAggregate::empty(user.clone(), now));
        cart.recalculate();
        update.apply(cart, now);
        Ok(cart.clone())
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.inner
            .write()
            .await
            .orders
            .insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, customer: Option<CustomerNumber>) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<_> = inner
            .orders
            .values()
            .filter(|o| customer.is_none_or(|c| o.customer() == c))
            .cloned()
            .collect();
        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at()));
        Ok(orders)
    }

    async fn update_order(
        &self,
        id: OrderId,
        update: OrderUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let mut inner = self.inner.write().await;
        Ok(inner.orders.get_mut(&id).map(|order| {
            update.apply(order, now);
            order.clone()
        }))
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        Ok(self.inner.write().await.orders.remove(&id).is_some())
    }

    async fn mark_inventory_reconciled(&self, id: OrderId, at: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .orders
            .get_mut(&id)
            .is_some_and(|order| order.mark_reconciled(at)))
    }

    async fn upsert_payment(&self, record: &PaymentRecord) -> Result<()> {
        self.inner
            .write()
            .await
            .payments
            .insert(record.txn_ref.clone(), record.clone());
        Ok(())
    }

    async fn settle_payment(
        &self,
        ret: &GatewayReturn,
        now: DateTime<Utc>,
    ) -> Result<PaymentSettlement> {
        let mut inner = self.inner.write().await;
        let Some(record) = inner.payments.get_mut(&ret.txn_ref) else {
            return Ok(PaymentSettlement::NotFound);
        };
        Ok(match record.apply_return(ret, now) {
            Some(_) => PaymentSettlement::Settled(record.clone()),
            None => PaymentSettlement::AlreadySettled(record.clone()),
        })
    }

    async fn get_payment(&self, txn_ref: &str) -> Result<Option<PaymentRecord>> {
        Ok(self.inner.read().await.payments.get(txn_ref).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, NewCartItem, NewOrder, OrderStatus, PaymentStatus, StockVariant};

    fn order_for(customer: i64, at: DateTime<Utc>) -> Order {
        Order::place(OrderId::new(), CustomerNumber::new(customer), NewOrder::default(), at)
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_orders_filters_and_sorts_newest_first() {
        let store = InMemoryStore::new();
        let t0 = Utc::now();
        let older = order_for(1, t0 - chrono::Duration::minutes(5));
        let newer = order_for(1, t0);
        let other = order_for(2, t0 - chrono::Duration::minutes(1));
        for o in [&older, &newer, &other] {
            store.insert_order(o).await.unwrap();
        }

        let mine = store.list_orders(Some(CustomerNumber::new(1))).await.unwrap();
        assert_eq!(
            mine.iter().map(Order::id).collect::<Vec<_>>(),
            vec![newer.id(), older.id()]
        );

        let all = store.list_orders(None).await.unwrap();
        assert_eq!(
            all.iter().map(Order::id).collect::<Vec<_>>(),
            vec![newer.id(), other.id(), older.id()]
        );
    }

    #[tokio::test]
    async fn test_update_order_missing_returns_none() {
        let store = InMemoryStore::new();
        let result = store
            .update_order(OrderId::new(), OrderUpdate::Status(OrderStatus::Shipping), Utc::now())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_order_preserves_reconciliation_marker() {
        let store = InMemoryStore::new();
        let order = order_for(1, Utc::now());
        store.insert_order(&order).await.unwrap();

        assert!(store.mark_inventory_reconciled(order.id(), Utc::now()).await.unwrap());
        let updated = store
            .update_order(order.id(), OrderUpdate::Status(OrderStatus::Pending), Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert!(updated.is_reconciled());
        assert!(!store.mark_inventory_reconciled(order.id(), Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_reconciled_on_missing_order() {
        let store = InMemoryStore::new();
        assert!(!store.mark_inventory_reconciled(OrderId::new(), Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_decrement_variant_outcomes() {
        let store = InMemoryStore::new();
        let product = Product::new("P1", "Helmet", Money::from_units(100))
            .with_variant(StockVariant::new("red", "M", 5));
        store.upsert_product(&product).await.unwrap();

        let id = ProductId::new("P1");
        match store.decrement_variant(&id, "red", "M", 3).await.unwrap() {
            DecrementResult::Applied(d) => assert_eq!(d.remaining, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            store.decrement_variant(&id, "blue", "M", 1).await.unwrap(),
            DecrementResult::VariantNotFound
        );
        assert_eq!(
            store
                .decrement_variant(&ProductId::new("P2"), "red", "M", 1)
                .await
                .unwrap(),
            DecrementResult::ProductNotFound
        );
    }

    #[tokio::test]
    async fn test_upsert_product_replaces_in_place() {
        let store = InMemoryStore::new();
        store
            .upsert_product(&Product::new("P1", "Helmet", Money::from_units(100)))
            .await
            .unwrap();
        store
            .upsert_product(&Product::new("P2", "Visor", Money::from_units(20)))
            .await
            .unwrap();
        store
            .upsert_product(&Product::new("P1", "Helmet v2", Money::from_units(120)))
            .await
            .unwrap();

        let products = store.list_products().await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Helmet v2");
    }

    #[tokio::test]
    async fn test_list_products_sorts_numeric_ids() {
        let store = InMemoryStore::new();
        for id in ["10", "2", "1"] {
            store
                .upsert_product(&Product::new(id, "Helmet", Money::from_units(100)))
                .await
                .unwrap();
        }

        let ids: Vec<String> = store
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id.to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
    }

    #[tokio::test]
    async fn test_update_and_delete_product() {
        let store = InMemoryStore::new();
        store
            .upsert_product(&Product::new("1", "Helmet", Money::from_units(100)))
            .await
            .unwrap();
        let patch = ProductPatch {
            price: Some(Money::from_units(90)),
            ..Default::default()
        };

        let updated = store
            .update_product(&ProductId::new("1"), &patch, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.price, Money::from_units(90));
        assert_eq!(updated.name, "Helmet");
        assert!(
            store
                .update_product(&ProductId::new("2"), &patch, Utc::now())
                .await
                .unwrap()
                .is_none()
        );

        assert!(store.delete_product(&ProductId::new("1")).await.unwrap());
        assert!(!store.delete_product(&ProductId::new("1")).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cart_adds_keep_every_line() {
        let store = InMemoryStore::new();
        let user = UserId::new("u1");

        let mut handles = Vec::new();
        for i in 0..100 {
            let store = store.clone();
            let user = user.clone();
            handles.push(tokio::spawn(async move {
                let now = Utc::now();
                let item = NewCartItem {
                    product_id: Some(format!("P{i}")),
                    quantity: Some(1),
                    price: Some(Money::from_units(10)),
                    ..Default::default()
                }
                .validate(now)
                .unwrap();
                store.update_cart(&user, &CartUpdate::Add(item), now).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let cart = store.get_cart(&user).await.unwrap().unwrap();
        assert_eq!(cart.item_count(), 100);
        assert_eq!(cart.total_price(), Money::from_units(1000));
    }

    #[tokio::test]
    async fn test_settle_payment_only_once() {
        let store = InMemoryStore::new();
        let record = PaymentRecord::pending(OrderId::new(), Money::from_units(300), "", Utc::now());
        store.upsert_payment(&record).await.unwrap();

        let ret = |code: &str| GatewayReturn {
            txn_ref: record.txn_ref.clone(),
            response_code: code.to_string(),
            transaction_no: format!("T{code}"),
            ..Default::default()
        };

        let first = store.settle_payment(&ret("00"), Utc::now()).await.unwrap();
        assert!(matches!(first, PaymentSettlement::Settled(ref r) if r.status == PaymentStatus::Completed));

        let replay = store.settle_payment(&ret("51"), Utc::now()).await.unwrap();
        let PaymentSettlement::AlreadySettled(stored) = replay else {
            panic!("expected already settled, got {replay:?}");
        };
        assert_eq!(stored.status, PaymentStatus::Completed);
        assert_eq!(stored.transaction_no.as_deref(), Some("T00"));

        let missing = GatewayReturn {
            txn_ref: "unknown".to_string(),
            ..Default::default()
        };
        assert_eq!(
            store.settle_payment(&missing, Utc::now()).await.unwrap(),
            PaymentSettlement::NotFound
        );
    }
}
