use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerNumber, OrderId, ProductId, UserId};
use domain::{CartAggregate, GatewayReturn, Order, PaymentRecord, Product, ProductPatch, User};
use sqlx::types::Json;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    Result,
    store::{CartUpdate, DecrementResult, OrderUpdate, PaymentSettlement, Store},
};

/// PostgreSQL-backed document store.
///
/// Each collection is a table of JSONB documents. Read-modify-write
/// operations lock the row with `SELECT ... FOR UPDATE` inside a
/// transaction so they stay atomic per document.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let doc: Option<Json<User>> = sqlx::query_scalar("SELECT doc FROM users WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(|Json(u)| u))
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(user.id.as_str())
        .bind(Json(user))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        // Same order as `domain::listing_order`: numeric ids numerically, then text.
        let docs: Vec<Json<Product>> = sqlx::query_scalar(
            "SELECT doc FROM products \
             ORDER BY id !~ '^[0-9]+$', \
                      CASE WHEN id ~ '^[0-9]+$' THEN id::numeric END, \
                      id COLLATE \"C\"",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(docs.into_iter().map(|Json(p)| p).collect())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let doc: Option<Json<Product>> =
            sqlx::query_scalar("SELECT doc FROM products WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(doc.map(|Json(p)| p))
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(product.id.as_str())
        .bind(Json(product))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: &ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Product>> {
        let mut tx = self.pool.begin().await?;

        let doc: Option<Json<Product>> =
            sqlx::query_scalar("SELECT doc FROM products WHERE id = $1 FOR UPDATE")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(Json(mut product)) = doc else {
            return Ok(None);
        };
        patch.apply(&mut product, now);

        sqlx::query("UPDATE products SET doc = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(Json(&product))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(product))
    }

    async fn delete_product(&self, id: &ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn decrement_variant(
        &self,
        id: &ProductId,
        color: &str,
        size: &str,
        quantity: u32,
    ) -> Result<DecrementResult> {
        let mut tx = self.pool.begin().await?;

        let doc: Option<Json<Product>> =
            sqlx::query_scalar("SELECT doc FROM products WHERE id = $1 FOR UPDATE")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(Json(mut product)) = doc else {
            return Ok(DecrementResult::ProductNotFound);
        };
        let Some(decrement) = product.decrement_variant(color, size, quantity, Utc::now()) else {
            return Ok(DecrementResult::VariantNotFound);
        };

        sqlx::query("UPDATE products SET doc = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(Json(&product))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(DecrementResult::Applied(decrement))
    }

    async fn get_cart(&self, user: &UserId) -> Result<Option<CartAggregate>> {
        let doc: Option<Json<CartAggregate>> =
            sqlx::query_scalar("SELECT doc FROM carts WHERE user_id = $1")
                .bind(user.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(doc.map(|Json(c)| c))
    }

    async fn update_cart(
        &self,
        user: &UserId,
        update: &CartUpdate,
        now: DateTime<Utc>,
    ) -> Result<CartAggregate> {
        let mut tx = self.pool.begin().await?;

        // Create the row first so concurrent first writes serialize on its lock.
        sqlx::query(
            "INSERT INTO carts (user_id, doc) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user.as_str())
        .bind(Json(CartAggregate::empty(user.clone(), now)))
        .execute(&mut *tx)
        .await?;

        let Json(mut cart): Json<CartAggregate> =
            sqlx::query_scalar("SELECT doc FROM carts WHERE user_id = $1 FOR UPDATE")
                .bind(user.as_str())
                .fetch_one(&mut *tx)
                .await?;
        cart.recalculate();
        update.apply(&mut cart, now);

        sqlx::query("UPDATE carts SET doc = $2 WHERE user_id = $1")
            .bind(user.as_str())
            .bind(Json(&cart))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(cart)
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, customer_number, created_at, doc) VALUES ($1, $2, $3, $4)",
        )
        .bind(order.id().as_uuid())
        .bind(order.customer().get())
        .bind(order.created_at())
        .bind(Json(order))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let doc: Option<Json<Order>> = sqlx::query_scalar("SELECT doc FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc.map(|Json(o)| o))
    }

    async fn list_orders(&self, customer: Option<CustomerNumber>) -> Result<Vec<Order>> {
        let docs: Vec<Json<Order>> = match customer {
            Some(c) => {
                sqlx::query_scalar(
                    "SELECT doc FROM orders WHERE customer_number = $1 ORDER BY created_at DESC",
                )
                .bind(c.get())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT doc FROM orders ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(docs.into_iter().map(|Json(o)| o).collect())
    }

    async fn update_order(
        &self,
        id: OrderId,
        update: OrderUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let mut tx = self.pool.begin().await?;

        let doc: Option<Json<Order>> =
            sqlx::query_scalar("SELECT doc FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(Json(mut order)) = doc else {
            return Ok(None);
        };
        update.apply(&mut order, now);

        sqlx::query("UPDATE orders SET doc = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(Json(&order))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(order))
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_inventory_reconciled(&self, id: OrderId, at: DateTime<Utc>) -> Result<bool> {
        // `->>` yields NULL for both a missing key and a JSON null.
        let result = sqlx::query(
            "UPDATE orders \
             SET doc = jsonb_set(doc, '{inventoryReconciledAt}', $2) \
             WHERE id = $1 AND doc->>'inventoryReconciledAt' IS NULL",
        )
        .bind(id.as_uuid())
        .bind(Json(at))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn upsert_payment(&self, record: &PaymentRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO payments (txn_ref, order_id, doc) VALUES ($1, $2, $3) \
             ON CONFLICT (txn_ref) DO UPDATE SET order_id = EXCLUDED.order_id, doc = EXCLUDED.doc",
        )
        .bind(&record.txn_ref)
        .bind(record.order_id.as_uuid())
        .bind(Json(record))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn settle_payment(
        &self,
        ret: &GatewayReturn,
        now: DateTime<Utc>,
    ) -> Result<PaymentSettlement> {
        let mut tx = self.pool.begin().await?;

        let doc: Option<Json<PaymentRecord>> =
            sqlx::query_scalar("SELECT doc FROM payments WHERE txn_ref = $1 FOR UPDATE")
                .bind(&ret.txn_ref)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(Json(mut record)) = doc else {
            return Ok(PaymentSettlement::NotFound);
        };
        if record.apply_return(ret, now).is_none() {
            return Ok(PaymentSettlement::AlreadySettled(record));
        }

        sqlx::query("UPDATE payments SET doc = $2 WHERE txn_ref = $1")
            .bind(&ret.txn_ref)
            .bind(Json(&record))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(PaymentSettlement::Settled(record))
    }

    async fn get_payment(&self, txn_ref: &str) -> Result<Option<PaymentRecord>> {
        let doc: Option<Json<PaymentRecord>> =
            sqlx::query_scalar("SELECT doc FROM payments WHERE txn_ref = $1")
                .bind(txn_ref)
                .fetch_optional(&self.pool)
                .await?;
        Ok(doc.map(|Json(p)| p))
    }
}
