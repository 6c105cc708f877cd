//! Payment callback handling.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use common::OrderId;
use domain::{GatewayReturn, PaymentRecord, PaymentStatus};
use serde::Deserialize;
use store::{OrderUpdate, PaymentSettlement, Store};

use super::gateway::{PaymentGateway, PaymentRequest};
use crate::inventory::InventoryReconciler;
use crate::{Result, ServiceError};

/// What happens to an order whose gateway payment fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Keep the order as cancelled with a failed payment.
    #[default]
    Cancel,
    /// Delete the order document.
    Delete,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cancel" => Ok(FailurePolicy::Cancel),
            "delete" => Ok(FailurePolicy::Delete),
            other => Err(format!("unknown payment failure policy: {other}")),
        }
    }
}

/// A request for a payment URL.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayment {
    pub order_id: Option<String>,
    pub order_description: Option<String>,
    pub return_url: Option<String>,
}

/// The settled result of a gateway return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReturn {
    pub status: PaymentStatus,
    pub txn_ref: String,
    pub transaction_no: String,
    /// Where to send the customer's browser.
    pub redirect_url: String,
    /// True if the payment had already been settled by an earlier return.
    pub replayed: bool,
}

pub struct PaymentService<S: Store> {
    store: Arc<S>,
    gateway: Arc<dyn PaymentGateway>,
    reconciler: InventoryReconciler<S>,
    policy: FailurePolicy,
    frontend_url: String,
}

impl<S: Store> Clone for PaymentService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            reconciler: self.reconciler.clone(),
            policy: self.policy,
            frontend_url: self.frontend_url.clone(),
        }
    }
}

impl<S: Store> PaymentService<S> {
    pub fn new(
        store: Arc<S>,
        gateway: Arc<dyn PaymentGateway>,
        reconciler: InventoryReconciler<S>,
        policy: FailurePolicy,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            reconciler,
            policy,
            frontend_url: frontend_url.into(),
        }
    }

    /// Builds a signed payment URL for an order and records a pending payment.
    #[tracing::instrument(skip(self, request), fields(order_id = ?request.order_id))]
    pub async fn create_payment_url(&self, request: CreatePayment, client_ip: &str) -> Result<String> {
        let return_url = request
            .return_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ServiceError::Validation("Missing required field: returnUrl".to_string()))?;
        let raw_id = request
            .order_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::Validation("orderId is required".to_string()))?;
        let order_id = OrderId::parse(&raw_id)
            .map_err(|_| ServiceError::Validation(format!("Invalid orderId: {raw_id}")))?;

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;
        if order.payment_status() == PaymentStatus::Completed {
            return Err(ServiceError::Validation(
                "Order has already been paid".to_string(),
            ));
        }

        let now = Utc::now();
        let payment_request = PaymentRequest {
            txn_ref: order_id.to_string(),
            amount: order.total_amount(),
            order_info: request
                .order_description
                .unwrap_or_else(|| format!("Payment for order {order_id}")),
            return_url,
            ip_addr: client_ip.to_string(),
            created_at: now,
        };
        let url = self.gateway.build_payment_url(&payment_request)?;

        let record = PaymentRecord::pending(order_id, order.total_amount(), url.clone(), now);
        self.store.upsert_payment(&record).await?;
        tracing::info!(txn_ref = %record.txn_ref, amount = %record.amount, "payment url created");
        Ok(url)
    }

    /// Settles a gateway return.
    ///
    /// A successful payment confirms the order and reconciles its stock; a
    /// failed one cancels or deletes the order according to the failure
    /// policy. Nothing is mutated if the signature does not verify, and a
    /// return for an already settled payment only reproduces the stored
    /// outcome.
    #[tracing::instrument(skip_all, fields(txn_ref))]
    pub async fn handle_return(&self, params: BTreeMap<String, String>) -> Result<PaymentReturn> {
        if !self.gateway.verify_return(&params) {
            tracing::warn!("gateway return failed signature verification");
            return Err(ServiceError::InvalidSignature);
        }

        let field = |name: &str| params.get(name).cloned().unwrap_or_default();
        let ret = GatewayReturn {
            txn_ref: field("vnp_TxnRef"),
            response_code: field("vnp_ResponseCode"),
            transaction_no: field("vnp_TransactionNo"),
            bank_code: field("vnp_BankCode"),
            pay_date: field("vnp_PayDate"),
        };
        tracing::Span::current().record("txn_ref", ret.txn_ref.as_str());

        let now = Utc::now();
        let record = match self.store.settle_payment(&ret, now).await? {
            PaymentSettlement::NotFound => {
                return Err(ServiceError::NotFound("Payment not found".to_string()));
            }
            PaymentSettlement::AlreadySettled(record) => {
                metrics::counter!("payment_callback_replays_total").increment(1);
                tracing::info!(
                    order_id = %record.order_id,
                    status = %record.status,
                    response_code = %ret.response_code,
                    "payment already settled, return ignored"
                );
                return Ok(self.settled_return(&record, true));
            }
            PaymentSettlement::Settled(record) => record,
        };

        metrics::counter!("payment_callbacks_total", "status" => record.status.as_str())
            .increment(1);
        tracing::info!(order_id = %record.order_id, status = %record.status, "payment return recorded");

        match record.status {
            PaymentStatus::Completed => self.settle_success(record.order_id, now).await?,
            _ => self.settle_failure(record.order_id, now).await?,
        }

        Ok(self.settled_return(&record, false))
    }

    fn settled_return(&self, record: &PaymentRecord, replayed: bool) -> PaymentReturn {
        let transaction_no = record.transaction_no.clone().unwrap_or_default();
        PaymentReturn {
            status: record.status,
            redirect_url: self.redirect_url(record.status, &record.txn_ref, &transaction_no),
            txn_ref: record.txn_ref.clone(),
            transaction_no,
            replayed,
        }
    }

    async fn settle_success(&self, order_id: OrderId, now: chrono::DateTime<Utc>) -> Result<()> {
        let updated = self
            .store
            .update_order(order_id, OrderUpdate::PaymentConfirmed, now)
            .await?;
        if updated.is_none() {
            tracing::warn!(%order_id, "paid order no longer exists");
            return Ok(());
        }
        self.reconciler.decrement(order_id).await?;
        Ok(())
    }

    async fn settle_failure(&self, order_id: OrderId, now: chrono::DateTime<Utc>) -> Result<()> {
        match self.policy {
            FailurePolicy::Cancel => {
                self.store
                    .update_order(order_id, OrderUpdate::PaymentFailed, now)
                    .await?;
                tracing::info!(%order_id, "order cancelled after failed payment");
            }
            FailurePolicy::Delete => {
                let deleted = self.store.delete_order(order_id).await?;
                tracing::info!(%order_id, deleted, "order deleted after failed payment");
            }
        }
        Ok(())
    }

    /// The frontend page a return lands on.
    pub fn redirect_url(&self, status: PaymentStatus, txn_ref: &str, transaction_no: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("status", status.as_str())
            .append_pair("txnRef", txn_ref)
            .append_pair("transactionNo", transaction_no)
            .finish();
        format!(
            "{}/checkout/success?{query}",
            self.frontend_url.trim_end_matches('/')
        )
    }

    #[tracing::instrument(skip(self))]
    pub async fn payment_status(&self, txn_ref: &str) -> Result<PaymentRecord> {
        self.store
            .get_payment(txn_ref)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))
    }
}
