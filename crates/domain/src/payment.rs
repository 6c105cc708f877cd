//! Payment gateway transaction records.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::order::PaymentStatus;

/// Fields the gateway reports when the customer returns from checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayReturn {
    pub txn_ref: String,
    pub response_code: String,
    pub transaction_no: String,
    pub bank_code: String,
    pub pay_date: String,
}

/// One gateway payment attempt, keyed by `txn_ref` (the order id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub txn_ref: String,
    pub order_id: OrderId,
    pub amount: Money,
    pub status: PaymentStatus,
    #[serde(default)]
    pub payment_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// A pending record for a freshly built payment URL.
    pub fn pending(
        order_id: OrderId,
        amount: Money,
        payment_url: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            txn_ref: order_id.to_string(),
            order_id,
            amount,
            status: PaymentStatus::Pending,
            payment_url: payment_url.into(),
            transaction_no: None,
            bank_code: None,
            pay_date: None,
            response_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a gateway return has already been recorded.
    pub fn is_settled(&self) -> bool {
        self.status != PaymentStatus::Pending
    }

    /// Applies the gateway's return data to a pending record and returns
    /// the resulting status.
    ///
    /// A record is settled at most once: if it has already left `Pending`
    /// nothing changes and `None` is returned.
    pub fn apply_return(
        &mut self,
        ret: &GatewayReturn,
        now: DateTime<Utc>,
    ) -> Option<PaymentStatus> {
        if self.is_settled() {
            return None;
        }
        self.status = PaymentStatus::from_response_code(&ret.response_code);
        self.transaction_no = Some(ret.transaction_no.clone());
        self.bank_code = Some(ret.bank_code.clone());
        self.pay_date = Some(ret.pay_date.clone());
        self.response_code = Some(ret.response_code.clone());
        self.updated_at = now;
        Some(self.status)
    }
}
