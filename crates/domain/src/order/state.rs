//! Order status, payment status and payment method.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Fulfilment status of an order.
///
/// Administrators may move an order between any two statuses; the only
/// behavior attached to a status change is the inventory reconciliation
/// guard in [`super::Order::fulfils_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipping,
    Delivered,
    /// Closed by an administrator after a gateway-paid order is handed over.
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Returns the status name as it appears in documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipping" => Ok(OrderStatus::Shipping),
            "delivered" => Ok(OrderStatus::Delivered),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

/// Settlement status of an order or a gateway payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    /// Maps a gateway response code: `"00"` is success, anything else is failure.
    pub fn from_response_code(code: &str) -> Self {
        if code == "00" {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    Vnpay,
    Banking,
}

impl PaymentMethod {
    /// Returns true if settlement happens through the payment gateway.
    pub fn is_gateway(&self) -> bool {
        matches!(self, PaymentMethod::Vnpay | PaymentMethod::Banking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cod);
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipping,
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!(matches!(
            "lost".parse::<OrderStatus>(),
            Err(OrderError::UnknownStatus(s)) if s == "lost"
        ));
    }

    #[test]
    fn test_response_code_mapping() {
        assert_eq!(PaymentStatus::from_response_code("00"), PaymentStatus::Completed);
        assert_eq!(PaymentStatus::from_response_code("51"), PaymentStatus::Failed);
        assert_eq!(PaymentStatus::from_response_code(""), PaymentStatus::Failed);
    }

    #[test]
    fn test_payment_method_serialization() {
        assert_eq!(serde_json::to_string(&PaymentMethod::Cod).unwrap(), "\"cod\"");
        let m: PaymentMethod = serde_json::from_str("\"banking\"").unwrap();
        assert!(m.is_gateway());
        assert!(!PaymentMethod::Cod.is_gateway());
    }
}
