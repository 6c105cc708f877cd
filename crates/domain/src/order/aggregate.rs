//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CustomerNumber, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus};
use crate::money::Money;

/// A purchased line, snapshotted from the cart at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub size: String,
}

impl OrderLine {
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        price: Money,
        quantity: u32,
        color: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            price,
            quantity,
            color: color.into(),
            size: size.into(),
        }
    }

    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Contact and delivery details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub user_id: CustomerNumber,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Customer details as submitted by the client; the owner is always
/// taken from the authenticated principal.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomerInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A checkout payload. Every field is optional and defaulted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub items: Option<Vec<OrderLine>>,
    pub customer_info: Option<NewCustomerInfo>,
    pub total_amount: Option<Money>,
    pub shipping_cost: Option<Money>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

/// An order document.
///
/// Items, customer details and amounts are fixed at creation. Only the
/// status pair, the payment method (when the gateway settles it) and the
/// reconciliation marker change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    items: Vec<OrderLine>,
    customer_info: CustomerInfo,
    total_amount: Money,
    shipping_cost: Money,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    status: OrderStatus,
    #[serde(default)]
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inventory_reconciled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Builds a new pending order owned by `customer` from a checkout payload.
    pub fn place(
        id: OrderId,
        customer: CustomerNumber,
        payload: NewOrder,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let items = payload.items.unwrap_or_default();
        if let Some(line) = items.iter().find(|l| l.quantity == 0) {
            return Err(OrderError::InvalidLineQuantity {
                product_id: line.product_id.to_string(),
            });
        }

        let info = payload.customer_info.unwrap_or_default();
        Ok(Self {
            id,
            order_number: OrderNumber::generate(now),
            items,
            customer_info: CustomerInfo {
                user_id: customer,
                name: info.name.unwrap_or_default(),
                email: info.email.unwrap_or_default(),
                phone: info.phone.unwrap_or_default(),
                address: info.address.unwrap_or_default(),
            },
            total_amount: payload.total_amount.unwrap_or_default(),
            shipping_cost: payload.shipping_cost.unwrap_or_default(),
            payment_method: payload.payment_method.unwrap_or_default(),
            payment_status: payload.payment_status.unwrap_or_default(),
            status: OrderStatus::Pending,
            notes: payload.notes.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            inventory_reconciled_at: None,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }

    pub fn customer_info(&self) -> &CustomerInfo {
        &self.customer_info
    }

    pub fn customer(&self) -> CustomerNumber {
        self.customer_info.user_id
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn inventory_reconciled_at(&self) -> Option<DateTime<Utc>> {
        self.inventory_reconciled_at
    }

    pub fn is_reconciled(&self) -> bool {
        self.inventory_reconciled_at.is_some()
    }

    /// Returns true if moving to `new_status` confirms fulfilment and so
    /// requires stock to be decremented.
    ///
    /// That is a cash-on-delivery order being delivered, or a gateway-paid
    /// order being completed.
    pub fn fulfils_on(&self, new_status: OrderStatus) -> bool {
        (new_status == OrderStatus::Delivered && self.payment_method == PaymentMethod::Cod)
            || (new_status == OrderStatus::Completed
                && self.payment_status == PaymentStatus::Completed)
    }

    /// Sets the status. Any status may follow any other.
    pub fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    /// Records a successful gateway payment.
    pub fn confirm_payment(&mut self, now: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Completed;
        self.payment_method = PaymentMethod::Vnpay;
        self.status = OrderStatus::Confirmed;
        self.updated_at = now;
    }

    /// Records a failed gateway payment and cancels the order.
    pub fn fail_payment(&mut self, now: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Failed;
        self.status = OrderStatus::Cancelled;
        self.updated_at = now;
    }

    /// Stamps the reconciliation marker if it is not already set.
    ///
    /// Returns false when the order had already been reconciled.
    pub fn mark_reconciled(&mut self, now: DateTime<Utc>) -> bool {
        if self.inventory_reconciled_at.is_some() {
            return false;
        }
        self.inventory_reconciled_at = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(method: Option<PaymentMethod>) -> NewOrder {
        NewOrder {
            items: Some(vec![OrderLine::new(
                "P1",
                "Helmet",
                Money::from_units(100),
                3,
                "red",
                "M",
            )]),
            customer_info: Some(NewCustomerInfo {
                name: Some("An".to_string()),
                ..Default::default()
            }),
            total_amount: Some(Money::from_units(300)),
            payment_method: method,
            ..Default::default()
        }
    }

    fn place(method: Option<PaymentMethod>) -> Order {
        Order::place(OrderId::new(), CustomerNumber::new(7), payload(method), Utc::now()).unwrap()
    }

    #[test]
    fn test_place_applies_defaults() {
        let order = Order::place(
            OrderId::new(),
            CustomerNumber::new(7),
            NewOrder::default(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(order.payment_method(), PaymentMethod::Cod);
        assert!(order.shipping_cost().is_zero());
        assert!(order.total_amount().is_zero());
        assert_eq!(order.notes(), "");
        assert!(order.items().is_empty());
        assert!(!order.is_reconciled());
    }

    #[test]
    fn test_place_uses_principal_as_owner() {
        let order = place(None);
        assert_eq!(order.customer(), CustomerNumber::new(7));
        assert_eq!(order.customer_info().name, "An");
        assert!(order.order_number().as_str().starts_with("ORD-"));
    }

    #[test]
    fn test_place_rejects_zero_quantity_line() {
        let mut p = payload(None);
        p.items = Some(vec![OrderLine::new("P1", "", Money::zero(), 0, "", "")]);
        let result = Order::place(OrderId::new(), CustomerNumber::new(1), p, Utc::now());
        assert!(matches!(result, Err(OrderError::InvalidLineQuantity { .. })));
    }

    #[test]
    fn test_cod_delivery_fulfils() {
        let order = place(Some(PaymentMethod::Cod));
        assert!(order.fulfils_on(OrderStatus::Delivered));
        assert!(!order.fulfils_on(OrderStatus::Shipping));
        assert!(!order.fulfils_on(OrderStatus::Completed));
    }

    #[test]
    fn test_gateway_completion_requires_completed_payment() {
        let mut order = place(Some(PaymentMethod::Vnpay));
        assert!(!order.fulfils_on(OrderStatus::Delivered));
        assert!(!order.fulfils_on(OrderStatus::Completed));

        order.confirm_payment(Utc::now());
        assert!(order.fulfils_on(OrderStatus::Completed));
    }

    #[test]
    fn test_any_status_may_follow_any_other() {
        let mut order = place(None);
        order.set_status(OrderStatus::Delivered, Utc::now());
        order.set_status(OrderStatus::Pending, Utc::now());
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn test_confirm_and_fail_payment() {
        let mut order = place(Some(PaymentMethod::Banking));
        order.confirm_payment(Utc::now());
        assert_eq!(order.payment_status(), PaymentStatus::Completed);
        assert_eq!(order.payment_method(), PaymentMethod::Vnpay);
        assert_eq!(order.status(), OrderStatus::Confirmed);

        let mut order = place(Some(PaymentMethod::Vnpay));
        order.fail_payment(Utc::now());
        assert_eq!(order.payment_status(), PaymentStatus::Failed);
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_mark_reconciled_only_once() {
        let mut order = place(None);
        assert!(order.mark_reconciled(Utc::now()));
        assert!(!order.mark_reconciled(Utc::now()));
        assert!(order.is_reconciled());
    }

    #[test]
    fn test_document_uses_camel_case() {
        let order = place(None);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["paymentMethod"], "cod");
        assert_eq!(json["customerInfo"]["userId"], 7);
        assert_eq!(json["items"][0]["productId"], "P1");
        assert!(json.get("inventoryReconciledAt").is_none());

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
