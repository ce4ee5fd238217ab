//! Order document.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_core::{OrderId, OrderStatus, PaymentStatus, ProductId, UserId};

use super::ShippingAddress;

/// A purchased line, snapshotted at checkout so later catalog edits never change history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// Money breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Paypal,
    CashOnDelivery,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Paypal => "paypal",
            Self::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "paypal" => Ok(Self::Paypal),
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == Some(user_id)
    }

    /// Payment is accepted once, and never for a cancelled order.
    #[must_use]
    pub fn can_pay(&self) -> bool {
        self.payment_status == PaymentStatus::Pending && self.status != OrderStatus::Cancelled
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Compact row for lists and the dashboard.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, payment_status: PaymentStatus) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(1),
            user_id: Some(UserId::new(7)),
            items: vec![OrderItem {
                product_id: ProductId::new(3),
                name: "Mug".to_owned(),
                unit_price: Decimal::new(1200, 2),
                quantity: 2,
                line_total: Decimal::new(2400, 2),
            }],
            shipping_address: ShippingAddress {
                full_name: "Grace Hopper".to_owned(),
                line1: "1 Navy Way".to_owned(),
                line2: None,
                city: "Arlington".to_owned(),
                state: Some("VA".to_owned()),
                postal_code: "22202".to_owned(),
                country: "US".to_owned(),
                phone: None,
            },
            totals: OrderTotals {
                subtotal: Decimal::new(2400, 2),
                shipping: Decimal::new(1000, 2),
                tax: Decimal::new(192, 2),
                total: Decimal::new(3592, 2),
            },
            status,
            payment_method: PaymentMethod::Card,
            payment_status,
            payment_reference: None,
            paid_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_can_pay() {
        assert!(order(OrderStatus::Pending, PaymentStatus::Pending).can_pay());
        assert!(!order(OrderStatus::Processing, PaymentStatus::Paid).can_pay());
        assert!(!order(OrderStatus::Cancelled, PaymentStatus::Pending).can_pay());
    }

    #[test]
    fn test_ownership() {
        let order = order(OrderStatus::Pending, PaymentStatus::Pending);
        assert!(order.is_owned_by(UserId::new(7)));
        assert!(!order.is_owned_by(UserId::new(8)));
    }

    #[test]
    fn test_serializes_totals_inline() {
        let json = serde_json::to_value(order(OrderStatus::Pending, PaymentStatus::Pending)).unwrap();
        assert_eq!(json["total"], "35.92");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["payment_method"], "card");
        assert_eq!(json["items"][0]["line_total"], "24.00");
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("paypal".parse::<PaymentMethod>().unwrap(), PaymentMethod::Paypal);
        assert!("barter".parse::<PaymentMethod>().is_err());
    }
}
