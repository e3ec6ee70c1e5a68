//! Orders, cart lines and shipping details.
//!
//! A cart line is the client's snapshot of a product at the time it was
//! added. An order item is the server's snapshot at checkout time, re-read
//! from the catalog. The two share a shape but not a source of truth.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{OrderId, OrderStatus, Price, ProductId, UserId};

/// One line of the client-side cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub image: String,
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity; `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.times(self.quantity)
    }
}

/// One item of a placed order, snapshotted from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub quantity: u32,
}

impl OrderItem {
    /// Unit price times quantity; `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.times(self.quantity)
    }
}

/// Where and to whom an order ships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
}

impl ShippingInfo {
    /// Names of the required contact fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("phone", &self.phone),
            ("email", &self.email),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Copy with every field trimmed.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            email: self.email.trim().to_owned(),
            address: self.address.trim().to_owned(),
            notes: self.notes.trim().to_owned(),
        }
    }
}

/// A product and quantity requested at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub shipping_info: ShippingInfo,
}

/// Body of `POST /api/orders/:id/confirm`.
///
/// Both values come from the hosted payment widget's callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub payment_reference: String,
    pub amount: Price,
}

/// Body of `POST /api/orders/:id/cancel`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// A checkout order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_amount: Price,
    pub shipping_info: ShippingInfo,
    #[serde(default)]
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Sum of `price * quantity` over the items, or `None` when the total
    /// does not fit in a [`Decimal`].
    #[must_use]
    pub fn total_of(items: &[OrderItem]) -> Option<Decimal> {
        items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.line_total()?))
    }

    /// Whether a pending order has passed its expiry.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::Pending && self.expires_at <= now
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, price: &str, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::parse(id).unwrap(),
            name: id.to_owned(),
            price: Price::parse(price).unwrap(),
            image: String::new(),
            quantity,
        }
    }

    #[test]
    fn test_total_of() {
        let items = [item("a", "10.50", 2), item("b", "3", 1)];
        assert_eq!(Order::total_of(&items), Some(Decimal::new(2400, 2)));
        assert_eq!(Order::total_of(&[]), Some(Decimal::ZERO));
    }

    #[test]
    fn test_total_of_overflow() {
        let huge = "50000000000000000000000000000";
        assert_eq!(Order::total_of(&[item("a", huge, 2)]), None);
        // Each line fits, the sum does not
        assert_eq!(Order::total_of(&[item("a", huge, 1), item("b", huge, 1)]), None);
    }

    #[test]
    fn test_missing_shipping_fields() {
        let info = ShippingInfo {
            name: "Kim".to_owned(),
            phone: "  ".to_owned(),
            ..ShippingInfo::default()
        };
        assert_eq!(info.missing_fields(), vec!["phone", "email"]);
    }

    #[test]
    fn test_checkout_request_wire_format() {
        let json = serde_json::json!({
            "userId": "6f1c2a4e-0000-4000-8000-000000000001",
            "items": [{ "productId": "p1", "quantity": 2 }],
            "shippingInfo": { "name": "Kim", "phone": "010", "email": "k@x.io" }
        });
        let req: CheckoutRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.items.len(), 1);
        assert!(req.shipping_info.missing_fields().is_empty());
        assert!(req.shipping_info.address.is_empty());
    }
}
