//! Order domain types.

use chrono::{DateTime, Utc};

use clubmart_core::{OrderId, OrderItem, Price, ShippingInfo, UserId};

/// A priced, snapshotted order ready to insert as `pending`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Price,
    pub shipping_info: ShippingInfo,
    pub expires_at: DateTime<Utc>,
}
