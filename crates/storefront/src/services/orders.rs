//! Two-phase checkout.
//!
//! `begin` records a durable `pending` order priced from the catalog, the
//! hosted payment widget collects the money, and `confirm` flips the order
//! to `paid`. Pending orders that are never confirmed expire; the
//! reconciler sweeps them on startup and on an interval.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::instrument;

use clubmart_core::{
    CancelRequest, CheckoutRequest, FieldError, Order, OrderId, OrderItem, OrderStatus, Page,
    PaymentConfirmation, Price, ProductId, UserId, ValidationErrors,
};

use crate::db::{RepositoryError, Store};
use crate::models::NewOrder;

/// Default page size for a user's order history.
pub const DEFAULT_ORDER_LIMIT: u64 = 10;

/// Errors from checkout operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The checkout request was malformed.
    #[error("invalid checkout request")]
    Validation(ValidationErrors),

    /// A path or query id was not a well-formed id.
    #[error("invalid {0} id")]
    InvalidId(&'static str),

    /// No order with that id.
    #[error("order not found")]
    NotFound,

    /// The ordering user does not exist.
    #[error("user not found")]
    UserNotFound,

    /// The requester does not own the order.
    #[error("order belongs to another user")]
    Forbidden,

    /// The order cannot be cancelled from its current status.
    #[error("order is already {0}")]
    NotCancellable(OrderStatus),

    /// Confirmation was refused: wrong status, expired or amount mismatch.
    #[error("{0}")]
    Conflict(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<ValidationErrors> for OrderError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Checkout service over a [`Store`].
pub struct OrderService<'a> {
    store: &'a dyn Store,
    ttl: Duration,
}

impl<'a> OrderService<'a> {
    /// `ttl` is how long a pending order waits for payment.
    #[must_use]
    pub const fn new(store: &'a dyn Store, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Create a pending order from a cart.
    ///
    /// Names, prices and images are read from the catalog; the client's own
    /// snapshots are never trusted for payment. Repeated lines for the same
    /// product are merged.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` for an empty cart, a non-positive
    /// quantity, an unknown product or missing shipping contact fields.
    /// Returns `OrderError::UserNotFound` if the user does not exist.
    #[instrument(skip_all, fields(user_id = %request.user_id))]
    pub async fn begin(
        &self,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        self.store.ping().await?;

        let mut errors = ValidationErrors::default();
        if request.items.is_empty() {
            errors.push("items", "cart is empty");
        }

        let mut quantities: Vec<(ProductId, u32)> = Vec::new();
        let mut positions: HashMap<ProductId, usize> = HashMap::new();
        for (i, line) in request.items.iter().enumerate() {
            let Some(quantity) = u32::try_from(line.quantity).ok().filter(|q| *q > 0) else {
                errors.push(
                    format!("items[{i}].quantity"),
                    "quantity must be a positive integer",
                );
                continue;
            };
            if let Some(&pos) = positions.get(&line.product_id) {
                quantities[pos].1 = quantities[pos].1.saturating_add(quantity);
            } else {
                positions.insert(line.product_id.clone(), quantities.len());
                quantities.push((line.product_id.clone(), quantity));
            }
        }

        let shipping_info = request.shipping_info.trimmed();
        for field in shipping_info.missing_fields() {
            errors.push(
                format!("shippingInfo.{field}"),
                format!("{field} is required"),
            );
        }

        let ids: Vec<ProductId> = quantities.iter().map(|(id, _)| id.clone()).collect();
        let products: HashMap<ProductId, _> = self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut items = Vec::with_capacity(quantities.len());
        for (id, quantity) in quantities {
            match products.get(&id) {
                Some(product) => items.push(OrderItem {
                    product_id: id,
                    name: product.name.clone(),
                    price: product.price,
                    image: product.image.clone(),
                    quantity,
                }),
                None => errors.push("items", format!("unknown product: {id}")),
            }
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        if self.store.get_user(request.user_id).await?.is_none() {
            return Err(OrderError::UserNotFound);
        }

        let total_amount = Order::total_of(&items)
            .and_then(|total| Price::new(total).ok())
            .ok_or_else(|| {
                OrderError::Validation(ValidationErrors(vec![FieldError::new(
                    "items",
                    "order total is too large",
                )]))
            })?;

        let order = self
            .store
            .create_order(NewOrder {
                id: OrderId::generate(),
                user_id: request.user_id,
                items,
                total_amount,
                shipping_info,
                expires_at: now + self.ttl,
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total_amount,
            expires_at = %order.expires_at,
            "Pending order created"
        );
        Ok(order)
    }

    /// Record the payment widget's confirmation.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist.
    /// Returns `OrderError::Conflict` if the order is not pending, has
    /// expired, or `amount` differs from the order total.
    #[instrument(skip(self, confirmation))]
    pub async fn confirm(
        &self,
        id: &str,
        confirmation: PaymentConfirmation,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        self.store.ping().await?;

        let id = OrderId::parse(id).ok_or(OrderError::InvalidId("order"))?;
        let reference = confirmation.payment_reference.trim();
        if reference.is_empty() {
            return Err(ValidationErrors(vec![FieldError::new(
                "paymentReference",
                "paymentReference is required",
            )])
            .into());
        }

        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if confirmation.amount != order.total_amount {
            tracing::warn!(
                order_id = %id,
                expected = %order.total_amount,
                paid = %confirmation.amount,
                "Payment amount mismatch"
            );
            return Err(OrderError::Conflict(
                "paid amount does not match order total".to_owned(),
            ));
        }

        match self.store.mark_order_paid(id, reference, now).await? {
            Some(order) => {
                tracing::info!(order_id = %order.id, "Order paid");
                Ok(order)
            }
            None => Err(self.refusal(id, now).await?),
        }
    }

    /// Cancel a pending or paid order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` if `request.user_id` is set and does
    /// not own the order.
    /// Returns `OrderError::NotCancellable` if the order is already
    /// cancelled or expired.
    #[instrument(skip(self, request))]
    pub async fn cancel(
        &self,
        id: &str,
        request: CancelRequest,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        self.store.ping().await?;

        let id = OrderId::parse(id).ok_or(OrderError::InvalidId("order"))?;
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if let Some(user) = request.user_id
            && user != order.user_id
        {
            return Err(OrderError::Forbidden);
        }
        if !order.status.can_cancel() {
            return Err(OrderError::NotCancellable(order.status));
        }

        match self.store.cancel_order(id, now).await? {
            Some(order) => {
                tracing::info!(order_id = %order.id, "Order cancelled");
                Ok(order)
            }
            // Lost a race with another transition
            None => {
                let status = self
                    .store
                    .get_order(id)
                    .await?
                    .map_or(OrderStatus::Cancelled, |o| o.status);
                Err(OrderError::NotCancellable(status))
            }
        }
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Order, OrderError> {
        let id = OrderId::parse(id).ok_or(OrderError::InvalidId("order"))?;
        self.store.get_order(id).await?.ok_or(OrderError::NotFound)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidId` if `user_id` is not a user id.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> Result<Page<Order>, OrderError> {
        let user = UserId::parse(user_id).ok_or(OrderError::InvalidId("user"))?;
        Ok(self.store.list_orders(user, page, limit).await?)
    }

    /// Expire every pending order past its deadline.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<u64, OrderError> {
        let expired = self.store.expire_pending_orders(now).await?;
        if expired > 0 {
            tracing::info!(expired, "Expired stale pending orders");
        }
        Ok(expired)
    }

    /// Explain why a compare-and-set payment transition did not apply.
    async fn refusal(&self, id: OrderId, now: DateTime<Utc>) -> Result<OrderError, OrderError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(OrderError::NotFound)?;
        let message = if order.status == OrderStatus::Pending && order.expires_at <= now {
            "order has expired".to_owned()
        } else {
            format!("order is {}", order.status)
        };
        Ok(OrderError::Conflict(message))
    }
}
