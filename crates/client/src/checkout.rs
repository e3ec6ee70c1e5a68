//! Two-phase checkout from the client side.
//!
//! [`Checkout::begin`] turns the cart into a pending order priced by the
//! server. The hosted payment widget then collects payment for the order's
//! `totalAmount`, and [`Checkout::complete`] reports the widget's result.
//! The cart is only cleared once the server accepts the payment.

use tracing::instrument;

use clubmart_core::{
    CancelRequest, CheckoutRequest, Order, OrderId, PaymentConfirmation, PublicUser,
    ShippingInfo,
};

use crate::api::ApiClient;
use crate::cart::CartStore;
use crate::error::ClientError;

/// Checkout for one tab's cart.
pub struct Checkout<'a> {
    api: &'a ApiClient,
    cart: &'a CartStore,
}

impl<'a> Checkout<'a> {
    #[must_use]
    pub const fn new(api: &'a ApiClient, cart: &'a CartStore) -> Self {
        Self { api, cart }
    }

    /// Create a pending order for the cart's contents.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::EmptyCart` without calling the server when the
    /// cart is empty, or the server's error.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn begin(
        &self,
        user: &PublicUser,
        shipping_info: ShippingInfo,
    ) -> Result<Order, ClientError> {
        let items = self.cart.order_lines();
        if items.is_empty() {
            return Err(ClientError::EmptyCart);
        }
        let order = self
            .api
            .begin_checkout(&CheckoutRequest {
                user_id: user.id,
                items,
                shipping_info,
            })
            .await?;
        tracing::info!(order_id = %order.id, total = %order.total_amount, "Checkout started");
        Ok(order)
    }

    /// Report a completed payment, then empty the cart.
    ///
    /// # Errors
    ///
    /// Returns the server's error, in which case the cart is left untouched.
    #[instrument(skip(self, confirmation))]
    pub async fn complete(
        &self,
        order_id: OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<Order, ClientError> {
        let order = self.api.confirm_order(order_id, confirmation).await?;
        self.cart.clear()?;
        Ok(order)
    }

    /// Give up on a pending order. The cart is kept.
    ///
    /// # Errors
    ///
    /// Returns the server's error.
    pub async fn abandon(&self, order_id: OrderId, user: &PublicUser) -> Result<Order, ClientError> {
        self.api
            .cancel_order(
                order_id,
                &CancelRequest {
                    user_id: Some(user.id),
                },
            )
            .await
    }
}
