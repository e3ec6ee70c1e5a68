//! The shopping cart, persisted in the tab's profile storage.
//!
//! Stored under `cart` as `{"version": 1, "items": [...]}`. A bare array from
//! older clients is read as version 0 and rewritten in the current format on
//! the next mutation. A value that cannot be read is treated as an empty
//! cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use clubmart_core::{CartLine, OrderLine, Product, ProductId};

use crate::events::{AppEvent, Tab};
use crate::storage::StorageError;

/// Storage key of the cart.
pub const CART_KEY: &str = "cart";

/// Format version written by this client.
pub const CART_VERSION: u32 = 1;

/// Errors from cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Item not in cart: {0}")]
    NotInCart(ProductId),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to encode cart: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct CartDocument<'a> {
    version: u32,
    items: &'a [CartLine],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCart {
    Versioned { version: u32, items: Vec<CartLine> },
    Legacy(Vec<CartLine>),
}

fn decode(raw: &str) -> Option<Vec<CartLine>> {
    match serde_json::from_str::<StoredCart>(raw) {
        Ok(StoredCart::Versioned { version, items }) if version == CART_VERSION => Some(items),
        Ok(StoredCart::Versioned { version, .. }) => {
            tracing::warn!(version, "Ignoring cart with unsupported version");
            None
        }
        Ok(StoredCart::Legacy(items)) => Some(items),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable cart");
            None
        }
    }
}

/// Drop empty lines and fold duplicates into the first occurrence.
fn normalize(items: Vec<CartLine>) -> Vec<CartLine> {
    let mut lines: Vec<CartLine> = Vec::with_capacity(items.len());
    for item in items.into_iter().filter(|i| i.quantity > 0) {
        match lines.iter_mut().find(|l| l.product_id == item.product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
            None => lines.push(item),
        }
    }
    lines
}

/// Cart operations for one tab.
#[derive(Clone)]
pub struct CartStore {
    tab: Tab,
}

impl CartStore {
    #[must_use]
    pub fn new(tab: &Tab) -> Self {
        Self { tab: tab.clone() }
    }

    /// Current lines in insertion order.
    ///
    /// Empty when nothing is stored or the stored value is unreadable.
    #[must_use]
    pub fn get(&self) -> Vec<CartLine> {
        match self.tab.read(CART_KEY) {
            Ok(Some(raw)) => decode(&raw).map(normalize).unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cart");
                Vec::new()
            }
        }
    }

    /// Add one unit of `product`.
    ///
    /// A new line snapshots the product's name, price and image.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be saved.
    pub fn add(&self, product: &Product) -> Result<Vec<CartLine>, CartError> {
        let mut items = self.get();
        match items.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => items.push(CartLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                price: product.price,
                image: product.image.clone(),
                quantity: 1,
            }),
        }
        self.save(&items)?;
        Ok(items)
    }

    /// Set the quantity of an existing line. Zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` if the product has no line, or an error
    /// if the cart cannot be saved.
    pub fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Vec<CartLine>, CartError> {
        if quantity <= 0 {
            return self.remove(product_id);
        }

        let mut items = self.get();
        let line = items
            .iter_mut()
            .find(|l| &l.product_id == product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        self.save(&items)?;
        Ok(items)
    }

    /// Remove a line. Removing an absent product still saves and notifies.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be saved.
    pub fn remove(&self, product_id: &ProductId) -> Result<Vec<CartLine>, CartError> {
        let mut items = self.get();
        items.retain(|l| &l.product_id != product_id);
        self.save(&items)?;
        Ok(items)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be saved.
    pub fn clear(&self) -> Result<(), CartError> {
        self.save(&[])
    }

    /// Total units across all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.get().iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of price times quantity at the snapshotted prices.
    ///
    /// `None` when the sum does not fit in a [`Decimal`]; the server refuses
    /// such a cart at checkout as well.
    #[must_use]
    pub fn subtotal(&self) -> Option<Decimal> {
        self.get()
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.line_total()?))
    }

    /// The cart as checkout lines. The server re-prices them.
    #[must_use]
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.get()
            .into_iter()
            .map(|l| OrderLine {
                product_id: l.product_id,
                quantity: i64::from(l.quantity),
            })
            .collect()
    }

    fn save(&self, items: &[CartLine]) -> Result<(), CartError> {
        let raw = serde_json::to_string(&CartDocument {
            version: CART_VERSION,
            items,
        })?;
        self.tab.write(CART_KEY, raw)?;
        self.tab.emit(AppEvent::CartUpdated);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use clubmart_core::Price;
    use tokio::sync::broadcast::Receiver;

    use super::*;
    use crate::events::Profile;

    fn product(id: &str, price: &str) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::parse(id).unwrap(),
            name: format!("Product {id}"),
            price: Price::parse(price).unwrap(),
            image: format!("https://img.example.com/{id}.png"),
            description: String::new(),
            link: format!("https://example.com/{id}"),
            developer: "Club".to_owned(),
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn drain(rx: &mut Receiver<AppEvent>) -> usize {
        let mut n = 0;
        while rx.try_recv().is_ok() {
            n += 1;
        }
        n
    }

    #[test]
    fn test_add_twice_is_one_line() {
        let tab = Profile::in_memory().open_tab();
        let cart = CartStore::new(&tab);
        let hoodie = product("hoodie", "35");

        cart.add(&hoodie).unwrap();
        let items = cart.add(&hoodie).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].name, "Product hoodie");
        assert_eq!(cart.count(), 2);
        assert_eq!(cart.subtotal(), Some(Decimal::from(70)));
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let tab = Profile::in_memory().open_tab();
        let cart = CartStore::new(&tab);
        let mug = product("mug", "12.5");
        cart.add(&mug).unwrap();
        cart.add(&product("pin", "2")).unwrap();

        let items = cart.set_quantity(&mug.id, 0).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id.as_str(), "pin");
        assert_eq!(cart.get(), items);
    }

    #[test]
    fn test_set_quantity_missing_line() {
        let tab = Profile::in_memory().open_tab();
        let cart = CartStore::new(&tab);
        let missing = ProductId::parse("ghost").unwrap();
        assert!(matches!(
            cart.set_quantity(&missing, 3),
            Err(CartError::NotInCart(_))
        ));
        // Removal path is idempotent
        assert!(cart.set_quantity(&missing, -1).unwrap().is_empty());
    }

    #[test]
    fn test_subtotal_overflow_is_none() {
        let tab = Profile::in_memory().open_tab();
        let cart = CartStore::new(&tab);
        let big = product("big", "50000000000000000000000000000");
        cart.add(&big).unwrap();
        assert_eq!(cart.subtotal(), Some(big.price.amount()));

        cart.add(&big).unwrap();
        assert_eq!(cart.count(), 2);
        assert_eq!(cart.subtotal(), None);
    }

    #[test]
    fn test_set_quantity_overwrites() {
        let tab = Profile::in_memory().open_tab();
        let cart = CartStore::new(&tab);
        let mug = product("mug", "12.5");
        cart.add(&mug).unwrap();
        cart.set_quantity(&mug.id, 4).unwrap();
        assert_eq!(cart.count(), 4);
        assert_eq!(cart.subtotal(), Some(Decimal::from(50)));
        assert_eq!(cart.order_lines()[0].quantity, 4);
    }

    #[test]
    fn test_each_mutation_notifies_once() {
        let tab = Profile::in_memory().open_tab();
        let cart = CartStore::new(&tab);
        let mut events = tab.subscribe();

        cart.add(&product("mug", "1")).unwrap();
        assert_eq!(drain(&mut events), 1);

        cart.clear().unwrap();
        assert_eq!(drain(&mut events), 1);
        assert!(cart.get().is_empty());

        let _ = cart.get();
        let _ = cart.count();
        assert_eq!(drain(&mut events), 0);
    }

    #[test]
    fn test_other_tab_sees_change() {
        let profile = Profile::in_memory();
        let writer = profile.open_tab();
        let reader = profile.open_tab();
        let mut writer_changes = writer.storage_changes();
        let mut reader_changes = reader.storage_changes();
        let mut reader_events = reader.subscribe();

        CartStore::new(&writer).add(&product("mug", "1")).unwrap();

        assert!(writer_changes.try_recv().is_none());
        assert_eq!(reader_changes.try_recv().unwrap().key, CART_KEY);
        assert_eq!(drain(&mut reader_events), 0);
        assert_eq!(CartStore::new(&reader).count(), 1);
    }

    #[test]
    fn test_writes_versioned_document() {
        let tab = Profile::in_memory().open_tab();
        CartStore::new(&tab).add(&product("mug", "3")).unwrap();
        let raw = tab.read(CART_KEY).unwrap().unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["version"], 1);
        assert_eq!(doc["items"][0]["productId"], "mug");
    }

    #[test]
    fn test_reads_legacy_array_and_upgrades() {
        let tab = Profile::in_memory().open_tab();
        tab.write(
            CART_KEY,
            r#"[{"productId":"mug","name":"Mug","price":3,"image":"","quantity":2},
                {"productId":"mug","name":"Mug","price":3,"image":"","quantity":1}]"#
                .to_owned(),
        )
        .unwrap();

        let cart = CartStore::new(&tab);
        assert_eq!(cart.count(), 3);
        assert_eq!(cart.get().len(), 1);

        cart.add(&product("pin", "1")).unwrap();
        let raw = tab.read(CART_KEY).unwrap().unwrap();
        assert!(raw.starts_with(r#"{"version":1"#));
    }

    #[test]
    fn test_corrupt_cart_reads_empty() {
        let tab = Profile::in_memory().open_tab();
        let cart = CartStore::new(&tab);

        tab.write(CART_KEY, "{not json".to_owned()).unwrap();
        assert!(cart.get().is_empty());

        tab.write(CART_KEY, r#"{"version":9,"items":[]}"#.to_owned())
            .unwrap();
        assert!(cart.get().is_empty());

        // A mutation replaces the bad value
        cart.add(&product("mug", "1")).unwrap();
        assert_eq!(cart.count(), 1);
    }
}
