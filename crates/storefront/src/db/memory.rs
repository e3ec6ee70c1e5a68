//! In-process store with the same semantics as [`PgStore`](super::PgStore).
//!
//! Catalog listings run [`CatalogQuery::run`] over every product, so filter
//! and ordering behaviour is defined in one place. Products keep only the
//! creator's id; the public creator fields are resolved on every read, the
//! same way the Postgres store joins them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use clubmart_core::{
    CatalogQuery, Email, NewProduct, Order, OrderId, OrderStatus, Page, PageInfo, Product,
    ProductId, ProductPatch, PublicUser, UserId,
};

use super::{OrderStore, ProductStore, RepositoryError, Store, UserStore};
use crate::models::{NewOrder, NewUser, UserCredentials, UserUpdate};

#[derive(Debug, Clone)]
struct StoredProduct {
    product: Product,
    creator: Option<UserId>,
}

#[derive(Debug, Default)]
struct Data {
    users: HashMap<UserId, UserCredentials>,
    products: HashMap<ProductId, StoredProduct>,
    orders: HashMap<OrderId, Order>,
}

impl Data {
    fn resolve(&self, stored: &StoredProduct) -> Product {
        let mut product = stored.product.clone();
        product.created_by = stored
            .creator
            .and_then(|id| self.users.get(&id))
            .map(|c| c.user.summary());
        product
    }
}

/// Process-local store.
///
/// [`MemoryStore::set_available`] simulates an outage: while unavailable,
/// [`Store::ping`] fails and every other call returns
/// `RepositoryError::Unavailable`.
#[derive(Debug)]
pub struct MemoryStore {
    data: RwLock<Data>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Data::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Mark the store reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable(
                "memory store marked unavailable".to_owned(),
            ))
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<PublicUser, RepositoryError> {
        self.check()?;
        let mut data = self.data.write().await;
        if data.users.values().any(|c| c.user.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let public = PublicUser {
            id: UserId::generate(),
            email: user.email,
            name: user.name,
            role: user.role,
            address: user.address,
            created_at: now,
            updated_at: now,
        };
        data.users.insert(
            public.id,
            UserCredentials {
                user: public.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(public)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<PublicUser>, RepositoryError> {
        self.check()?;
        let data = self.data.read().await;
        Ok(data.users.get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        self.check()?;
        let data = self.data.read().await;
        Ok(data.users.values().find(|c| &c.user.email == email).cloned())
    }

    async fn list_users(&self, page: u64, limit: u64) -> Result<Page<PublicUser>, RepositoryError> {
        self.check()?;
        let data = self.data.read().await;
        let mut users: Vec<&PublicUser> = data.users.values().map(|c| &c.user).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = users.len() as u64;
        let offset = usize::try_from(page.saturating_sub(1).saturating_mul(limit)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(Page {
            items: users.into_iter().skip(offset).take(take).cloned().collect(),
            info: PageInfo::new(total, page, limit),
        })
    }

    async fn update_user(
        &self,
        id: UserId,
        update: UserUpdate,
    ) -> Result<Option<PublicUser>, RepositoryError> {
        self.check()?;
        let mut data = self.data.write().await;
        if let Some(email) = &update.email
            && data
                .users
                .values()
                .any(|c| c.user.id != id && &c.user.email == email)
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let Some(credentials) = data.users.get_mut(&id) else {
            return Ok(None);
        };
        let user = &mut credentials.user;
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(address) = update.address {
            user.address = address;
        }
        if let Some(password_hash) = update.password_hash {
            credentials.password_hash = password_hash;
        }
        credentials.user.updated_at = Utc::now();
        Ok(Some(credentials.user.clone()))
    }

    async fn delete_user(&self, id: UserId) -> Result<Option<PublicUser>, RepositoryError> {
        self.check()?;
        let mut data = self.data.write().await;
        let Some(removed) = data.users.remove(&id) else {
            return Ok(None);
        };
        // Same effect as ON DELETE SET NULL / CASCADE
        for stored in data.products.values_mut() {
            if stored.creator == Some(id) {
                stored.creator = None;
            }
        }
        data.orders.retain(|_, order| order.user_id != id);
        Ok(Some(removed.user))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self, query: &CatalogQuery) -> Result<Page<Product>, RepositoryError> {
        self.check()?;
        let data = self.data.read().await;
        let products: Vec<Product> = data.products.values().map(|p| data.resolve(p)).collect();
        Ok(query.run(&products))
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        self.check()?;
        let data = self.data.read().await;
        Ok(data.products.get(id).map(|p| data.resolve(p)))
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        self.check()?;
        let data = self.data.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| data.products.get(id))
            .map(|p| data.resolve(p))
            .collect())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        self.check()?;
        let mut data = self.data.write().await;
        if data.products.contains_key(&product.id) {
            return Err(RepositoryError::Conflict(
                "product id already exists".to_owned(),
            ));
        }
        // Mirrors the foreign key: an unknown creator is a constraint error
        if let Some(creator) = product.created_by
            && !data.users.contains_key(&creator)
        {
            return Err(RepositoryError::Conflict("creator does not exist".to_owned()));
        }

        let now = Utc::now();
        let stored = StoredProduct {
            product: Product {
                id: product.id.clone(),
                name: product.name,
                price: product.price,
                image: product.image,
                description: product.description,
                link: product.link,
                developer: product.developer,
                created_by: None,
                created_at: now,
                updated_at: now,
            },
            creator: product.created_by,
        };
        let resolved = data.resolve(&stored);
        data.products.insert(product.id, stored);
        Ok(resolved)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        self.check()?;
        let mut data = self.data.write().await;
        if let Some(creator) = patch.created_by
            && !data.users.contains_key(&creator)
        {
            return Err(RepositoryError::Conflict("creator does not exist".to_owned()));
        }

        let Some(stored) = data.products.get_mut(id) else {
            return Ok(None);
        };
        let product = &mut stored.product;
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(image) = patch.image {
            product.image = image;
        }
        if let Some(description) = patch.description {
            product.description = description;
        }
        if let Some(link) = patch.link {
            product.link = link;
        }
        if let Some(developer) = patch.developer {
            product.developer = developer;
        }
        if patch.created_by.is_some() {
            stored.creator = patch.created_by;
        }
        stored.product.updated_at = Utc::now();

        let stored = stored.clone();
        Ok(Some(data.resolve(&stored)))
    }

    async fn delete_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        self.check()?;
        let mut data = self.data.write().await;
        let removed = data.products.remove(id);
        Ok(removed.map(|p| data.resolve(&p)))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.check()?;
        let mut data = self.data.write().await;
        if !data.users.contains_key(&order.user_id) {
            return Err(RepositoryError::Conflict("user does not exist".to_owned()));
        }

        let now = Utc::now();
        let order = Order {
            id: order.id,
            user_id: order.user_id,
            status: OrderStatus::Pending,
            items: order.items,
            total_amount: order.total_amount,
            shipping_info: order.shipping_info,
            payment_reference: None,
            created_at: now,
            updated_at: now,
            expires_at: order.expires_at,
            paid_at: None,
        };
        data.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.check()?;
        let data = self.data.read().await;
        Ok(data.orders.get(&id).cloned())
    }

    async fn list_orders(
        &self,
        user: UserId,
        page: u64,
        limit: u64,
    ) -> Result<Page<Order>, RepositoryError> {
        self.check()?;
        let data = self.data.read().await;
        let mut orders: Vec<&Order> = data.orders.values().filter(|o| o.user_id == user).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let total = orders.len() as u64;
        let offset = usize::try_from(page.saturating_sub(1).saturating_mul(limit)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(Page {
            items: orders.into_iter().skip(offset).take(take).cloned().collect(),
            info: PageInfo::new(total, page, limit),
        })
    }

    async fn mark_order_paid(
        &self,
        id: OrderId,
        payment_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        self.check()?;
        let mut data = self.data.write().await;
        let Some(order) = data.orders.get_mut(&id) else {
            return Ok(None);
        };
        if order.status != OrderStatus::Pending || order.expires_at <= now {
            return Ok(None);
        }
        order.status = OrderStatus::Paid;
        order.payment_reference = Some(payment_reference.to_owned());
        order.paid_at = Some(now);
        order.updated_at = now;
        Ok(Some(order.clone()))
    }

    async fn cancel_order(
        &self,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        self.check()?;
        let mut data = self.data.write().await;
        let Some(order) = data.orders.get_mut(&id) else {
            return Ok(None);
        };
        if !order.status.can_cancel() {
            return Ok(None);
        }
        order.status = OrderStatus::Cancelled;
        order.updated_at = now;
        Ok(Some(order.clone()))
    }

    async fn expire_pending_orders(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        self.check()?;
        let mut data = self.data.write().await;
        let mut expired = 0;
        for order in data.orders.values_mut().filter(|o| o.is_expired_at(now)) {
            order.status = OrderStatus::Expired;
            order.updated_at = now;
            expired += 1;
        }
        Ok(expired)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use clubmart_core::{CatalogParams, OrderItem, Price, Role, ShippingInfo};

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: Email::parse(email).unwrap(),
            name: "Tester".to_owned(),
            password_hash: "hash".to_owned(),
            role: Role::Customer,
            address: None,
        }
    }

    fn new_product(id: &str, price: i64, created_by: Option<UserId>) -> NewProduct {
        NewProduct {
            id: ProductId::parse(id).unwrap(),
            name: format!("Product {id}"),
            price: Price::new(price.into()).unwrap(),
            image: "https://img.example.com/x.png".to_owned(),
            description: "desc".to_owned(),
            link: "https://example.com".to_owned(),
            developer: "dev".to_owned(),
            created_by,
        }
    }

    fn new_order(user_id: UserId, expires_at: DateTime<Utc>) -> NewOrder {
        NewOrder {
            id: OrderId::generate(),
            user_id,
            items: vec![OrderItem {
                product_id: ProductId::parse("p1").unwrap(),
                name: "p1".to_owned(),
                price: Price::new(10.into()).unwrap(),
                image: String::new(),
                quantity: 1,
            }],
            total_amount: Price::new(10.into()).unwrap(),
            shipping_info: ShippingInfo::default(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@b.com")).await.unwrap();
        let err = store.create_user(new_user("a@b.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_creator_is_expanded_on_read() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("owner@b.com")).await.unwrap();
        store
            .create_product(new_product("p1", 10, Some(user.id)))
            .await
            .unwrap();

        let product = store
            .get_product(&ProductId::parse("p1").unwrap())
            .await
            .unwrap()
            .unwrap();
        let creator = product.created_by.unwrap();
        assert_eq!(creator.id, user.id);
        assert_eq!(creator.email.as_str(), "owner@b.com");
    }

    #[tokio::test]
    async fn test_duplicate_product_id_conflicts() {
        let store = MemoryStore::new();
        store.create_product(new_product("p1", 10, None)).await.unwrap();
        let err = store
            .create_product(new_product("p1", 20, None))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_uses_catalog_query() {
        let store = MemoryStore::new();
        for (i, price) in [50, 120, 150, 180, 250].into_iter().enumerate() {
            store
                .create_product(new_product(&format!("p{i}"), price, None))
                .await
                .unwrap();
        }
        let params = CatalogParams {
            min_price: Some("100".to_owned()),
            max_price: Some("200".to_owned()),
            sort_by: Some("price".to_owned()),
            sort_order: Some("asc".to_owned()),
            ..CatalogParams::default()
        };
        let page = store
            .list_products(&CatalogQuery::from(&params))
            .await
            .unwrap();
        let ids: Vec<_> = page.items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = MemoryStore::new();
        let id = ProductId::parse("ghost").unwrap();
        assert!(
            store
                .update_product(&id, ProductPatch::default())
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.delete_product(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(store.ping().await.unwrap_err().is_unavailable());
        assert!(
            store
                .list_products(&CatalogQuery::default())
                .await
                .unwrap_err()
                .is_unavailable()
        );
        store.set_available(true);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_order_transitions_are_compare_and_set() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("buyer@b.com")).await.unwrap();
        let now = Utc::now();
        let order = store
            .create_order(new_order(user.id, now + Duration::minutes(30)))
            .await
            .unwrap();

        let paid = store.mark_order_paid(order.id, "pay_1", now).await.unwrap();
        assert_eq!(paid.unwrap().status, OrderStatus::Paid);
        assert!(
            store
                .mark_order_paid(order.id, "pay_2", now)
                .await
                .unwrap()
                .is_none()
        );

        let cancelled = store.cancel_order(order.id, now).await.unwrap().unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(store.cancel_order(order.id, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expire_pending_orders() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("late@b.com")).await.unwrap();
        let now = Utc::now();
        let stale = store
            .create_order(new_order(user.id, now - Duration::minutes(1)))
            .await
            .unwrap();
        let fresh = store
            .create_order(new_order(user.id, now + Duration::minutes(30)))
            .await
            .unwrap();

        assert_eq!(store.expire_pending_orders(now).await.unwrap(), 1);
        let stale = store.get_order(stale.id).await.unwrap().unwrap();
        assert_eq!(stale.status, OrderStatus::Expired);
        assert!(store.mark_order_paid(stale.id, "late", now).await.unwrap().is_none());
        let fresh = store.get_order(fresh.id).await.unwrap().unwrap();
        assert_eq!(fresh.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_user_email_conflict() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user("a@b.com")).await.unwrap();
        store.create_user(new_user("c@d.com")).await.unwrap();

        let err = store
            .update_user(
                a.id,
                UserUpdate {
                    email: Some(Email::parse("c@d.com").unwrap()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Keeping one's own email is not a conflict
        let updated = store
            .update_user(
                a.id,
                UserUpdate {
                    email: Some(Email::parse("a@b.com").unwrap()),
                    name: Some("Renamed".to_owned()),
                    address: Some(Some("Seoul".to_owned())),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.address.as_deref(), Some("Seoul"));

        let missing = store
            .update_user(UserId::generate(), UserUpdate::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_user_orphans_products_and_drops_orders() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("owner@b.com")).await.unwrap();
        store
            .create_product(new_product("p1", 10, Some(user.id)))
            .await
            .unwrap();
        let order = store
            .create_order(new_order(user.id, Utc::now() + Duration::minutes(30)))
            .await
            .unwrap();

        let removed = store.delete_user(user.id).await.unwrap().unwrap();
        assert_eq!(removed.id, user.id);
        assert!(store.delete_user(user.id).await.unwrap().is_none());

        let product = store
            .get_product(&ProductId::parse("p1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(product.created_by.is_none());
        assert!(store.get_order(order.id).await.unwrap().is_none());
        assert!(
            store
                .find_credentials(&Email::parse("owner@b.com").unwrap())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_list_users_pages() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .create_user(new_user(&format!("u{i}@b.com")))
                .await
                .unwrap();
        }
        let page = store.list_users(2, 2).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.info.total, 3);
        assert_eq!(page.info.total_pages, 2);
    }
}
