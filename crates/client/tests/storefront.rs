//! Client against an in-process storefront over the in-memory store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use clubmart_client::{
    ApiClient, AppEvent, CartStore, Checkout, ClientError, Credentials, FileStorage, Profile,
    Registration, SessionCache,
};
use clubmart_core::{
    CatalogParams, OrderStatus, PaymentConfirmation, Price, Product, ProductInput, ShippingInfo,
};
use clubmart_storefront::config::ClubmartConfig;
use clubmart_storefront::db::MemoryStore;
use clubmart_storefront::state::AppState;

async fn spawn_server() -> ApiClient {
    let state = AppState::new(ClubmartConfig::default(), Arc::new(MemoryStore::new()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, clubmart_storefront::app(state))
            .await
            .unwrap();
    });
    ApiClient::new(&format!("http://{addr}")).unwrap()
}

fn input(id: &str, price: i64) -> ProductInput {
    serde_json::from_value(json!({
        "productId": id,
        "name": format!("Product {id}"),
        "price": price,
        "image": format!("https://img.example.com/{id}.png"),
        "description": "Club merch",
        "link": format!("https://example.com/{id}"),
        "developer": "Design Team"
    }))
    .unwrap()
}

fn shipping() -> ShippingInfo {
    ShippingInfo {
        name: "Buyer".to_owned(),
        phone: "010-0000-0000".to_owned(),
        email: "buyer@b.com".to_owned(),
        ..ShippingInfo::default()
    }
}

async fn seed(api: &ApiClient) -> (Product, Product) {
    let hoodie = api.create_product(&input("hoodie", 35)).await.unwrap();
    let mug = api.create_product(&input("mug", 12)).await.unwrap();
    (hoodie, mug)
}

#[tokio::test]
async fn test_health_and_catalog() {
    let api = spawn_server().await;
    assert!(api.health().await.unwrap().is_connected());

    seed(&api).await;
    let page = api
        .list_products(&CatalogParams {
            sort_by: Some("price".to_owned()),
            sort_order: Some("asc".to_owned()),
            ..CatalogParams::default()
        })
        .await
        .unwrap();
    let ids: Vec<&str> = page
        .data
        .as_ref()
        .unwrap()
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(ids, vec!["mug", "hoodie"]);
    assert_eq!(page.total, Some(2));

    let deleted = api.delete_product("mug").await.unwrap();
    assert_eq!(deleted.name, "Product mug");
    let err = api.get_product("mug").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_validation_errors_reach_client() {
    let api = spawn_server().await;
    let mut bad = input("bad", 1);
    bad.price = Some(json!(-1));
    bad.link = Some("ftp://x".to_owned());

    match api.create_product(&bad).await.unwrap_err() {
        ClientError::Api { status, errors, .. } => {
            assert_eq!(status, 400);
            let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["price", "link"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_register_then_login_through_session() {
    let api = spawn_server().await;
    let tab = Profile::in_memory().open_tab();
    let session = SessionCache::new(&tab, Arc::new(api.clone()));

    let registration = Registration {
        email: "a@b.com".to_owned(),
        name: "A".to_owned(),
        password: "1234".to_owned(),
        ..Registration::default()
    };
    let user = session.register(&registration).await.unwrap();
    assert!(!session.is_admin());

    let err = session.register(&registration).await.unwrap_err();
    assert_eq!(err.status(), Some(409));

    session.logout().unwrap();
    assert!(session.current().is_none());

    let logged_in = session
        .login(&Credentials {
            email: "A@b.com".to_owned(),
            password: "1234".to_owned(),
        })
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);
    assert_eq!(api.get_user(user.id).await.unwrap().email, user.email);
}

#[tokio::test]
async fn test_checkout_clears_cart_after_payment() {
    let api = spawn_server().await;
    let (hoodie, mug) = seed(&api).await;

    let dir = tempfile::tempdir().unwrap();
    let profile = Profile::new(Arc::new(FileStorage::open(dir.path()).unwrap()));
    let tab = profile.open_tab();
    let other_tab = profile.open_tab();
    let mut other_changes = other_tab.storage_changes();

    let session = SessionCache::new(&tab, Arc::new(api.clone()));
    let user = session
        .register(&Registration {
            email: "buyer@b.com".to_owned(),
            name: "Buyer".to_owned(),
            password: "1234".to_owned(),
            ..Registration::default()
        })
        .await
        .unwrap();

    let cart = CartStore::new(&tab);
    cart.add(&hoodie).unwrap();
    cart.add(&mug).unwrap();
    cart.add(&mug).unwrap();
    assert_eq!(cart.subtotal(), Some(Decimal::from(59)));

    let checkout = Checkout::new(&api, &cart);
    let order = checkout.begin(&user, shipping()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount.amount(), Decimal::from(59));
    assert_eq!(cart.count(), 3);

    let wrong = PaymentConfirmation {
        payment_reference: "pay_1".to_owned(),
        amount: Price::parse("50").unwrap(),
    };
    let err = checkout.complete(order.id, &wrong).await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(cart.count(), 3);

    let mut events = tab.subscribe();
    let paid = checkout
        .complete(
            order.id,
            &PaymentConfirmation {
                payment_reference: "pay_1".to_owned(),
                amount: order.total_amount,
            },
        )
        .await
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.payment_reference.as_deref(), Some("pay_1"));
    assert!(cart.get().is_empty());
    assert_eq!(events.try_recv().unwrap(), AppEvent::CartUpdated);

    // The other tab observed every write, including the final clear
    let mut last = None;
    while let Some(change) = other_changes.try_recv() {
        last = Some(change);
    }
    let last = last.unwrap();
    assert_eq!(last.key, "cart");
    assert_eq!(CartStore::new(&other_tab).count(), 0);

    let orders = api.list_orders(user.id, 1, 10).await.unwrap();
    assert_eq!(orders.total, Some(1));
}

#[tokio::test]
async fn test_empty_cart_does_not_call_server() {
    let api = ApiClient::new("http://127.0.0.1:9").unwrap();
    let tab = Profile::in_memory().open_tab();
    let cart = CartStore::new(&tab);
    let now = chrono::Utc::now();
    let user = clubmart_core::PublicUser {
        id: clubmart_core::UserId::generate(),
        email: clubmart_core::Email::parse("a@b.com").unwrap(),
        name: "A".to_owned(),
        role: clubmart_core::Role::Customer,
        address: None,
        created_at: now,
        updated_at: now,
    };

    let err = Checkout::new(&api, &cart)
        .begin(&user, shipping())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::EmptyCart));
}
