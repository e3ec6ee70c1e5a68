//! Router tests over the in-memory store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use clubmart_storefront::config::ClubmartConfig;
use clubmart_storefront::db::MemoryStore;
use clubmart_storefront::state::AppState;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(ClubmartConfig::default(), store.clone());
        Self {
            router: clubmart_storefront::app(state),
            store,
        }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    async fn create_product(&self, id: &str, price: i64) -> Value {
        let (status, body) = self
            .post(
                "/api/products",
                json!({
                    "productId": id,
                    "name": format!("Product {id}"),
                    "price": price,
                    "image": "https://img.example.com/p.png",
                    "description": "Club merch",
                    "link": "https://example.com/p",
                    "developer": "Design Team"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    async fn register(&self, email: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/auth/register",
                json!({ "email": email, "name": "A", "password": "1234" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

#[tokio::test]
async fn test_health_reports_store_state() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert!(body["timestamp"].is_string());

    app.store.set_available(false);
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_catalog_price_window() {
    let app = TestApp::new();
    for (id, price) in [("a", 50), ("b", 120), ("c", 150), ("d", 180), ("e", 250)] {
        app.create_product(id, price).await;
    }

    let (status, body) = app
        .get("/api/products?minPrice=100&maxPrice=200&sortBy=price&sortOrder=asc")
        .await;
    assert_eq!(status, StatusCode::OK);
    let prices: Vec<f64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["price"].as_f64().unwrap())
        .collect();
    assert_eq!(prices, vec![120.0, 150.0, 180.0]);
    assert_eq!(body["count"], 3);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_catalog_paging_metadata() {
    let app = TestApp::new();
    for i in 0..5 {
        app.create_product(&format!("p{i}"), 10).await;
    }

    let (_, body) = app.get("/api/products?page=2&limit=2").await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["total"], 5);
    assert_eq!(body["page"], 2);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["hasNextPage"], true);
    assert_eq!(body["hasPrevPage"], true);

    // Garbage falls back to defaults
    let (status, body) = app.get("/api/products?page=abc&limit=-4&sortBy=nope").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["count"], 5);
}

#[tokio::test]
async fn test_create_reports_every_bad_field() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/products",
            json!({
                "name": "Mug",
                "price": -1,
                "image": "https://img.example.com/mug.png",
                "description": "Mug",
                "link": "ftp://x"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["developer", "price", "link"]);
}

#[tokio::test]
async fn test_create_accepts_zero_price_and_generates_id() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/products",
            json!({
                "name": "Sticker",
                "price": "0",
                "image": "https://img.example.com/s.png",
                "description": "Free",
                "link": "https://x",
                "developer": "Club"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["price"].as_f64(), Some(0.0));
    assert_eq!(body["data"]["id"].as_str().unwrap().len(), 32);
}

#[tokio::test]
async fn test_duplicate_product_id_is_conflict() {
    let app = TestApp::new();
    app.create_product("hoodie", 35).await;
    let (status, body) = app
        .post(
            "/api/products",
            json!({
                "productId": "hoodie",
                "name": "Hoodie",
                "price": 35,
                "image": "https://img.example.com/h.png",
                "description": "Warm",
                "link": "https://example.com/h",
                "developer": "Club"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_update_and_delete() {
    let app = TestApp::new();
    app.create_product("hoodie", 35).await;

    let (status, body) = app
        .request(Method::PUT, "/api/products/hoodie", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No data to update");

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/products/hoodie",
            Some(json!({ "price": 40 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"].as_f64(), Some(40.0));

    let (status, body) = app
        .request(Method::DELETE, "/api/products/hoodie", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "hoodie");
    assert_eq!(body["data"]["name"], "Product hoodie");

    let (status, _) = app.get("/api/products/hoodie").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request(Method::DELETE, "/api/products/hoodie", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_products_by_user() {
    let app = TestApp::new();
    let user = app.register("owner@b.com").await;
    let user_id = user["id"].as_str().unwrap();

    let (status, _) = app
        .post(
            "/api/products",
            json!({
                "name": "Owned",
                "price": 1,
                "image": "https://img.example.com/o.png",
                "description": "Owned",
                "link": "https://example.com/o",
                "developer": "Club",
                "createdBy": user_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.create_product("unowned", 2).await;

    let (status, body) = app.get(&format!("/api/products/user/{user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["createdBy"]["email"], "owner@b.com");
    assert_eq!(body["data"][0]["createdBy"]["user_type"], "customer");

    let (status, _) = app.get("/api/products/user/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_login_and_conflict() {
    let app = TestApp::new();
    let user = app.register("a@b.com").await;
    assert_eq!(user["user_type"], "customer");
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());

    let (status, _) = app
        .post(
            "/api/auth/register",
            json!({ "email": "a@b.com", "name": "A", "password": "1234" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .post(
            "/api/auth/login",
            json!({ "email": "A@B.com", "password": "1234" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user["id"]);

    let (status, body) = app
        .post(
            "/api/auth/login",
            json!({ "email": "a@b.com", "password": "wrong" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .get(&format!("/api/users/{}", user["id"].as_str().unwrap()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "a@b.com");
}

#[tokio::test]
async fn test_list_users_paged() {
    let app = TestApp::new();
    for i in 0..3 {
        app.register(&format!("u{i}@b.com")).await;
    }
    let (status, body) = app
        .post(
            "/api/users",
            json!({ "email": "direct@b.com", "name": "D", "password": "1234" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app.get("/api/users?page=2&limit=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);
    assert_eq!(body["count"], 1);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["hasPrevPage"], true);
    assert!(body["data"][0].get("passwordHash").is_none());

    // Newest first
    let (_, body) = app.get("/api/users").await;
    assert_eq!(body["data"][0]["email"], "direct@b.com");
}

#[tokio::test]
async fn test_update_user() {
    let app = TestApp::new();
    let user = app.register("a@b.com").await;
    app.register("taken@b.com").await;
    let uri = format!("/api/users/{}", user["id"].as_str().unwrap());

    let (status, body) = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "email": " New@B.com ", "address": "Seoul" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "User updated");
    assert_eq!(body["data"]["email"], "new@b.com");
    assert_eq!(body["data"]["address"], "Seoul");

    let (status, _) = app
        .request(Method::PUT, &uri, Some(json!({ "email": "taken@b.com" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.request(Method::PUT, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No data to update");

    let (status, body) = app
        .request(Method::PUT, &uri, Some(json!({ "user_type": "admin" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/users/not-a-uuid",
            Some(json!({ "name": "B" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/users/{}", uuid::Uuid::new_v4()),
            Some(json!({ "name": "B" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            "/api/auth/login",
            json!({ "email": "new@b.com", "password": "1234" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_user_orphans_products() {
    let app = TestApp::new();
    let user = app.register("owner@b.com").await;
    let user_id = user["id"].as_str().unwrap();
    let (status, _) = app
        .post(
            "/api/products",
            json!({
                "productId": "owned",
                "name": "Owned",
                "price": 1,
                "image": "https://img.example.com/o.png",
                "description": "Owned",
                "link": "https://example.com/o",
                "developer": "Club",
                "createdBy": user_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/users/{user_id}");
    let (status, body) = app.request(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted");
    assert_eq!(body["data"]["email"], "owner@b.com");

    let (status, body) = app.get("/api/products/owned").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["createdBy"].is_null());

    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.request(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_outage_is_503() {
    let app = TestApp::new();
    app.store.set_available(false);

    let (status, body) = app
        .post(
            "/api/auth/login",
            json!({ "email": "a@b.com", "password": "1234" }),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/products").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_malformed_json_uses_envelope() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/products")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_checkout_flow() {
    let app = TestApp::new();
    let user = app.register("buyer@b.com").await;
    let user_id = user["id"].as_str().unwrap();
    app.create_product("mug", 12).await;

    let (status, body) = app
        .post(
            "/api/orders",
            json!({
                "userId": user_id,
                "items": [{ "productId": "mug", "quantity": 2 }],
                "shippingInfo": { "name": "B", "phone": "010", "email": "buyer@b.com" }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["totalAmount"].as_f64(), Some(24.0));
    let order_id = body["data"]["id"].as_str().unwrap().to_owned();

    let (status, _) = app
        .post(
            &format!("/api/orders/{order_id}/confirm"),
            json!({ "paymentReference": "pay_1", "amount": 20 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .post(
            &format!("/api/orders/{order_id}/confirm"),
            json!({ "paymentReference": "pay_1", "amount": 24 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paid");

    let (status, body) = app.get(&format!("/api/orders?userId={user_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, _) = app
        .post(
            &format!("/api/orders/{order_id}/cancel"),
            json!({ "userId": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_rejects_empty_cart() {
    let app = TestApp::new();
    let user = app.register("buyer@b.com").await;
    let (status, body) = app
        .post(
            "/api/orders",
            json!({
                "userId": user["id"],
                "items": [],
                "shippingInfo": { "name": "B", "phone": "010", "email": "buyer@b.com" }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "items");
}

#[tokio::test]
async fn test_checkout_total_overflow_is_validation_error() {
    let app = TestApp::new();
    let user = app.register("whale@b.com").await;
    let (status, body) = app
        .post(
            "/api/products",
            json!({
                "productId": "big",
                "name": "Big",
                "price": "50000000000000000000000000000",
                "image": "https://img.example.com/big.png",
                "description": "Very expensive",
                "link": "https://example.com/big",
                "developer": "Club"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = app
        .post(
            "/api/orders",
            json!({
                "userId": user["id"],
                "items": [{ "productId": "big", "quantity": 2 }],
                "shippingInfo": { "name": "W", "phone": "010", "email": "whale@b.com" }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["errors"][0]["field"], "items");

    // The server is still answering
    let (status, _) = app.get("/api/products/big").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_envelope_404() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");
}
