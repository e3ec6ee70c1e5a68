//! Integration tests for Clubmart.
//!
//! The tests talk to a running storefront over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start a server (the in-memory store is enough)
//! CLUBMART_STORE=memory cargo run -p clubmart-storefront
//!
//! # Run the ignored tests against it
//! CLUBMART_BASE_URL=http://localhost:5000 \
//!     cargo test -p clubmart-integration-tests -- --ignored
//! ```

use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the server under test (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("CLUBMART_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// Email address no earlier run has registered.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@test.clubmart.dev", Uuid::new_v4().simple())
}

/// Product id no earlier run has used.
#[must_use]
pub fn unique_product_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// A complete create-product body.
#[must_use]
pub fn product_body(id: &str, price: f64) -> Value {
    json!({
        "productId": id,
        "name": format!("Test {id}"),
        "price": price,
        "image": "https://img.example.com/test.png",
        "description": "Integration test product",
        "link": "https://example.com/test",
        "developer": "Integration Tests"
    })
}
