//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. CORS (answers preflights before anything is traced)
//! 3. `TraceLayer` (`http_request` span)
//! 4. Request ID (recorded on the span above)

pub mod cors;
pub mod request_id;

pub use cors::cors_layer;
pub use request_id::request_id_middleware;
