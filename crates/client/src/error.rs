//! Client error types.

use thiserror::Error;

use clubmart_core::FieldError;

use crate::cart::CartError;
use crate::storage::StorageError;

/// Errors surfaced by the API client, session cache and checkout flow.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Base URL cannot carry path segments (e.g. `mailto:`).
    #[error("Unsupported base URL: {0}")]
    UnsupportedUrl(String),

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a failure envelope.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        errors: Vec<FieldError>,
    },

    /// The server answered with something other than the expected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Checkout was started with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status of a server-reported failure.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
