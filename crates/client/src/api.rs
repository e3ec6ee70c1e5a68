//! HTTP client for the storefront REST API.
//!
//! Every endpoint answers with the `{ success, data, message }` envelope;
//! failures become [`ClientError::Api`] carrying the server's message and
//! field errors.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;
use url::Url;

use clubmart_core::{
    ApiResponse, CancelRequest, CatalogParams, CheckoutRequest, Order, OrderId,
    PaymentConfirmation, Product, ProductInput, PublicUser, Role, UserId,
};

use crate::error::ClientError;
use crate::session::AuthBackend;

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// What `DELETE /api/products/{id}` reports.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeletedProduct {
    pub id: String,
    pub name: String,
}

/// `GET /api/health` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub database: String,
    pub timestamp: String,
}

impl HealthReport {
    /// Whether the server can reach its store.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.database == "connected"
    }
}

/// Storefront API client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Client for the server at `base_url`, e.g. `http://localhost:5000`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Like [`ApiClient::new`] with a preconfigured `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an http(s) URL.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::UnsupportedUrl(base_url.to_owned()));
        }
        Ok(Self {
            inner: Arc::new(ApiClientInner { http, base }),
        })
    }

    /// The server's base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    /// Build `base/api/<segments>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.inner.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::UnsupportedUrl(self.inner.base.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse API response"
                );
                return Err(ClientError::UnexpectedResponse(e.to_string()));
            }
            Err(_) => {
                return Err(ClientError::Api {
                    status: status.as_u16(),
                    message: format!("HTTP {status}"),
                    errors: Vec::new(),
                });
            }
        };

        if !status.is_success() || !envelope.success {
            tracing::debug!(status = %status, message = ?envelope.message, "API call failed");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("HTTP {status}")),
                errors: envelope.errors,
            });
        }
        Ok(envelope)
    }

    async fn data<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        Self::send(request)
            .await?
            .data
            .ok_or_else(|| ClientError::UnexpectedResponse("response has no data".to_owned()))
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// `GET /api/products` with the given filters. The envelope carries the
    /// paging fields.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        params: &CatalogParams,
    ) -> Result<ApiResponse<Vec<Product>>, ClientError> {
        let mut url = self.endpoint(&["products"])?;
        {
            let mut query = url.query_pairs_mut();
            let pairs = [
                ("page", &params.page),
                ("limit", &params.limit),
                ("search", &params.search),
                ("developer", &params.developer),
                ("createdBy", &params.created_by),
                ("minPrice", &params.min_price),
                ("maxPrice", &params.max_price),
                ("sortBy", &params.sort_by),
                ("sortOrder", &params.sort_order),
            ];
            for (name, value) in pairs {
                if let Some(value) = value {
                    query.append_pair(name, value);
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Self::send(self.inner.http.get(url)).await
    }

    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    pub async fn get_product(&self, id: &str) -> Result<Product, ClientError> {
        let url = self.endpoint(&["products", id])?;
        Self::data(self.inner.http.get(url)).await
    }

    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    pub async fn products_by_user(
        &self,
        user_id: UserId,
    ) -> Result<ApiResponse<Vec<Product>>, ClientError> {
        let url = self.endpoint(&["products", "user", &user_id.to_string()])?;
        Self::send(self.inner.http.get(url)).await
    }

    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope; validation
    /// failures carry per-field errors.
    #[instrument(skip_all)]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ClientError> {
        let url = self.endpoint(&["products"])?;
        Self::data(self.inner.http.post(url).json(input)).await
    }

    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: &str,
        input: &ProductInput,
    ) -> Result<Product, ClientError> {
        let url = self.endpoint(&["products", id])?;
        Self::data(self.inner.http.put(url).json(input)).await
    }

    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &str) -> Result<DeletedProduct, ClientError> {
        let url = self.endpoint(&["products", id])?;
        Self::data(self.inner.http.delete(url)).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    pub async fn get_user(&self, id: UserId) -> Result<PublicUser, ClientError> {
        let url = self.endpoint(&["users", &id.to_string()])?;
        Self::data(self.inner.http.get(url)).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    #[instrument(skip_all, fields(user_id = %request.user_id))]
    pub async fn begin_checkout(&self, request: &CheckoutRequest) -> Result<Order, ClientError> {
        let url = self.endpoint(&["orders"])?;
        Self::data(self.inner.http.post(url).json(request)).await
    }

    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    #[instrument(skip(self, confirmation))]
    pub async fn confirm_order(
        &self,
        id: OrderId,
        confirmation: &PaymentConfirmation,
    ) -> Result<Order, ClientError> {
        let url = self.endpoint(&["orders", &id.to_string(), "confirm"])?;
        Self::data(self.inner.http.post(url).json(confirmation)).await
    }

    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        id: OrderId,
        request: &CancelRequest,
    ) -> Result<Order, ClientError> {
        let url = self.endpoint(&["orders", &id.to_string(), "cancel"])?;
        Self::data(self.inner.http.post(url).json(request)).await
    }

    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    pub async fn get_order(&self, id: OrderId) -> Result<Order, ClientError> {
        let url = self.endpoint(&["orders", &id.to_string()])?;
        Self::data(self.inner.http.get(url)).await
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a failure envelope.
    pub async fn list_orders(
        &self,
        user_id: UserId,
        page: u64,
        limit: u64,
    ) -> Result<ApiResponse<Vec<Order>>, ClientError> {
        let mut url = self.endpoint(&["orders"])?;
        url.query_pairs_mut()
            .append_pair("userId", &user_id.to_string())
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        Self::send(self.inner.http.get(url)).await
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error on transport failure or an unreadable body.
    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        let url = self.endpoint(&["health"])?;
        let response = self.inner.http.get(url).send().await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<PublicUser, ClientError> {
        let url = self.endpoint(&["auth", "login"])?;
        Self::data(self.inner.http.post(url).json(credentials)).await
    }

    #[instrument(skip_all, fields(email = %registration.email))]
    async fn register(&self, registration: &Registration) -> Result<PublicUser, ClientError> {
        let url = self.endpoint(&["auth", "register"])?;
        Self::data(self.inner.http.post(url).json(registration)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_segments() {
        let client = ApiClient::new("http://localhost:5000").unwrap();
        assert_eq!(
            client.endpoint(&["products", "a b"]).unwrap().as_str(),
            "http://localhost:5000/api/products/a%20b"
        );

        let prefixed = ApiClient::new("https://shop.example.com/club/").unwrap();
        assert_eq!(
            prefixed.endpoint(&["health"]).unwrap().as_str(),
            "https://shop.example.com/club/api/health"
        );
    }

    #[test]
    fn test_rejects_non_http_base() {
        assert!(matches!(
            ApiClient::new("mailto:shop@example.com"),
            Err(ClientError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_registration_omits_unset_fields() {
        let body = serde_json::to_value(Registration {
            email: "a@b.com".to_owned(),
            name: "A".to_owned(),
            password: "1234".to_owned(),
            ..Registration::default()
        })
        .unwrap();
        assert!(body.get("user_type").is_none());
        assert!(body.get("address").is_none());
    }
}
