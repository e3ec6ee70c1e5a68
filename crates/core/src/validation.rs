//! Field-level validation of product input.
//!
//! Input arrives as loosely typed JSON: prices may be numbers or numeric
//! strings, and any field may be missing, `null` or blank. Validation
//! collects every offending field before failing so a form can highlight all
//! of them at once.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId, UserId};

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://.+").expect("Invalid regex"));

/// Whether `s` looks like an `http(s)` URL.
#[must_use]
pub fn is_http_url(s: &str) -> bool {
    URL_PATTERN.is_match(s)
}

/// One invalid field and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every field error found in one request.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Default)]
#[error("validation failed: {}", summary(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationErrors {
    /// Record a failure for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    /// Whether any field failed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of the offending fields, in the order they were checked.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }

    /// Consume into the list of field errors.
    #[must_use]
    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }
}

/// Raw product fields from a create or update request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// A validated product ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub description: String,
    pub link: String,
    pub developer: String,
    pub created_by: Option<UserId>,
}

/// Validated partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub developer: Option<String>,
    pub created_by: Option<UserId>,
}

impl ProductPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.image.is_none()
            && self.description.is_none()
            && self.link.is_none()
            && self.developer.is_none()
            && self.created_by.is_none()
    }
}

/// Trimmed, non-empty text, or `None`.
fn present(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// A price value that counts as supplied. `null` and blank strings do not.
fn present_price(value: Option<&serde_json::Value>) -> Option<&serde_json::Value> {
    value.filter(|v| match v {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

impl ProductInput {
    /// The supplied `createdBy` value when it is not a well-formed user id.
    ///
    /// Such a value is dropped rather than rejected; callers log it.
    #[must_use]
    pub fn malformed_creator(&self) -> Option<&str> {
        let raw = self.created_by.as_deref()?.trim();
        if raw.is_empty() || UserId::parse(raw).is_some() {
            None
        } else {
            Some(raw)
        }
    }

    fn creator(&self) -> Option<UserId> {
        self.created_by.as_deref().and_then(UserId::parse)
    }

    fn check_url(errors: &mut ValidationErrors, field: &str, value: &str) {
        if !is_http_url(value) {
            errors.push(
                field,
                format!("{field} must be a valid URL starting with http:// or https://"),
            );
        }
    }

    fn check_price(errors: &mut ValidationErrors, value: &serde_json::Value) -> Option<Price> {
        match Price::from_json(value) {
            Ok(price) => Some(price),
            Err(e) => {
                errors.push("price", e.to_string());
                None
            }
        }
    }

    /// Validate as a create request.
    ///
    /// A missing or blank `productId` gets a generated identifier.
    ///
    /// # Errors
    ///
    /// Returns every missing required field and every malformed value.
    pub fn into_new_product(self) -> Result<NewProduct, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let id = match present(self.product_id.as_ref()) {
            None => Some(ProductId::generate()),
            Some(raw) => {
                let id = ProductId::parse(&raw);
                if id.is_none() {
                    errors.push(
                        "productId",
                        format!(
                            "productId must be at most {} characters",
                            ProductId::MAX_LENGTH
                        ),
                    );
                }
                id
            }
        };

        let mut required = |field: &str, value: Option<&String>| {
            let value = present(value);
            if value.is_none() {
                errors.push(field, format!("{field} is required"));
            }
            value
        };
        let name = required("name", self.name.as_ref());
        let image = required("image", self.image.as_ref());
        let description = required("description", self.description.as_ref());
        let link = required("link", self.link.as_ref());
        let developer = required("developer", self.developer.as_ref());

        let price = match present_price(self.price.as_ref()) {
            Some(value) => Self::check_price(&mut errors, value),
            None => {
                errors.push("price", "price is required");
                None
            }
        };

        if let Some(image) = &image {
            Self::check_url(&mut errors, "image", image);
        }
        if let Some(link) = &link {
            Self::check_url(&mut errors, "link", link);
        }

        let created_by = self.creator();
        match (id, name, price, image, description, link, developer) {
            (
                Some(id),
                Some(name),
                Some(price),
                Some(image),
                Some(description),
                Some(link),
                Some(developer),
            ) if errors.is_empty() => Ok(NewProduct {
                id,
                name,
                price,
                image,
                description,
                link,
                developer,
                created_by,
            }),
            _ => Err(errors),
        }
    }

    /// Validate as a partial update.
    ///
    /// Fields that are absent, `null` or blank are skipped. An empty patch is
    /// not an error here; the caller decides how to report it.
    ///
    /// # Errors
    ///
    /// Returns every supplied field whose value is malformed.
    pub fn into_patch(self) -> Result<ProductPatch, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let price = present_price(self.price.as_ref())
            .and_then(|value| Self::check_price(&mut errors, value));

        let image = present(self.image.as_ref());
        if let Some(image) = &image {
            Self::check_url(&mut errors, "image", image);
        }
        let link = present(self.link.as_ref());
        if let Some(link) = &link {
            Self::check_url(&mut errors, "link", link);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ProductPatch {
            name: present(self.name.as_ref()),
            price,
            image,
            description: present(self.description.as_ref()),
            link,
            developer: present(self.developer.as_ref()),
            created_by: self.creator(),
        })
    }
}
