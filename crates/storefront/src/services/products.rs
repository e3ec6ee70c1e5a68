//! Catalog reads and product mutations.
//!
//! Writes check store connectivity first so an outage surfaces as a
//! 503 before any validation work. A `createdBy` that is malformed or names
//! no existing user is dropped with a warning and the write goes ahead.

use thiserror::Error;
use tracing::instrument;

use clubmart_core::{
    CatalogQuery, CreatorFilter, Page, Product, ProductId, ProductInput, UserId,
    ValidationErrors,
};

use crate::db::{RepositoryError, Store};

/// Errors from product operations.
#[derive(Debug, Error)]
pub enum ProductError {
    /// One or more fields failed validation.
    #[error("validation failed")]
    Validation(#[from] ValidationErrors),

    /// No product with that id.
    #[error("product not found")]
    NotFound,

    /// A path user id was not a well-formed id.
    #[error("invalid user id")]
    InvalidUserId,

    /// An update supplied no fields.
    #[error("no data to update")]
    NoUpdates,

    /// Unique constraint violation.
    #[error("{0}")]
    Conflict(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ProductError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Product service over a [`Store`].
pub struct ProductService<'a> {
    store: &'a dyn Store,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// One page of the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &CatalogQuery) -> Result<Page<Product>, ProductError> {
        Ok(self.store.list_products(query).await?)
    }

    /// Products created by one user. Any creator filter in `query` is
    /// replaced; paging and ordering are kept.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::InvalidUserId` if `user_id` is not a user id.
    #[instrument(skip(self))]
    pub async fn list_by_creator(
        &self,
        user_id: &str,
        query: CatalogQuery,
    ) -> Result<Page<Product>, ProductError> {
        let user = UserId::parse(user_id).ok_or(ProductError::InvalidUserId)?;
        let query = CatalogQuery {
            created_by: Some(CreatorFilter::Id(user)),
            ..query
        };
        Ok(self.store.list_products(&query).await?)
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::NotFound` if no product has that id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Product, ProductError> {
        let id = ProductId::parse(id).ok_or(ProductError::NotFound)?;
        self.store
            .get_product(&id)
            .await?
            .ok_or(ProductError::NotFound)
    }

    /// Validate and insert a product.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Validation` listing every bad field.
    /// Returns `ProductError::Conflict` if the product id is taken.
    #[instrument(skip_all, fields(product_id = ?input.product_id))]
    pub async fn create(&self, input: ProductInput) -> Result<Product, ProductError> {
        self.store.ping().await?;

        warn_malformed_creator(&input);
        let mut product = input.into_new_product()?;
        product.created_by = self.existing_creator(product.created_by).await?;

        let product = self.store.create_product(product).await?;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Apply the supplied fields to an existing product.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Validation` listing every bad field.
    /// Returns `ProductError::NoUpdates` if nothing usable was supplied.
    /// Returns `ProductError::NotFound` if no product has that id.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: &str, input: ProductInput) -> Result<Product, ProductError> {
        self.store.ping().await?;

        let id = ProductId::parse(id).ok_or(ProductError::NotFound)?;
        warn_malformed_creator(&input);
        let mut patch = input.into_patch()?;
        patch.created_by = self.existing_creator(patch.created_by).await?;
        if patch.is_empty() {
            return Err(ProductError::NoUpdates);
        }

        let product = self
            .store
            .update_product(&id, patch)
            .await?
            .ok_or(ProductError::NotFound)?;
        tracing::info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// Delete a product, returning what was removed.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::NotFound` if no product has that id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<Product, ProductError> {
        self.store.ping().await?;

        let id = ProductId::parse(id).ok_or(ProductError::NotFound)?;
        let product = self
            .store
            .delete_product(&id)
            .await?
            .ok_or(ProductError::NotFound)?;
        tracing::info!(product_id = %product.id, "Product deleted");
        Ok(product)
    }

    async fn existing_creator(
        &self,
        creator: Option<UserId>,
    ) -> Result<Option<UserId>, ProductError> {
        let Some(id) = creator else {
            return Ok(None);
        };
        if self.store.get_user(id).await?.is_some() {
            Ok(Some(id))
        } else {
            tracing::warn!(created_by = %id, "createdBy names no existing user; ignoring");
            Ok(None)
        }
    }
}

fn warn_malformed_creator(input: &ProductInput) {
    if let Some(raw) = input.malformed_creator() {
        tracing::warn!(created_by = raw, "createdBy is not a valid user id; ignoring");
    }
}
