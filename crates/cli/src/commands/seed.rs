//! Catalog seeding from YAML.
//!
//! ```yaml
//! products:
//!   - productId: club-hoodie
//!     name: Club Hoodie
//!     price: 35
//!     image: https://img.example.com/hoodie.png
//!     description: Heavyweight hoodie with the club crest
//!     link: https://example.com/hoodie
//!     developer: Design Team
//! ```
//!
//! Entries use the same fields and rules as `POST /api/products`. The whole
//! file is validated before connecting; products whose id already exists are
//! skipped, so seeding twice is harmless.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use clubmart_core::ProductInput;
use clubmart_storefront::db::Store;
use clubmart_storefront::services::{ProductError, ProductService};

use super::{CliError, connect};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] CliError),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Seeding aborted: {0}")]
    Product(#[from] ProductError),
}

/// Top-level shape of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<ProductInput>,
}

/// Outcome of one seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Parse a seed file.
pub async fn load(path: &Path) -> Result<SeedFile, SeedError> {
    if !path.exists() {
        return Err(SeedError::NotFound(path.display().to_string()));
    }
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Every problem in the file, one message per entry.
pub fn validate(file: &SeedFile) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();

    for (i, input) in file.products.iter().enumerate() {
        let label = input.name.as_deref().unwrap_or("<unnamed>");
        if let Some(id) = input.product_id.as_deref().map(str::trim)
            && !id.is_empty()
            && !seen.insert(id.to_owned())
        {
            problems.push(format!("products[{i}] ({label}): duplicate productId {id}"));
        }
        if let Err(errors) = input.clone().into_new_product() {
            problems.push(format!("products[{i}] ({label}): {errors}"));
        }
    }
    problems
}

/// Insert every product, skipping ids that already exist.
pub async fn insert_all(store: &dyn Store, file: SeedFile) -> Result<SeedSummary, SeedError> {
    let service = ProductService::new(store);
    let mut summary = SeedSummary::default();

    for input in file.products {
        let label = input.name.clone().unwrap_or_default();
        match service.create(input).await {
            Ok(product) => {
                info!(id = %product.id, name = %product.name, "Inserted product");
                summary.inserted += 1;
            }
            Err(ProductError::Conflict(_)) => {
                info!(name = %label, "Product already exists, skipping");
                summary.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(summary)
}

/// `clubmart seed --file <path> [--dry-run]`
pub async fn products(file_path: &str, dry_run: bool) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading products from file");

    let file = load(path).await?;
    info!(products = file.products.len(), "Parsed seed file");

    let problems = validate(&file);
    if !problems.is_empty() {
        error!("Seed file validation failed:");
        for problem in &problems {
            error!("  - {problem}");
        }
        return Err(SeedError::Invalid(problems.len()));
    }
    info!("Seed file validated successfully");

    if dry_run {
        return Ok(());
    }

    let (_, store) = connect().await?;
    let summary = insert_all(&store, file).await?;

    info!("Seeding complete!");
    info!("  Products inserted: {}", summary.inserted);
    info!("  Products skipped (already exist): {}", summary.skipped);
    Ok(())
}
