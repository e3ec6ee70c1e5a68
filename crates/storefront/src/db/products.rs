//! Product queries for [`PgStore`].
//!
//! Listings are built with `QueryBuilder` so every filter value is bound,
//! never interpolated. The only interpolated SQL comes from
//! [`SortField::column`](clubmart_core::SortField::column) and
//! [`SortOrder::keyword`](clubmart_core::SortOrder::keyword), which are
//! fixed strings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use clubmart_core::{
    CatalogQuery, CreatorSummary, CreatorFilter, Email, NewProduct, Page, PageInfo, Price,
    Product, ProductId, ProductPatch, Role, UserId,
};

use super::{PgStore, ProductStore, RepositoryError, conflict_on_unique, to_i64};

/// Product columns plus the creator's public fields. Expects the product
/// relation to be aliased `p`.
const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.name, p.price, p.image, p.description, p.link, p.developer,
           p.created_at, p.updated_at,
           u.id AS creator_id, u.name AS creator_name,
           u.email AS creator_email, u.role AS creator_role
";

const PRODUCT_JOIN: &str = " LEFT JOIN clubmart.users u ON u.id = p.created_by";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Price,
    image: String,
    description: String,
    link: String,
    developer: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    creator_id: Option<UserId>,
    creator_name: Option<String>,
    creator_email: Option<String>,
    creator_role: Option<Role>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let created_by = match (row.creator_id, row.creator_name, row.creator_email, row.creator_role)
        {
            (Some(id), Some(name), Some(email), Some(role)) => {
                let email = Email::parse(&email).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
                })?;
                Some(CreatorSummary {
                    id,
                    name,
                    email,
                    role,
                })
            }
            _ => None,
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            price: row.price,
            image: row.image,
            description: row.description,
            link: row.link,
            developer: row.developer,
            created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Append the `WHERE` clause for `query`'s filters.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &CatalogQuery) {
    qb.push(" WHERE TRUE");

    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        qb.push(" AND (POSITION(");
        qb.push_bind(needle.clone());
        qb.push(" IN LOWER(p.name)) > 0 OR POSITION(");
        qb.push_bind(needle.clone());
        qb.push(" IN LOWER(p.description)) > 0 OR POSITION(");
        qb.push_bind(needle);
        qb.push(" IN LOWER(p.developer)) > 0)");
    }

    if let Some(developer) = &query.developer {
        qb.push(" AND POSITION(");
        qb.push_bind(developer.to_lowercase());
        qb.push(" IN LOWER(p.developer)) > 0");
    }

    match query.created_by {
        Some(CreatorFilter::Id(id)) => {
            qb.push(" AND p.created_by = ");
            qb.push_bind(id);
        }
        Some(CreatorFilter::Malformed) => {
            qb.push(" AND FALSE");
        }
        None => {}
    }

    if let Some(min) = query.min_price {
        qb.push(" AND p.price >= ");
        qb.push_bind(min);
    }
    if let Some(max) = query.max_price {
        qb.push(" AND p.price <= ");
        qb.push_bind(max);
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn list_products(&self, query: &CatalogQuery) -> Result<Page<Product>, RepositoryError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clubmart.products p");
        push_filters(&mut count_qb, query);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        qb.push(" FROM clubmart.products p");
        qb.push(PRODUCT_JOIN);
        push_filters(&mut qb, query);
        qb.push(format_args!(
            " ORDER BY {} {}, p.id COLLATE \"C\" ASC",
            query.sort.column(),
            query.order.keyword()
        ));
        qb.push(" LIMIT ");
        qb.push_bind(to_i64(query.limit));
        qb.push(" OFFSET ");
        qb.push_bind(to_i64(query.offset()));

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(self.pool()).await?;

        Ok(Page {
            items: into_products(rows)?,
            info: PageInfo::new(
                u64::try_from(total).unwrap_or_default(),
                query.page,
                query.limit,
            ),
        })
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "{PRODUCT_SELECT} FROM clubmart.products p {PRODUCT_JOIN} WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<&str> = ids.iter().map(ProductId::as_str).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{PRODUCT_SELECT} FROM clubmart.products p {PRODUCT_JOIN} WHERE p.id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        into_products(rows)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            WITH p AS (
                INSERT INTO clubmart.products
                    (id, name, price, image, description, link, developer, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            )
            {PRODUCT_SELECT} FROM p {PRODUCT_JOIN}
            "
        ))
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.image)
        .bind(&product.description)
        .bind(&product.link)
        .bind(&product.developer)
        .bind(product.created_by)
        .fetch_one(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "product id already exists"))?;

        Product::try_from(row)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "WITH p AS (UPDATE clubmart.products SET updated_at = now()",
        );
        if let Some(name) = patch.name {
            qb.push(", name = ");
            qb.push_bind(name);
        }
        if let Some(price) = patch.price {
            qb.push(", price = ");
            qb.push_bind(price);
        }
        if let Some(image) = patch.image {
            qb.push(", image = ");
            qb.push_bind(image);
        }
        if let Some(description) = patch.description {
            qb.push(", description = ");
            qb.push_bind(description);
        }
        if let Some(link) = patch.link {
            qb.push(", link = ");
            qb.push_bind(link);
        }
        if let Some(developer) = patch.developer {
            qb.push(", developer = ");
            qb.push_bind(developer);
        }
        if let Some(created_by) = patch.created_by {
            qb.push(", created_by = ");
            qb.push_bind(created_by);
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id.as_str().to_owned());
        qb.push(" RETURNING *) ");
        qb.push(PRODUCT_SELECT);
        qb.push(" FROM p");
        qb.push(PRODUCT_JOIN);

        let row: Option<ProductRow> = qb.build_query_as().fetch_optional(self.pool()).await?;
        row.map(Product::try_from).transpose()
    }

    async fn delete_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            WITH p AS (DELETE FROM clubmart.products WHERE id = $1 RETURNING *)
            {PRODUCT_SELECT} FROM p {PRODUCT_JOIN}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Product::try_from).transpose()
    }
}
