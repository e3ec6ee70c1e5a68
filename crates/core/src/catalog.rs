//! Catalog query semantics.
//!
//! [`CatalogParams`] is the raw query string. [`CatalogQuery`] is the parsed,
//! defaulted form that both stores execute. Parsing never fails: malformed
//! numbers fall back to their defaults, unknown sort fields fall back to
//! `createdAt`, and a malformed `createdBy` turns into a filter that matches
//! nothing.
//!
//! The in-memory store runs [`CatalogQuery::run`] directly; the Postgres store
//! translates the same query into SQL and must agree with it row for row.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::product::Product;
use crate::types::UserId;

/// Default page size for product listings.
pub const DEFAULT_LIMIT: u64 = 20;

/// Largest page size a client may request.
pub const MAX_LIMIT: u64 = 100;

/// Raw catalog query parameters, exactly as they appear in the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub developer: Option<String>,
    pub created_by: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Creator filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorFilter {
    /// Products linked to this user.
    Id(UserId),
    /// The supplied value was not a user id; nothing matches.
    Malformed,
}

/// Sortable product fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Price,
    Name,
    Developer,
}

impl SortField {
    /// Parse a `sortBy` value. Unknown names yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            "price" => Some(Self::Price),
            "name" => Some(Self::Name),
            "developer" => Some(Self::Developer),
            _ => None,
        }
    }

    /// SQL expression to order by.
    ///
    /// Text columns sort case-insensitively in byte order, the same order
    /// [`CatalogQuery::compare`] produces.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "p.created_at",
            Self::UpdatedAt => "p.updated_at",
            Self::Price => "p.price",
            Self::Name => "LOWER(p.name) COLLATE \"C\"",
            Self::Developer => "LOWER(p.developer) COLLATE \"C\"",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            Self::Price => a.price.cmp(&b.price),
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::Developer => a
                .developer
                .to_lowercase()
                .cmp(&b.developer.to_lowercase()),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc` (any case) is ascending; anything else is descending.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    /// SQL keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Parse a positive integer, falling back to `default`.
///
/// A leading run of digits is enough (`"3abc"` is 3), matching how browsers
/// and form libraries commonly coerce numbers.
#[must_use]
pub fn parse_positive(raw: Option<&str>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    let digits: String = raw
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    match digits.parse::<u64>() {
        Ok(n) if n > 0 => n,
        _ => default,
    }
}

fn parse_bound(raw: Option<&str>) -> Option<Decimal> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<Decimal>().ok())
}

fn parse_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// A parsed catalog query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub page: u64,
    pub limit: u64,
    pub search: Option<String>,
    pub developer: Option<String>,
    pub created_by: Option<CreatorFilter>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: SortField,
    pub order: SortOrder,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            search: None,
            developer: None,
            created_by: None,
            min_price: None,
            max_price: None,
            sort: SortField::default(),
            order: SortOrder::default(),
        }
    }
}

impl From<&CatalogParams> for CatalogQuery {
    fn from(params: &CatalogParams) -> Self {
        Self {
            page: parse_positive(params.page.as_deref(), 1),
            limit: parse_positive(params.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT),
            search: parse_text(params.search.as_deref()),
            developer: parse_text(params.developer.as_deref()),
            created_by: parse_text(params.created_by.as_deref()).map(|raw| {
                UserId::parse(&raw).map_or(CreatorFilter::Malformed, CreatorFilter::Id)
            }),
            min_price: parse_bound(params.min_price.as_deref()),
            max_price: parse_bound(params.max_price.as_deref()),
            sort: params
                .sort_by
                .as_deref()
                .and_then(SortField::parse)
                .unwrap_or_default(),
            order: params
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .unwrap_or_default(),
        }
    }
}

impl CatalogQuery {
    /// Rows skipped before this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Whether `product` passes every filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = [&product.name, &product.description, &product.developer]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(developer) = &self.developer
            && !product
                .developer
                .to_lowercase()
                .contains(&developer.to_lowercase())
        {
            return false;
        }

        match self.created_by {
            Some(CreatorFilter::Malformed) => return false,
            Some(CreatorFilter::Id(id)) if product.creator_id() != Some(id) => return false,
            _ => {}
        }

        let price = product.price.amount();
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }

        true
    }

    /// Total order used for listings. Ties break on product id ascending.
    #[must_use]
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = self.sort.compare(a, b);
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    /// Filter, sort and page an in-memory product set.
    #[must_use]
    pub fn run<'a>(&self, products: impl IntoIterator<Item = &'a Product>) -> Page<Product> {
        let mut matched: Vec<&Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        matched.sort_by(|a, b| self.compare(a, b));

        let total = matched.len() as u64;
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        let items = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Page {
            items,
            info: PageInfo::new(total, self.page, self.limit),
        }
    }
}

/// Paging metadata for a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageInfo {
    /// Compute paging metadata. `limit` must be positive.
    #[must_use]
    pub const fn new(total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            total,
            page,
            limit,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

impl<T> Page<T> {
    /// Map every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            info: self.info,
        }
    }
}
