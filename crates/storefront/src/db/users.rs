//! User queries for [`PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use clubmart_core::{Email, Page, PageInfo, PublicUser, Role, UserId};

use super::{PgStore, RepositoryError, UserStore, conflict_on_unique, to_i64};
use crate::models::{NewUser, UserCredentials, UserUpdate};

const USER_COLUMNS: &str = "id, email, name, role, address, password_hash, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    role: Role,
    address: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_credentials(self) -> Result<UserCredentials, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(UserCredentials {
            user: PublicUser {
                id: self.id,
                email,
                name: self.name,
                role: self.role,
                address: self.address,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            password_hash: self.password_hash,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<PublicUser, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO clubmart.users (id, email, name, role, address, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(UserId::generate())
        .bind(user.email.as_str())
        .bind(&user.name)
        .bind(user.role)
        .bind(user.address.as_deref())
        .bind(&user.password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        Ok(row.into_credentials()?.user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<PublicUser>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM clubmart.users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| r.into_credentials().map(|c| c.user))
            .transpose()
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM clubmart.users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(UserRow::into_credentials).transpose()
    }

    async fn list_users(&self, page: u64, limit: u64) -> Result<Page<PublicUser>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clubmart.users")
            .fetch_one(self.pool())
            .await?;

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            r"
            SELECT {USER_COLUMNS} FROM clubmart.users
            ORDER BY created_at DESC, id ASC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(to_i64(limit))
        .bind(to_i64(page.saturating_sub(1).saturating_mul(limit)))
        .fetch_all(self.pool())
        .await?;

        let items = rows
            .into_iter()
            .map(|r| r.into_credentials().map(|c| c.user))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            info: PageInfo::new(u64::try_from(total).unwrap_or_default(), page, limit),
        })
    }

    async fn update_user(
        &self,
        id: UserId,
        update: UserUpdate,
    ) -> Result<Option<PublicUser>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE clubmart.users SET updated_at = now()");
        if let Some(email) = update.email {
            qb.push(", email = ");
            qb.push_bind(email.as_str().to_owned());
        }
        if let Some(name) = update.name {
            qb.push(", name = ");
            qb.push_bind(name);
        }
        if let Some(password_hash) = update.password_hash {
            qb.push(", password_hash = ");
            qb.push_bind(password_hash);
        }
        if let Some(role) = update.role {
            qb.push(", role = ");
            qb.push_bind(role);
        }
        if let Some(address) = update.address {
            qb.push(", address = ");
            qb.push_bind(address);
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(format!(" RETURNING {USER_COLUMNS}"));

        let row: Option<UserRow> = qb
            .build_query_as()
            .fetch_optional(self.pool())
            .await
            .map_err(|e| conflict_on_unique(e, "email already exists"))?;
        row.map(|r| r.into_credentials().map(|c| c.user))
            .transpose()
    }

    async fn delete_user(&self, id: UserId) -> Result<Option<PublicUser>, RepositoryError> {
        // products.created_by is ON DELETE SET NULL, orders cascade
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "DELETE FROM clubmart.users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| r.into_credentials().map(|c| c.user))
            .transpose()
    }
}
