//! Postgres-backed [`AccessStore`].
//!
//! Lookups and role creation run directly on the pool. Every `begin` opens a
//! separate database transaction owned by the returned [`PgUnitOfWork`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rolegate_access::{AccessStore, PlatformRole, StoreError, UnitOfWork, User};
use rolegate_core::{RoleId, UserId};
use rootcause::Report;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: Option<String>,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self, roles: Vec<PlatformRole>) -> Result<User, StoreError> {
        let id = UserId::from_str(&self.id).map_err(|e| StoreError::Decode {
            details: format!("invalid user id '{}': {}", self.id, e),
        })?;
        Ok(User::with_all_fields(
            id,
            self.username,
            self.email,
            self.first_name,
            self.last_name,
            roles,
            self.created_at,
            self.updated_at,
        ))
    }
}

/// Row type for role queries.
#[derive(FromRow)]
struct RoleRow {
    id: String,
    name: String,
}

impl RoleRow {
    fn try_into_role(self) -> Result<PlatformRole, StoreError> {
        let id = RoleId::from_str(&self.id).map_err(|e| StoreError::Decode {
            details: format!("invalid role id '{}': {}", self.id, e),
        })?;
        Ok(PlatformRole::with_id(id, self.name))
    }
}

fn query_error(e: sqlx::Error) -> StoreError {
    StoreError::Query {
        details: e.to_string(),
    }
}

fn write_error(e: sqlx::Error) -> StoreError {
    StoreError::Write {
        details: e.to_string(),
    }
}

fn transaction_error(e: sqlx::Error) -> StoreError {
    StoreError::Transaction {
        details: e.to_string(),
    }
}

/// Store for console users and roles.
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    /// Creates a new store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn roles_for(&self, user_id: &str) -> Result<Vec<PlatformRole>, Report<StoreError>> {
        let rows: Vec<RoleRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.name
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY ur.position
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        rows.into_iter()
            .map(|row| row.try_into_role().map_err(Report::from))
            .collect()
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> rolegate_core::Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, first_name, last_name, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        match row {
            Some(r) => {
                let roles = self.roles_for(&r.id).await?;
                Ok(Some(r.try_into_user(roles)?))
            }
            None => Ok(None),
        }
    }

    async fn find_role(&self, name: &str) -> rolegate_core::Result<Option<PlatformRole>, StoreError> {
        let row: Option<RoleRow> = sqlx::query_as(
            r#"
            SELECT id, name
            FROM roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_role()?)),
            None => Ok(None),
        }
    }

    async fn add_role(&self, name: &str) -> rolegate_core::Result<PlatformRole, StoreError> {
        // A concurrent login may create the same role; return whichever row won.
        let row: RoleRow = sqlx::query_as(
            r#"
            INSERT INTO roles (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(RoleId::new().to_string())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::RoleCreation {
            role: name.to_string(),
            details: e.to_string(),
        })?;

        Ok(row.try_into_role()?)
    }

    async fn begin(&self) -> rolegate_core::Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await.map_err(transaction_error)?;
        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }
}

/// A single login's database transaction.
pub struct PgUnitOfWork {
    tx: Option<Transaction<'static, Postgres>>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn merge_user(&mut self, user: &User) -> rolegate_core::Result<(), StoreError> {
        let tx = self.tx.as_mut().ok_or_else(StoreError::unit_closed)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username,
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user.id().to_string())
        .bind(user.username())
        .bind(user.email())
        .bind(user.first_name())
        .bind(user.last_name())
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(&mut **tx)
        .await
        .map_err(write_error)?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user.id().to_string())
            .execute(&mut **tx)
            .await
            .map_err(write_error)?;

        for (position, role) in user.roles().iter().enumerate() {
            let position = i32::try_from(position).map_err(|e| StoreError::Write {
                details: e.to_string(),
            })?;
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id, position)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(user.id().to_string())
            .bind(role.id().to_string())
            .bind(position)
            .execute(&mut **tx)
            .await
            .map_err(write_error)?;
        }

        Ok(())
    }

    async fn commit(&mut self) -> rolegate_core::Result<(), StoreError> {
        let tx = self.tx.take().ok_or_else(StoreError::unit_closed)?;
        tx.commit().await.map_err(transaction_error)?;
        Ok(())
    }

    async fn rollback(&mut self) -> rolegate_core::Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(transaction_error)?;
        }
        Ok(())
    }
}
