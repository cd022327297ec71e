//! Storage seam for console users and roles.
//!
//! The host owns persistence. [`AccessStore`] is the slice of its data-access
//! layer the login handler needs: lookups, on-demand role creation, and
//! [`UnitOfWork`]s. Each login opens its own unit of work, so concurrent
//! logins never share staged writes.

use crate::error::StoreError;
use crate::user::{PlatformRole, User};
use async_trait::async_trait;
use rolegate_core::Result;

/// Host data-access layer used during login.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Finds a user by login name.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Finds a platform role by name.
    async fn find_role(&self, name: &str) -> Result<Option<PlatformRole>, StoreError>;

    /// Creates a platform role.
    async fn add_role(&self, name: &str) -> Result<PlatformRole, StoreError>;

    /// Opens a unit of work owned by the caller.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}

/// One pending transaction.
///
/// Once `commit` or `rollback` has run the unit is closed: a further
/// `merge_user` or `commit` fails with `StoreError::Transaction`, and a
/// further `rollback` does nothing.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Stages the user record, including its role list.
    async fn merge_user(&mut self, user: &User) -> Result<(), StoreError>;

    /// Commits the staged writes and closes the unit.
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Discards the staged writes and closes the unit.
    async fn rollback(&mut self) -> Result<(), StoreError>;
}

