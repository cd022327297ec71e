//! Role assignment for a console user.
//!
//! Assignment replaces the user's role list with the resolved roles, creating
//! platform roles that do not exist yet. A role that cannot be created is
//! recorded as failed and the remaining roles are still processed.

use crate::error::StoreError;
use crate::store::AccessStore;
use crate::user::{PlatformRole, User};
use rootcause::Report;
use serde::Serialize;
use tracing::{error, info, warn};

/// A role that could not be attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAssignment {
    pub role: String,
    pub reason: String,
}

/// Outcome of one assignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentReport {
    assigned: Vec<String>,
    failed: Vec<FailedAssignment>,
}

impl AssignmentReport {
    /// Roles now attached to the user, in order.
    #[must_use]
    pub fn assigned(&self) -> &[String] {
        &self.assigned
    }

    /// Roles that could not be attached.
    #[must_use]
    pub fn failed(&self) -> &[FailedAssignment] {
        &self.failed
    }

    /// Returns true if every requested role was attached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Assigns roles and persists users through an [`AccessStore`].
pub struct RoleAssigner<'a, S: AccessStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: AccessStore + ?Sized> RoleAssigner<'a, S> {
    /// Creates an assigner over a store.
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Clears the user's roles, then attaches each named role in order.
    ///
    /// Missing roles are created on demand. Lookup and creation failures are
    /// recorded per role and never abort the pass.
    pub async fn assign(&self, user: &mut User, role_names: &[String]) -> AssignmentReport {
        let mut report = AssignmentReport::default();
        user.clear_roles();

        for name in role_names {
            let role = match self.find_or_create(name).await {
                Ok(role) => role,
                Err(err) => {
                    error!(
                        username = %user.username(),
                        role = %name,
                        error = %err,
                        "failed to find or create role"
                    );
                    report.failed.push(FailedAssignment {
                        role: name.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            if user.add_role(role) {
                report.assigned.push(name.clone());
            }
        }

        if report.is_complete() {
            info!(
                username = %user.username(),
                roles = ?report.assigned,
                "assigned roles"
            );
        } else {
            warn!(
                username = %user.username(),
                roles = ?report.assigned,
                failed = report.failed.len(),
                "assigned roles with failures"
            );
        }

        report
    }

    /// Stages the user in a fresh unit of work and commits it.
    ///
    /// On failure the unit is rolled back and the error returned. Each call
    /// owns its unit, so concurrent persists never share staged writes.
    ///
    /// # Errors
    ///
    /// Returns the store error from `begin`, `merge_user` or `commit`.
    pub async fn persist(&self, user: &User) -> Result<(), Report<StoreError>> {
        let mut unit = self.store.begin().await.inspect_err(|err| {
            error!(
                username = %user.username(),
                error = %err,
                "failed to open unit of work"
            );
        })?;

        let result = match unit.merge_user(user).await {
            Ok(()) => unit.commit().await,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            error!(
                username = %user.username(),
                error = %err,
                "failed to persist user, rolling back"
            );
            if let Err(rollback_err) = unit.rollback().await {
                error!(error = %rollback_err, "rollback failed");
            }
            return Err(err);
        }

        Ok(())
    }

    async fn find_or_create(&self, name: &str) -> Result<PlatformRole, Report<StoreError>> {
        if let Some(role) = self.store.find_role(name).await? {
            return Ok(role);
        }
        info!(role = %name, "creating missing platform role");
        self.store.add_role(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryStore;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn assign_replaces_existing_roles() {
        let store = InMemoryStore::with_roles(&["Admin", "Viewer"]);
        let mut user = User::new("alice");
        user.add_role(PlatformRole::new("Op"));

        let report = RoleAssigner::new(&store)
            .assign(&mut user, &names(&["Viewer"]))
            .await;

        assert_eq!(report.assigned(), &["Viewer".to_string()]);
        assert!(report.is_complete());
        assert_eq!(user.role_names(), vec!["Viewer"]);
    }

    #[tokio::test]
    async fn assign_creates_missing_roles() {
        let store = InMemoryStore::with_roles(&["Admin"]);
        let mut user = User::new("alice");

        let report = RoleAssigner::new(&store)
            .assign(&mut user, &names(&["Admin", "ProjectA"]))
            .await;

        assert_eq!(report.assigned(), &["Admin".to_string(), "ProjectA".to_string()]);
        assert_eq!(store.role_names(), vec!["Admin", "ProjectA"]);
    }

    #[tokio::test]
    async fn failed_creation_is_reported_and_skipped() {
        let store = InMemoryStore::new();
        store.fail_role_creation("ProjectB");
        let mut user = User::new("alice");

        let report = RoleAssigner::new(&store)
            .assign(&mut user, &names(&["ProjectB", "Viewer"]))
            .await;

        assert_eq!(report.assigned(), &["Viewer".to_string()]);
        assert_eq!(report.failed().len(), 1);
        assert_eq!(report.failed()[0].role, "ProjectB");
        assert!(report.failed()[0].reason.contains("ProjectB"));
        assert_eq!(user.role_names(), vec!["Viewer"]);
    }

    #[tokio::test]
    async fn duplicate_names_attach_once() {
        let store = InMemoryStore::new();
        let mut user = User::new("alice");

        let report = RoleAssigner::new(&store)
            .assign(&mut user, &names(&["Admin", "Admin"]))
            .await;

        assert_eq!(report.assigned(), &["Admin".to_string()]);
        assert_eq!(user.role_names(), vec!["Admin"]);
    }

    #[tokio::test]
    async fn persist_commits() {
        let store = InMemoryStore::new();
        let user = User::new("alice");

        RoleAssigner::new(&store).persist(&user).await.expect("persist");

        assert_eq!(store.commits(), 1);
        assert_eq!(store.rollbacks(), 0);
        assert!(store.user("alice").is_some());
    }

    #[tokio::test]
    async fn persist_rolls_back_and_returns_commit_error() {
        let store = InMemoryStore::new();
        store.fail_commit();
        let user = User::new("alice");

        let err = RoleAssigner::new(&store).persist(&user).await.unwrap_err();

        assert!(err.to_string().contains("commit rejected"));
        assert_eq!(store.rollbacks(), 1);
        assert!(store.user("alice").is_none());
    }

    #[tokio::test]
    async fn persist_rolls_back_on_merge_error() {
        let store = InMemoryStore::new();
        store.fail_merge();

        let err = RoleAssigner::new(&store)
            .persist(&User::new("alice"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("merge rejected"));
        assert_eq!(store.commits(), 0);
        assert_eq!(store.rollbacks(), 1);
    }

    #[tokio::test]
    async fn failed_persist_does_not_discard_another_pending_unit() {
        let store = InMemoryStore::new();
        store.insert_user(User::new("taken"));

        let mut pending = store.begin().await.expect("begin");
        pending
            .merge_user(&User::new("alice"))
            .await
            .expect("stage alice");

        // A second login collides on the unique username and rolls back.
        let collision = RoleAssigner::new(&store).persist(&User::new("taken")).await;
        assert!(collision.is_err());
        assert_eq!(store.rollbacks(), 1);

        pending.commit().await.expect("commit alice");
        assert!(store.user("alice").is_some());
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn closed_unit_rejects_commit() {
        let store = InMemoryStore::new();
        let mut unit = store.begin().await.expect("begin");
        unit.merge_user(&User::new("alice")).await.expect("stage");
        unit.commit().await.expect("first commit");

        let err = unit.commit().await.unwrap_err();
        assert!(err.to_string().contains("already closed"));
        assert!(unit.merge_user(&User::new("bob")).await.is_err());
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn rolled_back_unit_rejects_commit() {
        let store = InMemoryStore::new();
        let mut unit = store.begin().await.expect("begin");
        unit.merge_user(&User::new("alice")).await.expect("stage");
        unit.rollback().await.expect("rollback");

        assert!(unit.commit().await.is_err());
        assert!(store.user("alice").is_none());
    }
}
