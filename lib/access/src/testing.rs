//! In-memory store used by the unit tests.

use crate::error::StoreError;
use crate::store::{AccessStore, UnitOfWork};
use crate::user::{PlatformRole, User};
use async_trait::async_trait;
use rootcause::Report;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    roles: HashMap<String, PlatformRole>,
    failing_roles: HashSet<String>,
    fail_merge: bool,
    fail_commit: bool,
    commits: usize,
    rollbacks: usize,
}

#[derive(Default)]
pub(crate) struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_roles(names: &[&str]) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().unwrap();
            for name in names {
                state
                    .roles
                    .insert(name.to_string(), PlatformRole::new(*name));
            }
        }
        store
    }

    pub(crate) fn insert_user(&self, user: User) {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(user.username().to_string(), user);
    }

    pub(crate) fn fail_role_creation(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_roles
            .insert(name.to_string());
    }

    pub(crate) fn fail_merge(&self) {
        self.state.lock().unwrap().fail_merge = true;
    }

    pub(crate) fn fail_commit(&self) {
        self.state.lock().unwrap().fail_commit = true;
    }

    pub(crate) fn user(&self, username: &str) -> Option<User> {
        self.state.lock().unwrap().users.get(username).cloned()
    }

    pub(crate) fn role_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().unwrap().roles.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub(crate) fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks
    }
}

#[async_trait]
impl AccessStore for InMemoryStore {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, Report<StoreError>> {
        Ok(self.user(username))
    }

    async fn find_role(&self, name: &str) -> Result<Option<PlatformRole>, Report<StoreError>> {
        Ok(self.state.lock().unwrap().roles.get(name).cloned())
    }

    async fn add_role(&self, name: &str) -> Result<PlatformRole, Report<StoreError>> {
        let mut state = self.state.lock().unwrap();
        if state.failing_roles.contains(name) {
            return Err(StoreError::RoleCreation {
                role: name.to_string(),
                details: "rejected by test store".to_string(),
            }
            .into());
        }
        let role = PlatformRole::new(name);
        state.roles.insert(name.to_string(), role.clone());
        Ok(role)
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, Report<StoreError>> {
        Ok(Box::new(InMemoryUnit {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
            open: true,
        }))
    }
}

/// Unit of work staging users until commit.
pub(crate) struct InMemoryUnit {
    state: Arc<Mutex<State>>,
    staged: Vec<User>,
    open: bool,
}

#[async_trait]
impl UnitOfWork for InMemoryUnit {
    async fn merge_user(&mut self, user: &User) -> Result<(), Report<StoreError>> {
        if !self.open {
            return Err(StoreError::unit_closed().into());
        }
        let state = self.state.lock().unwrap();
        if state.fail_merge {
            return Err(StoreError::Write {
                details: "merge rejected by test store".to_string(),
            }
            .into());
        }
        // Usernames are unique across user ids.
        let taken = state
            .users
            .get(user.username())
            .is_some_and(|existing| existing.id() != user.id());
        if taken {
            return Err(StoreError::Write {
                details: format!("username '{}' already exists", user.username()),
            }
            .into());
        }
        drop(state);
        self.staged.push(user.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), Report<StoreError>> {
        if !self.open {
            return Err(StoreError::unit_closed().into());
        }
        self.open = false;
        let mut state = self.state.lock().unwrap();
        if state.fail_commit {
            return Err(StoreError::Transaction {
                details: "commit rejected by test store".to_string(),
            }
            .into());
        }
        for user in self.staged.drain(..) {
            state.users.insert(user.username().to_string(), user);
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), Report<StoreError>> {
        self.staged.clear();
        self.open = false;
        self.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}
