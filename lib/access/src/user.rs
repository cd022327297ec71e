//! Console user and role records, and the user-info map.
//!
//! `User` and `PlatformRole` mirror the records the host persists. The login
//! handler only touches a user's profile fields and role list; storage is
//! left to the [`AccessStore`](crate::store::AccessStore).

use crate::claims::ClaimSet;
use chrono::{DateTime, Utc};
use rolegate_core::{RoleId, UserId};
use serde::{Deserialize, Serialize};

/// A platform role such as `Admin` or `Viewer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformRole {
    id: RoleId,
    name: String,
}

impl PlatformRole {
    /// Creates a role with a fresh ID.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RoleId::new(),
            name: name.into(),
        }
    }

    /// Reconstitutes a stored role.
    #[must_use]
    pub fn with_id(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the role ID.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A console user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    /// Login name; unique per console.
    username: String,
    email: Option<String>,
    first_name: String,
    last_name: String,
    roles: Vec<PlatformRole>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with no roles.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username: username.into(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            roles: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: UserId,
        username: String,
        email: Option<String>,
        first_name: String,
        last_name: String,
        roles: Vec<PlatformRole>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            email,
            first_name,
            last_name,
            roles,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Returns the roles in assignment order.
    #[must_use]
    pub fn roles(&self) -> &[PlatformRole] {
        &self.roles
    }

    /// Returns the role names in assignment order.
    #[must_use]
    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(PlatformRole::name).collect()
    }

    /// Returns true if the user holds a role with this name.
    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name() == name)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Copies the profile fields from a user-info map.
    pub fn apply_profile(&mut self, info: &UserInfo) {
        self.email = info.email.clone();
        self.first_name = info.first_name.clone();
        self.last_name = info.last_name.clone();
        self.updated_at = Utc::now();
    }

    /// Removes every role association.
    pub fn clear_roles(&mut self) {
        self.roles.clear();
        self.updated_at = Utc::now();
    }

    /// Attaches a role unless one with the same name is already attached.
    ///
    /// Returns true if the role was added.
    pub fn add_role(&mut self, role: PlatformRole) -> bool {
        if self.has_role(role.name()) {
            return false;
        }
        self.roles.push(role);
        self.updated_at = Utc::now();
        true
    }
}

/// The normalized user-info map handed back to the host after login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Stable provider-side identifier of the principal.
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// Platform role names resolved from the provider claims.
    #[serde(default)]
    pub role_keys: Vec<String>,
}

impl UserInfo {
    /// Builds the baseline user info from claims, before normalization.
    ///
    /// The object ID (`oid`, else `sub`) doubles as the initial username.
    #[must_use]
    pub fn from_claims(claims: &ClaimSet) -> Self {
        let id = claims
            .string_claim("oid")
            .or_else(|| claims.string_claim("sub"))
            .unwrap_or_default()
            .to_string();

        Self {
            username: id.clone(),
            id,
            email: claims
                .string_claim("upn")
                .or_else(|| claims.string_claim("email"))
                .map(str::to_string),
            first_name: claims
                .string_claim("given_name")
                .unwrap_or_default()
                .to_string(),
            last_name: claims
                .string_claim("family_name")
                .unwrap_or_default()
                .to_string(),
            role_keys: Vec::new(),
        }
    }
}
