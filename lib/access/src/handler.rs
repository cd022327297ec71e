//! Login hooks the host console calls after an OAuth login.
//!
//! The host drives the OAuth handshake and then calls two hooks in order:
//!
//! 1. [`LoginHooks::oauth_user_info`] turns the provider response into a
//!    normalized [`UserInfo`], including the resolved `role_keys`.
//! 2. [`LoginHooks::auth_user_oauth`] loads or registers the user, replaces
//!    their roles and persists the record.
//!
//! Everything that can go wrong with claims or the mapping table falls back
//! to the registration role. Only store failures fail the login.

use crate::assign::{AssignmentReport, RoleAssigner};
use crate::claims::ProviderResponse;
use crate::config::AuthConfig;
use crate::error::LoginError;
use crate::mapper::ClaimMapper;
use crate::store::AccessStore;
use crate::user::{User, UserInfo};
use async_trait::async_trait;
use rootcause::Report;
use rootcause::prelude::ResultExt;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// The host console's post-login extension points.
#[async_trait]
pub trait LoginHooks: Send + Sync {
    /// Produces the user-info map from a provider response.
    fn oauth_user_info(
        &self,
        provider: &str,
        response: &ProviderResponse,
    ) -> Result<UserInfo, Report<LoginError>>;

    /// Materializes and persists the console user for a user-info map.
    ///
    /// `Ok(None)` refuses the login without an error.
    async fn auth_user_oauth(&self, info: &UserInfo) -> Result<Option<User>, Report<LoginError>>;
}

/// Result of a completed login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: User,
    pub is_new_user: bool,
    /// `None` when role sync was skipped for an existing user.
    pub assignment: Option<AssignmentReport>,
}

/// Login handler mapping provider claims onto console roles.
pub struct RoleMappingHandler<S> {
    mapper: ClaimMapper,
    store: S,
}

impl<S: AccessStore> RoleMappingHandler<S> {
    /// Creates a handler whose mapper reads the configured mapping file, or the
    /// built-in table when no file is configured.
    #[must_use]
    pub fn new(config: AuthConfig, store: S) -> Self {
        Self::from_mapper(ClaimMapper::new(config), store)
    }

    /// Creates a handler around an existing mapper.
    #[must_use]
    pub fn from_mapper(mapper: ClaimMapper, store: S) -> Self {
        Self { mapper, store }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        self.mapper.config()
    }

    /// Returns the claim mapper.
    #[must_use]
    pub fn mapper(&self) -> &ClaimMapper {
        &self.mapper
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads or registers the user, syncs roles and persists.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::UserLookup` if the store lookup fails and
    /// `LoginError::PersistFailed` if the unit of work was rolled back.
    #[instrument(skip(self, info), fields(username = %info.username))]
    pub async fn login(&self, info: &UserInfo) -> Result<Option<LoginOutcome>, Report<LoginError>> {
        if info.username.trim().is_empty() {
            warn!("provider returned no usable username, refusing login");
            return Ok(None);
        }

        let existing = self
            .store
            .find_user_by_username(&info.username)
            .await
            .context(LoginError::UserLookup {
                username: info.username.clone(),
            })?;

        let (mut user, is_new_user) = match existing {
            Some(user) => (user, false),
            None if self.config().user_registration() => {
                info!("registering new user");
                (User::new(info.username.clone()), true)
            }
            None => {
                info!("unknown user and registration is disabled, refusing login");
                return Ok(None);
            }
        };

        user.apply_profile(info);

        let assigner = RoleAssigner::new(&self.store);
        let assignment = if is_new_user || self.config().roles_sync_at_login() {
            let roles = if info.role_keys.is_empty() {
                vec![self.config().registration_role().to_string()]
            } else {
                info.role_keys.clone()
            };
            Some(assigner.assign(&mut user, &roles).await)
        } else {
            debug!("role sync at login disabled, keeping existing roles");
            None
        };

        assigner
            .persist(&user)
            .await
            .context(LoginError::PersistFailed {
                username: info.username.clone(),
            })?;

        Ok(Some(LoginOutcome {
            user,
            is_new_user,
            assignment,
        }))
    }
}

#[async_trait]
impl<S: AccessStore> LoginHooks for RoleMappingHandler<S> {
    fn oauth_user_info(
        &self,
        provider: &str,
        response: &ProviderResponse,
    ) -> Result<UserInfo, Report<LoginError>> {
        self.mapper.user_info(provider, response)
    }

    async fn auth_user_oauth(&self, info: &UserInfo) -> Result<Option<User>, Report<LoginError>> {
        Ok(self.login(info).await?.map(|outcome| outcome.user))
    }
}
