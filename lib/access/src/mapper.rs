//! Provider response to user-info mapping.

use crate::claims::{ClaimSet, ProviderResponse, extract_claims};
use crate::config::{AuthConfig, MappingSource};
use crate::error::LoginError;
use crate::mapping::{MappingTables, ResolvedRoles};
use crate::mapping_file::MappingCache;
use crate::user::UserInfo;
use crate::username::normalize_username;
use rootcause::Report;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Builds user-info maps and resolves roles for one deployment.
///
/// Owns the mapping cache, so a single mapper should live for the whole
/// process and be shared by reference between logins.
#[derive(Debug)]
pub struct ClaimMapper {
    config: AuthConfig,
    cache: MappingCache,
    embedded: Arc<MappingTables>,
}

impl ClaimMapper {
    /// Creates a mapper with the built-in embedded table.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self::with_embedded_tables(config, MappingTables::embedded())
    }

    /// Creates a mapper with a custom embedded table.
    #[must_use]
    pub fn with_embedded_tables(config: AuthConfig, embedded: MappingTables) -> Self {
        Self {
            cache: MappingCache::new(config.cache_ttl()),
            config,
            embedded: Arc::new(embedded),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Returns the mapping cache.
    #[must_use]
    pub fn cache(&self) -> &MappingCache {
        &self.cache
    }

    /// Returns the mapping tables in effect for the next login.
    #[must_use]
    pub fn mapping_tables(&self) -> Arc<MappingTables> {
        match self.config.mapping_source() {
            MappingSource::Embedded => Arc::clone(&self.embedded),
            MappingSource::File(path) => self.cache.load(path),
        }
    }

    /// Resolves the claims of a login to platform roles.
    #[must_use]
    pub fn resolve_roles(&self, claims: &ClaimSet) -> ResolvedRoles {
        let mode = self.config.mapping_mode();
        let values = extract_claims(claims, mode);
        self.mapping_tables()
            .for_mode(mode)
            .resolve(&values, self.config.registration_role())
    }

    /// Builds the user-info map for a provider response.
    ///
    /// Logins through the configured provider get a normalized username and
    /// resolved `role_keys`. Other providers get the baseline info only.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::InvalidResponse` if the id_token cannot be decoded.
    #[instrument(skip(self, response))]
    pub fn user_info(
        &self,
        provider: &str,
        response: &ProviderResponse,
    ) -> Result<UserInfo, Report<LoginError>> {
        let claims = ClaimSet::from_response(response)?;
        let mut info = UserInfo::from_claims(&claims);

        if provider != self.config.provider_name() {
            debug!("provider is not mapped, returning baseline user info");
            return Ok(info);
        }

        info.username = normalize_username(&claims, &info.username);
        info.role_keys = self.resolve_roles(&claims).into_roles();

        debug!(
            username = %info.username,
            role_keys = ?info.role_keys,
            "built user info"
        );
        Ok(info)
    }
}
