//! Authentication configuration.
//!
//! `AuthSettings` is the raw, environment-shaped input (every field optional)
//! and `AuthConfig` is the validated form the handler consumes. Validation
//! happens once at startup; any error there is fatal.

use crate::error::ConfigError;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which claim drives role mapping.
///
/// The two modes are mutually exclusive: a deployment maps either app roles
/// or group memberships, never both at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMode {
    /// Map the `roles` claim through the role mapping table.
    #[default]
    Roles,
    /// Map the `groups` claim through the group mapping table.
    Groups,
}

impl MappingMode {
    /// Returns the claim key read in this mode.
    #[must_use]
    pub fn claim_key(&self) -> &'static str {
        match self {
            Self::Roles => "roles",
            Self::Groups => "groups",
        }
    }
}

impl fmt::Display for MappingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.claim_key())
    }
}

impl FromStr for MappingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "roles" | "role" => Ok(Self::Roles),
            "groups" | "group" => Ok(Self::Groups),
            _ => Err(ConfigError::InvalidMappingMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Where the mapping table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    /// The table compiled into the crate.
    Embedded,
    /// A JSON file on disk, re-read through the mapping cache.
    File(PathBuf),
}

const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;
const DEFAULT_REGISTRATION_ROLE: &str = "Unassigned";
const DEFAULT_PROVIDER_NAME: &str = "azure";

/// Raw settings as read from the environment.
///
/// Field names match the lower-cased environment variable names, so the
/// `config` crate's `Environment` source deserializes straight into this type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSettings {
    pub azure_tenant_id: Option<String>,
    pub azure_client_id: Option<String>,
    pub azure_client_secret: Option<String>,
    pub role_mapping_mode: Option<String>,
    pub role_mapping_file: Option<PathBuf>,
    pub role_mapping_cache_ttl_seconds: Option<u64>,
    pub auth_user_registration: Option<bool>,
    pub auth_user_registration_role: Option<String>,
    pub auth_roles_sync_at_login: Option<bool>,
    pub oauth_provider_name: Option<String>,
}

impl AuthSettings {
    /// Validates the settings and applies defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingVariables` naming every missing
    /// credential, or another `ConfigError` for the first unusable value.
    pub fn validate(self) -> Result<AuthConfig, Report<ConfigError>> {
        let tenant_id = non_blank(self.azure_tenant_id);
        let client_id = non_blank(self.azure_client_id);
        let client_secret = non_blank(self.azure_client_secret);

        let mut missing = Vec::new();
        if tenant_id.is_none() {
            missing.push("AZURE_TENANT_ID");
        }
        if client_id.is_none() {
            missing.push("AZURE_CLIENT_ID");
        }
        if client_secret.is_none() {
            missing.push("AZURE_CLIENT_SECRET");
        }
        let (Some(tenant_id), Some(client_id), Some(client_secret)) =
            (tenant_id, client_id, client_secret)
        else {
            return Err(ConfigError::MissingVariables { names: missing }.into());
        };

        let mapping_mode = match non_blank(self.role_mapping_mode) {
            Some(raw) => raw.parse::<MappingMode>()?,
            None => MappingMode::default(),
        };

        let mapping_source = match self.role_mapping_file.map(trim_path) {
            Some(path) if path.as_os_str().is_empty() => MappingSource::Embedded,
            Some(path) => MappingSource::File(path),
            None => MappingSource::Embedded,
        };

        let registration_role = match self.auth_user_registration_role {
            None => DEFAULT_REGISTRATION_ROLE.to_string(),
            Some(role) if role.trim().is_empty() => {
                return Err(ConfigError::InvalidValue {
                    name: "AUTH_USER_REGISTRATION_ROLE",
                    reason: "must not be blank".to_string(),
                }
                .into());
            }
            Some(role) => role.trim().to_string(),
        };

        let provider_name = match self.oauth_provider_name {
            None => DEFAULT_PROVIDER_NAME.to_string(),
            Some(name) if name.trim().is_empty() => {
                return Err(ConfigError::InvalidValue {
                    name: "OAUTH_PROVIDER_NAME",
                    reason: "must not be blank".to_string(),
                }
                .into());
            }
            Some(name) => name.trim().to_string(),
        };

        Ok(AuthConfig {
            tenant_id,
            client_id,
            client_secret,
            provider_name,
            mapping_mode,
            mapping_source,
            cache_ttl: Duration::from_secs(
                self.role_mapping_cache_ttl_seconds
                    .unwrap_or(DEFAULT_CACHE_TTL_SECONDS),
            ),
            user_registration: self.auth_user_registration.unwrap_or(true),
            registration_role,
            roles_sync_at_login: self.auth_roles_sync_at_login.unwrap_or(true),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Paths that are not valid UTF-8 are kept as given.
fn trim_path(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(text) if text.trim() != text => PathBuf::from(text.trim()),
        _ => path,
    }
}

/// Validated authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    provider_name: String,
    mapping_mode: MappingMode,
    mapping_source: MappingSource,
    cache_ttl: Duration,
    user_registration: bool,
    registration_role: String,
    roles_sync_at_login: bool,
}

impl AuthConfig {
    /// Returns the identity provider tenant ID.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the name of the provider whose logins get role mapping.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Returns the role mapping mode.
    #[must_use]
    pub fn mapping_mode(&self) -> MappingMode {
        self.mapping_mode
    }

    /// Returns where the mapping table is loaded from.
    #[must_use]
    pub fn mapping_source(&self) -> &MappingSource {
        &self.mapping_source
    }

    /// Returns how long a loaded mapping file is trusted without re-checking.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Returns whether unknown users are registered on first login.
    #[must_use]
    pub fn user_registration(&self) -> bool {
        self.user_registration
    }

    /// Returns the role assigned when no claim maps.
    #[must_use]
    pub fn registration_role(&self) -> &str {
        &self.registration_role
    }

    /// Returns whether roles are re-assigned at every login.
    #[must_use]
    pub fn roles_sync_at_login(&self) -> bool {
        self.roles_sync_at_login
    }

    /// Returns a copy with a different mapping source.
    #[must_use]
    pub fn with_mapping_source(mut self, source: MappingSource) -> Self {
        self.mapping_source = source;
        self
    }

    /// Returns a copy with a different mapping mode.
    #[must_use]
    pub fn with_mapping_mode(mut self, mode: MappingMode) -> Self {
        self.mapping_mode = mode;
        self
    }

    /// Returns a copy with self-registration toggled.
    #[must_use]
    pub fn with_user_registration(mut self, enabled: bool) -> Self {
        self.user_registration = enabled;
        self
    }

    /// Returns a copy with role sync at login toggled.
    #[must_use]
    pub fn with_roles_sync_at_login(mut self, enabled: bool) -> Self {
        self.roles_sync_at_login = enabled;
        self
    }
}

// Hand-written so the secret never reaches a log line.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("provider_name", &self.provider_name)
            .field("mapping_mode", &self.mapping_mode)
            .field("mapping_source", &self.mapping_source)
            .field("cache_ttl", &self.cache_ttl)
            .field("user_registration", &self.user_registration)
            .field("registration_role", &self.registration_role)
            .field("roles_sync_at_login", &self.roles_sync_at_login)
            .finish()
    }
}
