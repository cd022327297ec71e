//! Process configuration for the login hook.
//!
//! Loaded via the `config` crate from environment variables. The
//! authentication settings are validated here, so a bad deployment fails
//! before any login is attempted.

use config::{Config, Environment};
use rolegate_access::{AuthConfig, AuthSettings, ConfigError};
use rootcause::Report;

/// Login hook configuration.
#[derive(Debug)]
pub struct HookConfig {
    /// PostgreSQL connection URL; without it logins are mapped but not persisted.
    pub database_url: Option<String>,

    /// Validated authentication configuration.
    pub auth: AuthConfig,
}

impl HookConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, Report<ConfigError>> {
        Self::from_source(Environment::default())
    }

    /// Loads configuration from an environment source.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_source(source: Environment) -> Result<Self, Report<ConfigError>> {
        let config = Config::builder()
            .add_source(source)
            .build()
            .map_err(|e| ConfigError::Load {
                details: e.to_string(),
            })?;

        let database_url = config
            .get_string("database_url")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let settings: AuthSettings = config.try_deserialize().map_err(|e| ConfigError::Load {
            details: e.to_string(),
        })?;

        Ok(Self {
            database_url,
            auth: settings.validate()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolegate_access::{MappingMode, MappingSource};
    use std::path::PathBuf;
    use std::time::Duration;

    fn source(vars: &[(&str, &str)]) -> Environment {
        let mut map = config::Map::new();
        for (key, value) in vars {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Environment::default().source(Some(map))
    }

    const CREDENTIALS: [(&str, &str); 3] = [
        ("AZURE_TENANT_ID", "tenant"),
        ("AZURE_CLIENT_ID", "client"),
        ("AZURE_CLIENT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply() {
        let config = HookConfig::from_source(source(&CREDENTIALS)).expect("config");

        assert!(config.database_url.is_none());
        assert_eq!(config.auth.mapping_mode(), MappingMode::Roles);
        assert_eq!(config.auth.mapping_source(), &MappingSource::Embedded);
        assert_eq!(config.auth.cache_ttl(), Duration::from_secs(300));
        assert!(config.auth.user_registration());
        assert_eq!(config.auth.registration_role(), "Unassigned");
        assert!(config.auth.roles_sync_at_login());
        assert_eq!(config.auth.provider_name(), "azure");
    }

    #[test]
    fn reads_every_setting() {
        let mut vars = CREDENTIALS.to_vec();
        vars.extend([
            ("DATABASE_URL", "postgres://localhost/console"),
            ("ROLE_MAPPING_MODE", "Groups"),
            ("ROLE_MAPPING_FILE", "/etc/rolegate/mapping.json"),
            ("ROLE_MAPPING_CACHE_TTL_SECONDS", "60"),
            ("AUTH_USER_REGISTRATION", "false"),
            ("AUTH_USER_REGISTRATION_ROLE", "Viewer"),
            ("AUTH_ROLES_SYNC_AT_LOGIN", "false"),
            ("OAUTH_PROVIDER_NAME", "entra"),
        ]);

        let config = HookConfig::from_source(source(&vars)).expect("config");

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/console")
        );
        assert_eq!(config.auth.mapping_mode(), MappingMode::Groups);
        assert_eq!(
            config.auth.mapping_source(),
            &MappingSource::File(PathBuf::from("/etc/rolegate/mapping.json"))
        );
        assert_eq!(config.auth.cache_ttl(), Duration::from_secs(60));
        assert!(!config.auth.user_registration());
        assert_eq!(config.auth.registration_role(), "Viewer");
        assert!(!config.auth.roles_sync_at_login());
        assert_eq!(config.auth.provider_name(), "entra");
    }

    #[test]
    fn missing_credentials_are_all_reported() {
        let err = HookConfig::from_source(source(&[("AZURE_CLIENT_ID", "client")]))
            .expect_err("missing credentials");

        let message = err.to_string();
        assert!(message.contains("AZURE_TENANT_ID"));
        assert!(message.contains("AZURE_CLIENT_SECRET"));
        assert!(!message.contains("AZURE_CLIENT_ID,"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut vars = CREDENTIALS.to_vec();
        vars.push(("ROLE_MAPPING_MODE", "teams"));

        let err = HookConfig::from_source(source(&vars)).expect_err("invalid mode");

        assert!(err.to_string().contains("teams"));
    }

    #[test]
    fn blank_database_url_is_ignored() {
        let mut vars = CREDENTIALS.to_vec();
        vars.push(("DATABASE_URL", "  "));

        let config = HookConfig::from_source(source(&vars)).expect("config");

        assert!(config.database_url.is_none());
    }
}
