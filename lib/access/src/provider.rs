//! OAuth provider and web-console security settings.
//!
//! These are static values the host consumes when it sets up the OAuth
//! client and the console's login page. Nothing here makes network calls;
//! the handshake itself is the host's job.

use crate::config::AuthConfig;
use serde::{Serialize, Serializer};
use serde_json::Value;

const ENTRA_LOGIN_BASE: &str = "https://login.microsoftonline.com";
const ENTRA_USERINFO_ENDPOINT: &str = "https://graph.microsoft.com/oidc/userinfo";
const DEFAULT_SCOPE: &str = "openid email profile";

/// Authentication backend the console should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// OAuth2/OpenID-Connect login against an external provider.
    Oauth,
}

/// A client secret that serializes and prints redacted unless asked.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);

impl ClientSecret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret itself.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

impl Serialize for ClientSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<redacted>")
    }
}

/// Endpoints and credentials for one OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSettings {
    /// Provider name the host routes logins by.
    pub name: String,
    /// Key of the token in the exchange response carrying the claims.
    pub token_key: String,
    pub client_id: String,
    pub client_secret: ClientSecret,
    pub authorize_url: String,
    pub access_token_url: String,
    pub api_base_url: String,
    pub jwks_uri: String,
    pub userinfo_endpoint: String,
    /// Space-separated OAuth scopes.
    pub scope: String,
}

impl ProviderSettings {
    /// Builds Microsoft Entra ID settings for a tenant.
    #[must_use]
    pub fn azure(tenant_id: &str, client_id: &str, client_secret: &str) -> Self {
        let tenant_base = format!("{ENTRA_LOGIN_BASE}/{tenant_id}");
        Self {
            name: "azure".to_string(),
            token_key: "id_token".to_string(),
            client_id: client_id.to_string(),
            client_secret: ClientSecret::new(client_secret),
            authorize_url: format!("{tenant_base}/oauth2/v2.0/authorize"),
            access_token_url: format!("{tenant_base}/oauth2/v2.0/token"),
            api_base_url: format!("{tenant_base}/v2.0/"),
            jwks_uri: format!("{tenant_base}/discovery/v2.0/keys"),
            userinfo_endpoint: ENTRA_USERINFO_ENDPOINT.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Returns the scopes as a list.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope.split_whitespace().collect()
    }
}

/// Login-related settings for the host's web console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleSettings {
    pub auth_type: AuthType,
    /// CSRF protection must stay on for OAuth logins.
    pub csrf_enabled: bool,
    /// Lifetime of a CSRF token in seconds; `None` ties it to the session.
    pub csrf_time_limit: Option<u64>,
    pub user_registration: bool,
    pub registration_role: String,
    pub roles_sync_at_login: bool,
    pub providers: Vec<ProviderSettings>,
}

impl ConsoleSettings {
    /// Derives the console settings from a validated configuration.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut provider = ProviderSettings::azure(
            config.tenant_id(),
            config.client_id(),
            config.client_secret(),
        );
        provider.name = config.provider_name().to_string();

        Self {
            auth_type: AuthType::Oauth,
            csrf_enabled: true,
            csrf_time_limit: None,
            user_registration: config.user_registration(),
            registration_role: config.registration_role().to_string(),
            roles_sync_at_login: config.roles_sync_at_login(),
            providers: vec![provider],
        }
    }

    /// Serializes the settings with every client secret in clear text.
    ///
    /// This is the form the host's OAuth client needs. The result must not be
    /// logged; plain serialization keeps the secrets redacted.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_host_json(&self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(providers) = value.get_mut("providers").and_then(Value::as_array_mut) {
            for (json, provider) in providers.iter_mut().zip(&self.providers) {
                if let Some(object) = json.as_object_mut() {
                    object.insert(
                        "client_secret".to_string(),
                        Value::String(provider.client_secret.expose().to_string()),
                    );
                }
            }
        }
        Ok(value)
    }

    /// Looks up a provider by name.
    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&ProviderSettings> {
        self.providers.iter().find(|p| p.name == name)
    }
}
