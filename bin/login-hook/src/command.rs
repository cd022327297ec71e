//! Command-line commands of the login hook.
//!
//! - `settings [--reveal-secret]` prints the console settings as JSON. The
//!   client secret stays redacted unless `--reveal-secret` is given.
//! - `login [FILE]` reads a login request from FILE (or stdin), builds the
//!   user info and, when a store is available, completes the login.

use crate::error::HookError;
use rolegate_access::{
    AccessStore, ClaimMapper, ConsoleSettings, LoginHooks, LoginOutcome, ProviderResponse,
    RoleMappingHandler, UserInfo,
};
use rootcause::Report;
use rootcause::prelude::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

const USAGE: &str = "usage: rolegate-login-hook <settings [--reveal-secret] | login [FILE]>";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the console settings.
    Settings { reveal_secret: bool },
    /// Map one login; reads stdin when `input` is `None`.
    Login { input: Option<PathBuf> },
}

impl Command {
    /// Parses the arguments following the program name.
    ///
    /// # Errors
    ///
    /// Returns `HookError::Usage` for unknown commands or extra arguments.
    pub fn parse<I>(args: I) -> Result<Self, Report<HookError>>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["settings"] => Ok(Self::Settings {
                reveal_secret: false,
            }),
            ["settings", "--reveal-secret"] => Ok(Self::Settings {
                reveal_secret: true,
            }),
            ["login"] | ["login", "-"] => Ok(Self::Login { input: None }),
            ["login", path] => Ok(Self::Login {
                input: Some(PathBuf::from(path)),
            }),
            _ => Err(HookError::Usage {
                details: USAGE.to_string(),
            }
            .into()),
        }
    }
}

/// A login as handed over by the host after the token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub provider: String,
    pub response: ProviderResponse,
}

impl LoginRequest {
    /// Decodes a request from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `HookError::Input` if the text is not a valid request.
    pub fn from_json(text: &str) -> Result<Self, Report<HookError>> {
        serde_json::from_str(text).map_err(|e| {
            HookError::Input {
                details: e.to_string(),
            }
            .into()
        })
    }

    /// Reads a request from a file, or stdin when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `HookError::Input` if reading or decoding fails.
    pub async fn read(path: Option<&Path>) -> Result<Self, Report<HookError>> {
        let text = match path {
            Some(path) => tokio::fs::read_to_string(path).await,
            None => {
                let mut text = String::new();
                let read = tokio::io::stdin().read_to_string(&mut text).await;
                read.map(|_| text)
            }
        }
        .map_err(|e| HookError::Input {
            details: e.to_string(),
        })?;

        Self::from_json(&text)
    }
}

/// JSON result of the `login` command.
#[derive(Debug, Clone, Serialize)]
pub struct LoginReport {
    pub user_info: UserInfo,
    /// Set once the user was persisted; `None` when there is no store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<LoginOutcome>,
    /// False when the login was refused without an error.
    pub accepted: bool,
}

/// Builds the `settings` output.
///
/// The client secret is only included when `reveal_secret` is set.
///
/// # Errors
///
/// Returns `HookError::Output` if serialization fails.
pub fn settings_json(
    mapper: &ClaimMapper,
    reveal_secret: bool,
) -> Result<String, Report<HookError>> {
    let settings = ConsoleSettings::from_config(mapper.config());
    if !reveal_secret {
        return to_json(&settings);
    }
    let value = settings.to_host_json().map_err(|e| HookError::Output {
        details: e.to_string(),
    })?;
    to_json(&value)
}

/// Maps a login without persisting it.
///
/// # Errors
///
/// Returns an error if the provider response is invalid.
pub fn map_login(
    mapper: &ClaimMapper,
    request: &LoginRequest,
) -> Result<LoginReport, Report<HookError>> {
    let user_info = mapper
        .user_info(&request.provider, &request.response)
        .context(HookError::Input {
            details: "provider response rejected".to_string(),
        })?;

    Ok(LoginReport {
        user_info,
        outcome: None,
        accepted: true,
    })
}

/// Maps a login and persists the user through the handler's store.
///
/// # Errors
///
/// Returns an error if the provider response is invalid or the login fails.
pub async fn complete_login<S: AccessStore>(
    handler: &RoleMappingHandler<S>,
    request: &LoginRequest,
) -> Result<LoginReport, Report<HookError>> {
    let user_info = handler
        .oauth_user_info(&request.provider, &request.response)
        .context(HookError::Input {
            details: "provider response rejected".to_string(),
        })?;

    let outcome = handler
        .login(&user_info)
        .await
        .context(HookError::Database {
            details: "login could not be completed".to_string(),
        })?;

    Ok(LoginReport {
        accepted: outcome.is_some(),
        user_info,
        outcome,
    })
}

/// Serializes a value as pretty JSON.
///
/// # Errors
///
/// Returns `HookError::Output` if serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, Report<HookError>> {
    serde_json::to_string_pretty(value).map_err(|e| {
        HookError::Output {
            details: e.to_string(),
        }
        .into()
    })
}
