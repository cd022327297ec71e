//! Error types for the access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConfigError`: Startup configuration problems (fatal)
//! - `MappingError`: Mapping-file problems (logged, never fatal to a login)
//! - `StoreError`: Failures reported by the host's user/role store
//! - `LoginError`: Login-level failures surfaced to the host

use std::fmt;
use std::path::PathBuf;

/// Errors from validating the authentication configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required environment variables are unset or blank.
    MissingVariables { names: Vec<&'static str> },
    /// The role-mapping mode is neither `roles` nor `groups`.
    InvalidMappingMode { value: String },
    /// A setting is present but unusable.
    InvalidValue { name: &'static str, reason: String },
    /// The configuration source could not be read or deserialized.
    Load { details: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVariables { names } => {
                write!(
                    f,
                    "missing required environment variable(s): {}",
                    names.join(", ")
                )
            }
            Self::InvalidMappingMode { value } => {
                write!(
                    f,
                    "invalid role mapping mode '{value}': expected 'roles' or 'groups'"
                )
            }
            Self::InvalidValue { name, reason } => {
                write!(f, "invalid value for {name}: {reason}")
            }
            Self::Load { details } => {
                write!(f, "failed to load configuration: {details}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from reading an external mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The file does not exist.
    NotFound { path: PathBuf },
    /// The process may not read the file.
    PermissionDenied { path: PathBuf },
    /// Any other IO failure.
    Io { path: PathBuf, details: String },
    /// The file is not valid JSON.
    Malformed { path: PathBuf, details: String },
    /// The JSON does not have the expected top-level shape.
    InvalidShape { path: PathBuf, details: String },
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => {
                write!(f, "mapping file not found: {}", path.display())
            }
            Self::PermissionDenied { path } => {
                write!(f, "permission denied reading mapping file: {}", path.display())
            }
            Self::Io { path, details } => {
                write!(f, "failed to read mapping file {}: {details}", path.display())
            }
            Self::Malformed { path, details } => {
                write!(f, "mapping file {} is not valid JSON: {details}", path.display())
            }
            Self::InvalidShape { path, details } => {
                write!(f, "mapping file {} has an invalid shape: {details}", path.display())
            }
        }
    }
}

impl std::error::Error for MappingError {}

/// Errors reported by an [`AccessStore`](crate::store::AccessStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Looking up a record failed.
    Query { details: String },
    /// Creating a role failed.
    RoleCreation { role: String, details: String },
    /// Writing the user record failed.
    Write { details: String },
    /// Committing or rolling back the unit of work failed.
    Transaction { details: String },
    /// A stored record could not be decoded.
    Decode { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query { details } => write!(f, "store query failed: {details}"),
            Self::RoleCreation { role, details } => {
                write!(f, "failed to create role '{role}': {details}")
            }
            Self::Write { details } => write!(f, "failed to write user: {details}"),
            Self::Transaction { details } => write!(f, "store transaction failed: {details}"),
            Self::Decode { details } => write!(f, "failed to decode stored record: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    /// Error for a unit of work used after commit or rollback.
    #[must_use]
    pub fn unit_closed() -> Self {
        Self::Transaction {
            details: "unit of work is already closed".to_string(),
        }
    }
}

/// Errors surfaced to the host as a failed login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// The provider response could not be interpreted.
    InvalidResponse { reason: String },
    /// Looking up the user failed.
    UserLookup { username: String },
    /// Persisting the user failed and the unit of work was rolled back.
    PersistFailed { username: String },
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidResponse { reason } => {
                write!(f, "invalid provider response: {reason}")
            }
            Self::UserLookup { username } => {
                write!(f, "failed to look up user '{username}'")
            }
            Self::PersistFailed { username } => {
                write!(f, "failed to persist user '{username}'")
            }
        }
    }
}

impl std::error::Error for LoginError {}
