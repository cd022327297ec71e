//! Error types for the login hook process.

use std::fmt;

/// Failures of the login hook outside the mapping library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The command line could not be parsed.
    Usage { details: String },
    /// The login request could not be read or decoded.
    Input { details: String },
    /// Connecting to or migrating the database failed.
    Database { details: String },
    /// Writing the JSON result failed.
    Output { details: String },
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage { details } => write!(f, "usage error: {details}"),
            Self::Input { details } => write!(f, "invalid login request: {details}"),
            Self::Database { details } => write!(f, "database error: {details}"),
            Self::Output { details } => write!(f, "failed to write output: {details}"),
        }
    }
}

impl std::error::Error for HookError {}
