//! Core types shared by the rolegate crates.
//!
//! This crate provides the `Result` alias used for layered error reporting
//! and the strongly-typed identifiers for platform users and roles.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, RoleId, UserId};
