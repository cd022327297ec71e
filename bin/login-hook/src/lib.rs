//! rolegate login hook.
//!
//! The process the workflow console invokes around an OAuth login. It loads
//! the role-mapping configuration from the environment, maps the provider
//! response to console roles and, with a database configured, persists the
//! user through a Postgres-backed store.

pub mod command;
pub mod config;
pub mod db;
pub mod error;
