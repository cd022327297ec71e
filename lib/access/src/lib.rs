//! Identity-provider claim to console role mapping for rolegate.
//!
//! This crate provides:
//! - Claim extraction from the provider's token-exchange response
//! - Role/group mapping tables, embedded or loaded from a JSON file with a
//!   TTL and modification-time cache
//! - Username normalization
//! - Role assignment and persistence through a host-supplied store
//! - The login handler implementing the host's post-login hooks
//! - Configuration validation and the console/provider settings
//!
//! # Mapping Model
//!
//! A deployment maps either the `roles` claim or the `groups` claim, never
//! both. Each claim value is looked up in the matching table; unmatched
//! values are dropped, duplicates keep their first position, and a login
//! with nothing mapped gets the registration role.
//!
//! # Example
//!
//! ```
//! use rolegate_access::{MappingTables, RoleMapping};
//!
//! let mapping = RoleMapping::new().with("Airflow.Admin", "Admin");
//! let claims = vec!["Airflow.Admin".to_string(), "Airflow.Unknown".to_string()];
//!
//! let resolved = mapping.resolve(&claims, "Viewer");
//! assert_eq!(resolved.roles(), &["Admin".to_string()]);
//!
//! let resolved = mapping.resolve(&[], "Viewer");
//! assert_eq!(resolved.roles(), &["Viewer".to_string()]);
//!
//! let embedded = MappingTables::embedded();
//! assert_eq!(embedded.role_mapping.get("Airflow.Viewer"), Some("Viewer"));
//! ```

pub mod assign;
pub mod claims;
pub mod config;
pub mod error;
pub mod handler;
pub mod mapper;
pub mod mapping;
pub mod mapping_file;
pub mod provider;
pub mod store;
pub mod user;
pub mod username;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use assign::{AssignmentReport, FailedAssignment, RoleAssigner};
pub use claims::{ClaimSet, ProviderResponse, extract_claims};
pub use config::{AuthConfig, AuthSettings, MappingMode, MappingSource};
pub use error::{ConfigError, LoginError, MappingError, StoreError};
pub use handler::{LoginHooks, LoginOutcome, RoleMappingHandler};
pub use mapper::ClaimMapper;
pub use mapping::{MappingTables, ResolvedRoles, RoleMapping};
pub use mapping_file::{MappingCache, load_mapping_file, read_mapping_file};
pub use provider::{AuthType, ClientSecret, ConsoleSettings, ProviderSettings};
pub use store::{AccessStore, UnitOfWork};
pub use user::{PlatformRole, User, UserInfo};
pub use username::normalize_username;
