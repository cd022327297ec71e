//! Provider claim to platform role mapping.

use crate::config::MappingMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Table translating provider role or group identifiers to platform role names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleMapping {
    entries: BTreeMap<String, String>,
}

impl RoleMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any previous target for the same claim.
    #[must_use]
    pub fn with(mut self, claim: impl Into<String>, role: impl Into<String>) -> Self {
        self.entries.insert(claim.into(), role.into());
        self
    }

    /// Returns the platform role for a claim value.
    #[must_use]
    pub fn get(&self, claim: &str) -> Option<&str> {
        self.entries.get(claim).map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maps claim values to platform roles.
    ///
    /// Output order follows claim order. A role reached twice is kept at its
    /// first position only. Unmatched claims are dropped with a warning, and
    /// when nothing matches the result is exactly `[default_role]`.
    #[must_use]
    pub fn resolve(&self, claims: &[String], default_role: &str) -> ResolvedRoles {
        let mut roles: Vec<String> = Vec::with_capacity(claims.len());

        for claim in claims {
            match self.get(claim) {
                Some(role) => {
                    if !roles.iter().any(|r| r == role) {
                        roles.push(role.to_string());
                    }
                }
                None => {
                    warn!(claim = %claim, "claim has no role mapping, ignoring");
                }
            }
        }

        if roles.is_empty() {
            warn!(
                default_role,
                "no claim mapped to a platform role, using default role"
            );
            return ResolvedRoles {
                roles: vec![default_role.to_string()],
                defaulted: true,
            };
        }

        ResolvedRoles {
            roles,
            defaulted: false,
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RoleMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The role and group mapping tables of one deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTables {
    #[serde(default)]
    pub role_mapping: RoleMapping,
    #[serde(default)]
    pub group_mapping: RoleMapping,
}

impl MappingTables {
    /// Returns empty tables, which map every login to the default role.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The table compiled into the crate.
    ///
    /// Covers the console's app roles; there is no built-in group mapping
    /// because group object IDs are tenant specific.
    #[must_use]
    pub fn embedded() -> Self {
        Self {
            role_mapping: [
                ("Airflow.Admin", "Admin"),
                ("Airflow.Viewer", "Viewer"),
                ("Airflow.ProjectA", "ProjectA"),
                ("Airflow.ProjectB", "ProjectB"),
            ]
            .into_iter()
            .collect(),
            group_mapping: RoleMapping::new(),
        }
    }

    /// Returns the table used in the given mode.
    #[must_use]
    pub fn for_mode(&self, mode: MappingMode) -> &RoleMapping {
        match mode {
            MappingMode::Roles => &self.role_mapping,
            MappingMode::Groups => &self.group_mapping,
        }
    }
}

/// Ordered, duplicate-free platform role names for one login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRoles {
    roles: Vec<String>,
    defaulted: bool,
}

impl ResolvedRoles {
    /// Returns the role names in assignment order.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns true if no claim matched and the default role was substituted.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.defaulted
    }

    /// Consumes the set, returning the role names.
    #[must_use]
    pub fn into_roles(self) -> Vec<String> {
        self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn unmatched_claims_are_dropped() {
        let mapping = RoleMapping::new().with("Airflow.Admin", "Admin");
        let resolved = mapping.resolve(&claims(&["Airflow.Admin", "Airflow.Unknown"]), "Viewer");

        assert_eq!(resolved.roles(), &["Admin".to_string()]);
        assert!(!resolved.is_default());
    }

    #[test]
    fn empty_claims_resolve_to_default() {
        let mapping = RoleMapping::new().with("Airflow.Admin", "Admin");
        let resolved = mapping.resolve(&[], "Viewer");

        assert_eq!(resolved.roles(), &["Viewer".to_string()]);
        assert!(resolved.is_default());
    }

    #[test]
    fn no_matching_claims_resolve_to_default_only() {
        let mapping = MappingTables::embedded().role_mapping;
        let resolved = mapping.resolve(&claims(&["Other.Role", "Another"]), "Unassigned");

        assert_eq!(resolved.into_roles(), vec!["Unassigned"]);
    }

    #[test]
    fn order_follows_claims_and_duplicates_keep_first() {
        let mapping = RoleMapping::new()
            .with("ops", "Op")
            .with("admins", "Admin")
            .with("platform-admins", "Admin")
            .with("viewers", "Viewer");

        let resolved = mapping.resolve(
            &claims(&["viewers", "admins", "unknown", "platform-admins", "ops", "viewers"]),
            "Public",
        );

        assert_eq!(resolved.into_roles(), vec!["Viewer", "Admin", "Op"]);
    }

    #[test]
    fn all_matching_claims_map_to_deduplicated_image() {
        let mapping = MappingTables::embedded().role_mapping;
        let input = claims(&[
            "Airflow.ProjectB",
            "Airflow.Admin",
            "Airflow.ProjectB",
            "Airflow.Viewer",
        ]);

        let mut expected: Vec<String> = Vec::new();
        for claim in &input {
            let role = mapping.get(claim).expect("mapped").to_string();
            if !expected.contains(&role) {
                expected.push(role);
            }
        }

        assert_eq!(mapping.resolve(&input, "Unassigned").into_roles(), expected);
    }

    #[test]
    fn for_mode_selects_table() {
        let tables = MappingTables {
            role_mapping: RoleMapping::new().with("r", "RoleTarget"),
            group_mapping: RoleMapping::new().with("g", "GroupTarget"),
        };

        assert_eq!(tables.for_mode(MappingMode::Roles).get("r"), Some("RoleTarget"));
        assert_eq!(tables.for_mode(MappingMode::Roles).get("g"), None);
        assert_eq!(tables.for_mode(MappingMode::Groups).get("g"), Some("GroupTarget"));
    }

    #[test]
    fn embedded_table_has_console_roles() {
        let tables = MappingTables::embedded();
        assert_eq!(tables.role_mapping.len(), 4);
        assert_eq!(tables.role_mapping.get("Airflow.ProjectA"), Some("ProjectA"));
        assert!(tables.group_mapping.is_empty());
    }
}
