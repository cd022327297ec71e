//! Username normalization.

use crate::claims::ClaimSet;

/// Claims tried, in order, when choosing the console username.
pub const USERNAME_CLAIMS: [&str; 3] = ["preferred_username", "upn", "name"];

/// Picks the console username for a login.
///
/// Uses the first non-blank of `preferred_username`, `upn` and `name`;
/// when none is present the host-computed username is kept.
#[must_use]
pub fn normalize_username(claims: &ClaimSet, host_username: &str) -> String {
    USERNAME_CLAIMS
        .iter()
        .find_map(|key| claims.string_claim(key))
        .unwrap_or(host_username)
        .to_string()
}
