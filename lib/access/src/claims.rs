//! Identity claims from the provider's token-exchange response.
//!
//! The response carries an `id_token` and, depending on the provider, a
//! `userinfo` object. Claims are read from the id_token first; userinfo is
//! only consulted when the id_token does not carry a usable value.

use crate::config::MappingMode;
use crate::error::LoginError;
use base64::Engine;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// The provider response handed to the login hook.
///
/// `id_token` is either the compact JWT string or an object holding claims
/// the host already decoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub id_token: Option<Value>,
    #[serde(default)]
    pub userinfo: Option<Map<String, Value>>,
}

/// Decoded claims of one login transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet {
    id_token: Map<String, Value>,
    userinfo: Map<String, Value>,
}

impl ClaimSet {
    /// Creates a claim set from already-decoded maps.
    #[must_use]
    pub fn new(id_token: Map<String, Value>, userinfo: Map<String, Value>) -> Self {
        Self { id_token, userinfo }
    }

    /// Decodes the claims carried by a provider response.
    ///
    /// The JWT signature is not checked here: the host validated the token
    /// during the exchange and only the payload is needed.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::InvalidResponse` if the id_token is neither an
    /// object nor a decodable compact JWT.
    pub fn from_response(response: &ProviderResponse) -> Result<Self, Report<LoginError>> {
        let id_token = match &response.id_token {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(claims)) => claims.clone(),
            Some(Value::String(jwt)) => decode_jwt_payload(jwt)?,
            Some(other) => {
                return Err(LoginError::InvalidResponse {
                    reason: format!("id_token has unexpected JSON type: {}", json_type(other)),
                }
                .into());
            }
        };

        Ok(Self {
            id_token,
            userinfo: response.userinfo.clone().unwrap_or_default(),
        })
    }

    /// Returns the id_token claims.
    #[must_use]
    pub fn id_token(&self) -> &Map<String, Value> {
        &self.id_token
    }

    /// Returns the userinfo claims.
    #[must_use]
    pub fn userinfo(&self) -> &Map<String, Value> {
        &self.userinfo
    }

    /// Returns a non-blank string claim, preferring the id_token.
    #[must_use]
    pub fn string_claim(&self, key: &str) -> Option<&str> {
        non_blank_str(self.id_token.get(key)).or_else(|| non_blank_str(self.userinfo.get(key)))
    }

    /// Returns a list claim, preferring the id_token when it is non-empty.
    ///
    /// A bare string counts as a one-element list. Non-string entries are
    /// skipped.
    #[must_use]
    pub fn list_claim(&self, key: &str) -> Vec<String> {
        let from_id_token = string_list(self.id_token.get(key));
        if !from_id_token.is_empty() {
            return from_id_token;
        }
        string_list(self.userinfo.get(key))
    }
}

/// Reads the claim values that drive role mapping in the given mode.
///
/// An empty result is not an error: the caller falls back to the default
/// role. It is logged because it usually means the app registration does
/// not emit the claim.
#[must_use]
pub fn extract_claims(claims: &ClaimSet, mode: MappingMode) -> Vec<String> {
    let values = claims.list_claim(mode.claim_key());
    if values.is_empty() {
        warn!(
            claim = mode.claim_key(),
            "no claims found in id_token or userinfo"
        );
    }
    values
}

fn decode_jwt_payload(jwt: &str) -> Result<Map<String, Value>, Report<LoginError>> {
    // header.payload.signature
    let mut parts = jwt.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(LoginError::InvalidResponse {
            reason: "id_token is not a compact JWT".to_string(),
        }
        .into());
    };

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| LoginError::InvalidResponse {
            reason: format!("id_token payload is not base64url: {e}"),
        })?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(other) => Err(LoginError::InvalidResponse {
            reason: format!("id_token payload is a JSON {}", json_type(&other)),
        }
        .into()),
        Err(e) => Err(LoginError::InvalidResponse {
            reason: format!("id_token payload is not JSON: {e}"),
        }
        .into()),
    }
}

fn non_blank_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) if !single.is_empty() => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn compact_jwt(payload: &Value) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.{}",
            engine.encode(br#"{"alg":"RS256","typ":"JWT"}"#),
            engine.encode(payload.to_string()),
            engine.encode(b"signature")
        )
    }

    #[test]
    fn decodes_compact_jwt_id_token() {
        let response = ProviderResponse {
            id_token: Some(Value::String(compact_jwt(&json!({
                "oid": "0000-1111",
                "roles": ["Airflow.Admin"]
            })))),
            userinfo: None,
        };

        let claims = ClaimSet::from_response(&response).expect("decode");
        assert_eq!(claims.string_claim("oid"), Some("0000-1111"));
        assert_eq!(claims.list_claim("roles"), vec!["Airflow.Admin"]);
    }

    #[test]
    fn accepts_pre_decoded_id_token() {
        let response = ProviderResponse {
            id_token: Some(json!({"upn": "alice@contoso.com"})),
            userinfo: None,
        };

        let claims = ClaimSet::from_response(&response).expect("decode");
        assert_eq!(claims.string_claim("upn"), Some("alice@contoso.com"));
    }

    #[test]
    fn rejects_malformed_jwt() {
        let response = ProviderResponse {
            id_token: Some(Value::String("only.two".to_string())),
            userinfo: None,
        };
        assert!(ClaimSet::from_response(&response).is_err());

        let response = ProviderResponse {
            id_token: Some(Value::String("a.!!!.c".to_string())),
            userinfo: None,
        };
        assert!(ClaimSet::from_response(&response).is_err());
    }

    #[test]
    fn rejects_non_object_id_token() {
        let response = ProviderResponse {
            id_token: Some(json!(42)),
            userinfo: None,
        };
        let err = ClaimSet::from_response(&response).unwrap_err();
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn id_token_roles_take_precedence() {
        let claims = ClaimSet::new(
            object(json!({"roles": ["Airflow.Admin"]})),
            object(json!({"roles": ["Airflow.Viewer"]})),
        );
        assert_eq!(extract_claims(&claims, MappingMode::Roles), vec!["Airflow.Admin"]);
    }

    #[test]
    fn falls_back_to_userinfo_when_id_token_list_is_empty() {
        let claims = ClaimSet::new(
            object(json!({"groups": []})),
            object(json!({"groups": ["g-1", "g-2"]})),
        );
        assert_eq!(extract_claims(&claims, MappingMode::Groups), vec!["g-1", "g-2"]);
    }

    #[test]
    fn mode_selects_claim_key() {
        let claims = ClaimSet::new(
            object(json!({"roles": ["Airflow.Admin"], "groups": ["g-1"]})),
            Map::new(),
        );
        assert_eq!(extract_claims(&claims, MappingMode::Roles), vec!["Airflow.Admin"]);
        assert_eq!(extract_claims(&claims, MappingMode::Groups), vec!["g-1"]);
    }

    #[test]
    fn single_string_claim_becomes_list() {
        let claims = ClaimSet::new(object(json!({"roles": "Airflow.Viewer"})), Map::new());
        assert_eq!(claims.list_claim("roles"), vec!["Airflow.Viewer"]);
    }

    #[test]
    fn non_string_entries_are_skipped() {
        let claims = ClaimSet::new(object(json!({"roles": ["A", 7, null, "B"]})), Map::new());
        assert_eq!(claims.list_claim("roles"), vec!["A", "B"]);
    }

    #[test]
    fn missing_claims_yield_empty_list() {
        let claims = ClaimSet::default();
        assert!(extract_claims(&claims, MappingMode::Roles).is_empty());
    }

    #[test]
    fn blank_string_claim_falls_through_to_userinfo() {
        let claims = ClaimSet::new(
            object(json!({"name": "  "})),
            object(json!({"name": "Alice"})),
        );
        assert_eq!(claims.string_claim("name"), Some("Alice"));
    }
}
