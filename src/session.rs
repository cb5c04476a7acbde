//! Identity extraction from the `Authorization` header.
//!
//! Claims are read *without* re-verifying the signature. Routes that use this
//! sit behind [`crate::authz::authenticate`], which has already rejected
//! unsigned, expired or foreign tokens.

use std::collections::HashSet;

use axum::http::{header, HeaderMap};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

/// Returned by [`SessionAuthenticator::extract_user_id`] when no identity is present.
pub const NO_IDENTITY: i64 = -1;

const BEARER_PREFIX: &str = "Bearer ";

/// Raw claim set of an inbound token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// All string values of a claim, whether it was emitted once or repeated.
    pub fn values(&self, name: &str) -> Vec<&str> {
        match self.0.get(name) {
            Some(Value::String(value)) => vec![value.as_str()],
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// The numeric `userId` claim, accepting a JSON number or a decimal string.
    pub fn user_id(&self) -> Option<i64> {
        match self.0.get("userId")? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionAuthenticator;

impl SessionAuthenticator {
    pub fn new() -> Self {
        Self
    }

    /// Parse the bearer token's claims. `None` when the header is absent,
    /// uses another scheme, or the token is not a well-formed JWT.
    pub fn extract_claims(&self, headers: &HeaderMap) -> Option<ClaimSet> {
        let token = bearer_token(headers)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        match jsonwebtoken::decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &validation) {
            Ok(data) => Some(ClaimSet::new(data.claims)),
            Err(err) => {
                tracing::warn!(reason = %err, "malformed bearer token");
                None
            }
        }
    }

    /// The caller's user id, or [`NO_IDENTITY`] when it cannot be determined.
    pub fn extract_user_id(&self, headers: &HeaderMap) -> i64 {
        let Some(claims) = self.extract_claims(headers) else {
            return NO_IDENTITY;
        };

        match claims.user_id() {
            Some(user_id) => user_id,
            None => {
                tracing::warn!(claims = ?claims.names(), "userId claim missing or not numeric");
                NO_IDENTITY
            }
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
