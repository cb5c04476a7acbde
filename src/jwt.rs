use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db;
use crate::errors::AppError;
use crate::models::rbac::UserGrants;

const DEFAULT_ISSUER: &str = "ecommerce-api";
const DEFAULT_AUDIENCE: &str = "ecommerce-clients";
const DEFAULT_EXPIRATION_MINUTES: i64 = 60;
/// One year.
pub const MAX_EXPIRATION_MINUTES: i64 = 525_600;

/// Size of the opaque refresh token before encoding.
pub const REFRESH_TOKEN_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub issuer: String,
    pub audience: String,
    pub expiration_minutes: i64,
    /// Emit full claim dumps at debug level. Off unless explicitly enabled.
    pub diagnostics: bool,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, issuer: impl Into<String>, audience: impl Into<String>, expiration_minutes: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            issuer: issuer.into(),
            audience: audience.into(),
            expiration_minutes,
            diagnostics: false,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| AppError::configuration("JWT_SECRET not set"))?;
        if secret.is_empty() {
            return Err(AppError::configuration("JWT_SECRET must not be empty"));
        }

        let expiration_minutes = parse_expiration_minutes(std::env::var("JWT_EXPIRATION_MINUTES").ok().as_deref())?;

        let diagnostics = std::env::var("AUTH_DIAGNOSTICS")
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            secret: Arc::new(secret.into_bytes()),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string()),
            expiration_minutes,
            diagnostics,
        })
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|err| AppError::token(err.to_string()))
    }

    /// Verify signature, issuer, audience and expiry, then return the claims.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let claims = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AppError::token("token expired"),
                _ => AppError::token(err.to_string()),
            })?;

        // A token whose expiry equals the current second is already spent.
        if claims.exp <= Utc::now().timestamp() {
            return Err(AppError::token("token expired"));
        }

        Ok(claims)
    }
}

/// Claim set carried by a session token.
///
/// Claim values follow the string convention of the wire format: `userId`
/// holds the decimal id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    #[serde(rename = "role", default)]
    pub roles: Vec<String>,
    #[serde(rename = "permission", default)]
    pub permissions: Vec<String>,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Claim names present in this set, for logging without values.
    pub fn claim_names(&self) -> Vec<&'static str> {
        let mut names = vec!["userId", "email", "iss", "aud", "exp", "iat"];
        if !self.roles.is_empty() {
            names.push("role");
        }
        if !self.permissions.is_empty() {
            names.push("permission");
        }
        names
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints signed session tokens embedding a snapshot of the user's grants.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    config: Arc<JwtConfig>,
}

impl TokenIssuer {
    pub fn new(config: Arc<JwtConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Look the user up by email with all roles and permissions and sign a token for it.
    pub async fn issue_session_token(&self, pool: &SqlitePool, email: &str) -> Result<IssuedToken, AppError> {
        let grants = db::users::find_with_grants(pool, email)
            .await?
            .ok_or_else(|| {
                tracing::warn!("token requested for unknown user");
                AppError::not_found("user not found")
            })?;

        self.issue_for(&grants)
    }

    /// Sign a token for an already resolved user.
    pub fn issue_for(&self, grants: &UserGrants) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let expires_at = Duration::try_minutes(self.config.expiration_minutes)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| AppError::configuration("session token lifetime is out of range"))?;

        let claims = Claims {
            user_id: grants.user.id.to_string(),
            email: grants.user.email.clone(),
            roles: grants.role_names(),
            permissions: grants.permission_names().into_iter().collect(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        tracing::debug!(
            user_id = grants.user.id,
            claims = ?claims.claim_names(),
            roles = claims.roles.len(),
            permissions = claims.permissions.len(),
            "issuing session token"
        );
        if self.config.diagnostics {
            tracing::debug!(user_id = grants.user.id, claims = ?claims, "session token claim dump");
        }

        let token = self.config.encode(&claims)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Opaque refresh token: random bytes from the OS generator, base64 encoded.
    pub fn issue_refresh_token(&self) -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        STANDARD.encode(bytes)
    }
}

fn parse_expiration_minutes(raw: Option<&str>) -> Result<i64, AppError> {
    let Some(val) = raw else {
        return Ok(DEFAULT_EXPIRATION_MINUTES);
    };
    let minutes = val
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::configuration("JWT_EXPIRATION_MINUTES must be a valid integer"))?;
    if !(0..=MAX_EXPIRATION_MINUTES).contains(&minutes) {
        return Err(AppError::configuration(format!(
            "JWT_EXPIRATION_MINUTES must be between 0 and {MAX_EXPIRATION_MINUTES}"
        )));
    }
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::rbac::RoleGrant;
    use crate::models::user::DbUser;

    fn grants() -> UserGrants {
        let now = Utc::now();
        UserGrants {
            user: DbUser {
                id: 42,
                full_name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                password_hash: String::new(),
                password_salt: String::new(),
                phone_number: String::new(),
                is_deleted: false,
                created_at: now,
                updated_at: now,
            },
            roles: vec![
                RoleGrant {
                    name: "User".to_string(),
                    permissions: vec!["Order_GetAll".to_string(), "Product_GetAll".to_string()],
                },
                RoleGrant {
                    name: "Support".to_string(),
                    permissions: vec!["Order_GetAll".to_string(), "Order_Update".to_string()],
                },
            ],
        }
    }

    fn issuer(ttl_minutes: i64) -> TokenIssuer {
        TokenIssuer::new(Arc::new(JwtConfig::new("test-secret", "issuer", "audience", ttl_minutes)))
    }

    #[test]
    fn issued_token_round_trips_through_decode() {
        let issuer = issuer(30);
        let issued = issuer.issue_for(&grants()).unwrap();

        let claims = issuer.config().decode(&issued.token).unwrap();
        assert_eq!(claims.user_id, "42");
        assert_eq!(claims.email, "jane@example.com");
        assert_eq!(claims.roles, vec!["User".to_string(), "Support".to_string()]);
        assert_eq!(claims.iss, "issuer");
        assert_eq!(claims.aud, "audience");
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn permissions_are_flattened_across_roles() {
        let issued = issuer(30).issue_for(&grants()).unwrap();
        let claims = issuer(30).config().decode(&issued.token).unwrap();

        assert_eq!(
            claims.permissions,
            vec!["Order_GetAll".to_string(), "Order_Update".to_string(), "Product_GetAll".to_string()]
        );
    }

    #[test]
    fn zero_ttl_tokens_are_rejected() {
        let issuer = issuer(0);
        let issued = issuer.issue_for(&grants()).unwrap();
        let err = issuer.config().decode(&issued.token).unwrap_err();
        assert!(matches!(err, AppError::Token(_)));
    }

    #[test]
    fn wrong_secret_issuer_or_audience_is_rejected() {
        let issued = issuer(30).issue_for(&grants()).unwrap();

        let other_secret = JwtConfig::new("other-secret", "issuer", "audience", 30);
        assert!(other_secret.decode(&issued.token).is_err());

        let other_issuer = JwtConfig::new("test-secret", "someone-else", "audience", 30);
        assert!(other_issuer.decode(&issued.token).is_err());

        let other_audience = JwtConfig::new("test-secret", "issuer", "mobile", 30);
        assert!(other_audience.decode(&issued.token).is_err());
    }

    #[test]
    fn refresh_tokens_are_64_random_bytes() {
        let issuer = issuer(30);
        let first = issuer.issue_refresh_token();
        let second = issuer.issue_refresh_token();

        assert_eq!(STANDARD.decode(&first).unwrap().len(), REFRESH_TOKEN_BYTES);
        assert_ne!(first, second);
    }

    #[test]
    fn expiration_minutes_are_bounded() {
        assert_eq!(parse_expiration_minutes(None).unwrap(), 60);
        assert_eq!(parse_expiration_minutes(Some("0")).unwrap(), 0);
        assert_eq!(parse_expiration_minutes(Some("525600")).unwrap(), MAX_EXPIRATION_MINUTES);
        assert!(matches!(parse_expiration_minutes(Some("525601")), Err(AppError::Configuration(_))));
        assert!(matches!(parse_expiration_minutes(Some("1000000000000")), Err(AppError::Configuration(_))));
        assert!(matches!(parse_expiration_minutes(Some("-1")), Err(AppError::Configuration(_))));
    }

    #[test]
    fn out_of_range_lifetime_fails_instead_of_panicking() {
        let err = issuer(1_000_000_000_000).issue_for(&grants()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));

        let err = issuer(i64::MAX).issue_for(&grants()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
