//! Login and registration.
//!
//! Expected failures (unknown user, wrong password, duplicate or malformed
//! email, short password) come back as a failed [`ApiResult`]. Only storage,
//! configuration and signing problems surface as [`AppError`].

use sqlx::SqlitePool;

use crate::authz::roles;
use crate::db;
use crate::db::users::NewUser;
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, AuthAttempt, EventBus, RequestContext};
use crate::jwt::TokenIssuer;
use crate::models::api_result::ApiResult;
use crate::models::user::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, User};
use crate::password::{generate_salt, PasswordHasher, MIN_PASSWORD_LENGTH};
use crate::utils::is_valid_email;

pub const USER_NOT_FOUND: &str = "User not found or deleted.";
pub const INVALID_PASSWORD: &str = "Invalid password.";
pub const USER_EXISTS: &str = "User already exists.";
pub const INVALID_EMAIL: &str = "Invalid email address.";
pub const REGISTERED: &str = "User registered successfully.";

#[derive(Debug, Clone)]
pub struct AuthService {
    pool: SqlitePool,
    tokens: TokenIssuer,
    events: EventBus,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(pool: SqlitePool, tokens: TokenIssuer, events: EventBus) -> Self {
        Self {
            pool,
            tokens,
            events,
            hasher: PasswordHasher::new(),
        }
    }

    pub async fn login(&self, req: LoginRequest, context: Option<RequestContext>) -> AppResult<ApiResult<LoginResponse>> {
        let Some(grants) = db::users::find_with_grants(&self.pool, &req.email).await? else {
            tracing::info!("login rejected: unknown or deleted user");
            self.record_attempt("login_failed", None, &req.email, USER_NOT_FOUND, context);
            return Ok(ApiResult::failure(USER_NOT_FOUND));
        };

        let stored_hash = grants.user.password_hash.clone();
        let salt = grants.user.password_salt.clone();
        let verified = self.hash_blocking(move |hasher| hasher.verify(&stored_hash, &req.password, &salt)).await?;

        if !verified {
            tracing::info!(user_id = grants.user.id, "login rejected: invalid password");
            self.record_attempt("login_failed", Some(grants.user.id), &grants.user.email, INVALID_PASSWORD, context);
            return Ok(ApiResult::failure(INVALID_PASSWORD));
        }

        let issued = self.tokens.issue_for(&grants)?;
        let refresh_token = self.tokens.issue_refresh_token();
        let role = grants.role_names().join(",");

        tracing::info!(user_id = grants.user.id, roles = %role, "login succeeded");
        let attempt = AuthAttempt {
            user_id: Some(grants.user.id),
            email: grants.user.email.clone(),
            reason: None,
        };
        log_activity_with_context(&self.events, "login_succeeded", Some(grants.user.id), &attempt, None, context);

        Ok(ApiResult::success(LoginResponse {
            access_token: issued.token,
            refresh_token,
            role,
        }))
    }

    pub async fn register(&self, req: RegisterRequest, context: Option<RequestContext>) -> AppResult<ApiResult<RegisterResponse>> {
        if db::users::email_exists(&self.pool, &req.email).await? {
            tracing::info!("registration rejected: email already registered");
            return Ok(ApiResult::failure(USER_EXISTS));
        }

        if let Some(problem) = validate_registration(&req) {
            tracing::info!(reason = %problem, "registration rejected");
            return Ok(ApiResult::failure(problem));
        }

        let salt = generate_salt();
        let password = req.password;
        let hash_salt = salt.clone();
        let password_hash = self.hash_blocking(move |hasher| hasher.encrypt(&password, &hash_salt)).await?;

        let new_user = NewUser {
            full_name: req.full_name,
            email: req.email,
            password_hash,
            password_salt: salt,
            phone_number: req.phone_number,
        };

        let user = match db::users::create_with_role(&self.pool, new_user, roles::USER).await {
            Ok(user) => user,
            // Lost a race with a concurrent registration of the same email.
            Err(AppError::Conflict(_)) => return Ok(ApiResult::failure(USER_EXISTS)),
            Err(err) => return Err(err),
        };

        tracing::info!(user_id = user.id, "user registered");
        let email = user.email.clone();
        log_activity_with_context(&self.events, "registered", Some(user.id), &User::from(user), None, context);

        Ok(ApiResult::success(RegisterResponse {
            email,
            message: REGISTERED.to_string(),
        }))
    }

    fn record_attempt(&self, action: &str, user_id: Option<i64>, email: &str, reason: &str, context: Option<RequestContext>) {
        let attempt = AuthAttempt {
            user_id,
            email: email.to_string(),
            reason: Some(reason.to_string()),
        };
        log_activity_with_context(&self.events, action, user_id, &attempt, None, context);
    }

    /// Argon2 is CPU bound; keep it off the async workers.
    async fn hash_blocking<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(PasswordHasher) -> AppResult<T> + Send + 'static,
    {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || f(hasher))
            .await
            .map_err(|err| AppError::internal(format!("password hashing task failed: {err}")))?
    }
}

/// Format checks applied before anything is written.
pub fn validate_registration(req: &RegisterRequest) -> Option<String> {
    if !is_valid_email(&req.email) {
        return Some(INVALID_EMAIL.to_string());
    }
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some(format!("Password must be at least {MIN_PASSWORD_LENGTH} characters."));
    }
    if req.full_name.trim().is_empty() {
        return Some("Full name is required.".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            full_name: "Jane Doe".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            phone_number: "555-0100".to_string(),
        }
    }

    #[test]
    fn well_formed_registration_passes() {
        assert_eq!(validate_registration(&request("jane@example.com", "secret123")), None);
    }

    #[test]
    fn malformed_email_is_rejected() {
        assert_eq!(
            validate_registration(&request("jane.example.com", "secret123")).as_deref(),
            Some(INVALID_EMAIL)
        );
    }

    #[test]
    fn short_password_is_rejected() {
        let problem = validate_registration(&request("jane@example.com", "short")).unwrap();
        assert!(problem.contains("at least 8"));
    }

    #[test]
    fn blank_full_name_is_rejected() {
        let mut req = request("jane@example.com", "secret123");
        req.full_name = "   ".to_string();
        assert!(validate_registration(&req).is_some());
    }
}
