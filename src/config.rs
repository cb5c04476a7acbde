use std::time::Duration;

use crate::errors::AppError;
use crate::jwt::JwtConfig;

const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
const DEFAULT_ADMIN_PASSWORD: &str = "adminadmin";
const DEFAULT_ADMIN_FULL_NAME: &str = "Admin User";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Account created at startup and linked to the `Admin` role.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl AdminSeed {
    pub fn from_env() -> Self {
        Self {
            email: env_or("ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
            password: env_or("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            full_name: env_or("ADMIN_FULL_NAME", DEFAULT_ADMIN_FULL_NAME),
        }
    }

    pub fn uses_default_password(&self) -> bool {
        self.password == DEFAULT_ADMIN_PASSWORD
    }
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
            full_name: DEFAULT_ADMIN_FULL_NAME.to_string(),
        }
    }
}

/// Process-wide settings, loaded once and never mutated.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub admin: AdminSeed,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let request_timeout = parse_request_timeout(std::env::var("REQUEST_TIMEOUT_SECS").ok().as_deref())?;

        Ok(Self {
            jwt: JwtConfig::from_env()?,
            admin: AdminSeed::from_env(),
            request_timeout,
        })
    }
}

fn parse_request_timeout(raw: Option<&str>) -> Result<Duration, AppError> {
    let secs = match raw {
        Some(val) => val.trim().parse::<u64>().ok().filter(|secs| *secs > 0),
        None => Some(DEFAULT_REQUEST_TIMEOUT_SECS),
    };
    secs.map(Duration::from_secs)
        .ok_or_else(|| AppError::configuration("REQUEST_TIMEOUT_SECS must be a positive integer"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
