#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use ecommerce_api::config::{AdminSeed, AppConfig};
use ecommerce_api::create_app_with_config;
use ecommerce_api::jwt::JwtConfig;

pub const SECRET: &str = "test-secret";
pub const ISSUER: &str = "ecommerce-api";
pub const AUDIENCE: &str = "ecommerce-clients";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "adminadmin";

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    // Keeps the database file alive for the test's duration.
    _dir: TempDir,
}

pub fn jwt_config(ttl_minutes: i64) -> JwtConfig {
    JwtConfig::new(SECRET, ISSUER, AUDIENCE, ttl_minutes)
}

pub async fn migrated_pool(dir: &TempDir) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;
    Ok(pool)
}

pub async fn setup() -> Result<TestApp> {
    let dir = tempdir().context("failed to create tempdir")?;
    let pool = migrated_pool(&dir).await?;

    let config = AppConfig {
        jwt: jwt_config(60),
        admin: AdminSeed::default(),
        request_timeout: Duration::from_secs(30),
    };
    let app = create_app_with_config(pool.clone(), config).await?;

    Ok(TestApp { app, pool, _dir: dir })
}

impl TestApp {
    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };
        Ok((status, json))
    }

    pub async fn register(&self, full_name: &str, email: &str, password: &str) -> Result<(StatusCode, Value)> {
        let body = serde_json::json!({
            "fullName": full_name,
            "email": email,
            "password": password,
            "phoneNumber": "555-0100"
        });
        self.send("POST", "/auth/register", None, Some(body)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(StatusCode, Value)> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.send("POST", "/auth/login", None, Some(body)).await
    }

    /// Access token of a successful login; panics with the envelope otherwise.
    pub async fn token_for(&self, email: &str, password: &str) -> Result<String> {
        let (status, body) = self.login(email, password).await?;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["accessToken"]
            .as_str()
            .map(str::to_string)
            .context("missing accessToken")
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn user_id(&self, email: &str) -> Result<i64> {
        let id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }
}

/// Decode a token with the test configuration.
pub fn claims(token: &str) -> Result<ecommerce_api::jwt::Claims> {
    Ok(jwt_config(60).decode(token)?)
}
