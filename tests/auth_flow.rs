mod common;

use anyhow::Result;
use axum::http::StatusCode;

use common::setup;

#[tokio::test]
async fn register_then_login_issues_user_session() -> Result<()> {
    let t = setup().await?;

    let (status, body) = t.register("Jane", "jane@x.io", "secret123").await?;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    assert_eq!(body["succeeded"], true);
    assert_eq!(body["data"]["email"], "jane@x.io");
    assert_eq!(body["errors"], "");

    let (status, body) = t.login("jane@x.io", "secret123").await?;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert_eq!(body["succeeded"], true);
    assert_eq!(body["data"]["role"], "User");
    assert!(!body["data"]["refreshToken"].as_str().unwrap_or_default().is_empty());

    let token = body["data"]["accessToken"].as_str().unwrap_or_default();
    let claims = common::claims(token)?;
    let user_id = t.user_id("jane@x.io").await?;
    assert_eq!(claims.user_id, user_id.to_string());
    assert_eq!(claims.email, "jane@x.io");
    assert_eq!(claims.roles, vec!["User".to_string()]);
    assert!(claims.permissions.contains(&"Product_GetAll".to_string()));
    assert!(!claims.permissions.contains(&"Product_Delete".to_string()));

    Ok(())
}

#[tokio::test]
async fn wrong_password_yields_failure_without_token() -> Result<()> {
    let t = setup().await?;
    t.register("Jane", "jane@x.io", "secret123").await?;

    let (status, body) = t.login("jane@x.io", "wrong").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["succeeded"], false);
    assert_eq!(body["errors"], "Invalid password.");
    assert!(body["data"].is_null());

    Ok(())
}

#[tokio::test]
async fn unknown_email_yields_failure() -> Result<()> {
    let t = setup().await?;

    let (status, body) = t.login("nobody@x.io", "secret123").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["succeeded"], false);
    assert_eq!(body["errors"], "User not found or deleted.");

    Ok(())
}

#[tokio::test]
async fn soft_deleted_user_cannot_log_in() -> Result<()> {
    let t = setup().await?;
    t.register("Jane", "jane@x.io", "secret123").await?;

    sqlx::query("UPDATE users SET is_deleted = 1 WHERE email = ?")
        .bind("jane@x.io")
        .execute(&t.pool)
        .await?;

    let (status, body) = t.login("jane@x.io", "secret123").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], "User not found or deleted.");

    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_rejected() -> Result<()> {
    let t = setup().await?;
    t.register("Jane", "jane@x.io", "secret123").await?;

    let (status, body) = t.register("Jane Again", "jane@x.io", "another123").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["succeeded"], false);
    assert_eq!(body["errors"], "User already exists.");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind("jane@x.io")
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(count, 1);

    Ok(())
}

#[tokio::test]
async fn malformed_email_and_short_password_are_rejected() -> Result<()> {
    let t = setup().await?;

    let (status, body) = t.register("Jane", "not-an-email", "secret123").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"], "Invalid email address.");

    let (status, body) = t.register("Jane", "jane@x.io", "short").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["succeeded"], false);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email IN ('not-an-email', 'jane@x.io')")
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(count, 0);

    Ok(())
}

#[tokio::test]
async fn registration_links_the_default_role() -> Result<()> {
    let t = setup().await?;
    t.register("Jane", "jane@x.io", "secret123").await?;

    let roles: Vec<String> = sqlx::query_scalar(
        "SELECT r.name FROM roles r JOIN user_roles ur ON ur.role_id = r.id JOIN users u ON u.id = ur.user_id WHERE u.email = ?",
    )
    .bind("jane@x.io")
    .fetch_all(&t.pool)
    .await?;
    assert_eq!(roles, vec!["User".to_string()]);

    let (hash, salt): (String, String) = sqlx::query_as("SELECT password_hash, password_salt FROM users WHERE email = ?")
        .bind("jane@x.io")
        .fetch_one(&t.pool)
        .await?;
    assert_ne!(hash, "secret123");
    assert!(!salt.is_empty());

    Ok(())
}

#[tokio::test]
async fn missing_default_role_aborts_registration_without_orphan_user() -> Result<()> {
    let t = setup().await?;
    sqlx::query("UPDATE roles SET is_deleted = 1 WHERE name = 'User'")
        .execute(&t.pool)
        .await?;

    let (status, body) = t.register("Jane", "jane@x.io", "secret123").await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["succeeded"], false);
    assert_eq!(body["errors"], "An unexpected error occurred.");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind("jane@x.io")
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(count, 0);

    Ok(())
}

#[tokio::test]
async fn seeded_admin_logs_in_with_every_permission() -> Result<()> {
    let t = setup().await?;

    let (status, body) = t.login(common::ADMIN_EMAIL, common::ADMIN_PASSWORD).await?;
    assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
    assert_eq!(body["data"]["role"], "Admin");

    let token = body["data"]["accessToken"].as_str().unwrap_or_default();
    let claims = common::claims(token)?;
    assert_eq!(claims.permissions.len(), ecommerce_api::authz::Permission::ALL.len());
    assert!(claims.permissions.contains(&"AdminPermission".to_string()));

    Ok(())
}
