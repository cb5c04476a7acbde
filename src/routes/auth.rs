use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};

use crate::app::AppState;
use crate::errors::AppResult;
use crate::events::RequestContext;
use crate::models::api_result::ApiResult;
use crate::models::user::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use super::envelope;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Duplicate email, malformed email or short password")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResult<RegisterResponse>>)> {
    let result = state
        .auth
        .register(payload, Some(RequestContext::from_headers(&headers)))
        .await?;
    Ok(envelope(result))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Unknown user or invalid password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(StatusCode, Json<ApiResult<LoginResponse>>)> {
    let result = state
        .auth
        .login(payload, Some(RequestContext::from_headers(&headers)))
        .await?;
    Ok(envelope(result))
}
