use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppState;
use crate::db;
use crate::errors::{AppError, AppResult};
use crate::models::api_result::ApiResult;
use crate::models::user::Profile;
use crate::session::NO_IDENTITY;

pub fn routes() -> Router<AppState> {
    Router::new().route("/user/profile", get(profile))
}

/// Profile of the caller identified by the session token
#[utoipa::path(
    get,
    path = "/api/user/profile",
    tag = "Users",
    responses(
        (status = 200, description = "Caller's profile", body = Profile),
        (status = 401, description = "No identity in the session token"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearerAuth" = []))
)]
pub async fn profile(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<ApiResult<Profile>>> {
    let user_id = state.sessions.extract_user_id(&headers);
    if user_id == NO_IDENTITY {
        return Err(AppError::unauthorized("authentication required"));
    }

    let user = db::users::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(ApiResult::success(Profile::from(user))))
}
