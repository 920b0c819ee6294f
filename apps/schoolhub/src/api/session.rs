//! Login, logout and token checks.

use super::{ApiError, ApiResult, AppState, AuthUser, Body, done};
use crate::auth::verify_password;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use schoolhub_core::Reader;
use schoolhub_core::users::{User, UserView, find_by_username};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/check", get(check))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    #[serde(rename = "type")]
    token_type: &'static str,
    #[serde(flatten)]
    user: UserView,
}

async fn login(
    State(state): State<AppState>,
    Body(req): Body<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if !state.login_allowed(&req.username) {
        warn!(username = %req.username, "login rate limit exceeded");
        return Err(ApiError::RateLimited(
            "Too many login attempts, try again later".into(),
        ));
    }
    let invalid = || ApiError::Unauthorized("Invalid username or password".into());

    let username = req.username.clone();
    let user = state
        .read(move |r| find_by_username(r, &username))
        .await?
        .ok_or_else(invalid)?;

    let password = req.password;
    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;
    if !matches {
        return Err(invalid());
    }
    if !user.active {
        return Err(ApiError::Unauthorized("Account is disabled".into()));
    }

    let token = state
        .keys()
        .issue(&user, Utc::now().timestamp())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(username = %user.username, role = %user.role, "login");
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        user: UserView::from(&user),
    }))
}

async fn logout(_user: AuthUser) -> Json<Value> {
    done("Logout successful")
}

async fn check(_user: AuthUser) -> Json<Value> {
    Json(json!({"message": "Authentication working"}))
}

async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<UserView>> {
    let id = user.id;
    let found = state.read(move |r| r.fetch::<User>(id)).await?;
    Ok(Json(UserView::from(&found)))
}
