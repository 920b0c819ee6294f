use super::{ApiResult, AppState, AuthUser, Body};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use schoolhub_core::school::{self, ProfileInput, SchoolProfile};

pub fn routes() -> Router<AppState> {
    Router::new().route("/profile", get(fetch).put(save))
}

/// `null` until an admin saves a profile.
async fn fetch(State(s): State<AppState>, _user: AuthUser) -> ApiResult<Json<Option<SchoolProfile>>> {
    Ok(Json(s.read(|r| school::profile(r)).await?))
}

async fn save(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<ProfileInput>,
) -> ApiResult<Json<SchoolProfile>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| school::save_profile(tx, input)).await?))
}
