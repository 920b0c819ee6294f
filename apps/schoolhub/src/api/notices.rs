use super::{ApiResult, AppState, AuthUser, Body, done};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use schoolhub_core::Reader;
use schoolhub_core::notices::{self, Notice, NoticeInput};
use serde_json::Value;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/published", get(published))
        .route("/{id}", get(fetch).put(update).delete(remove))
}

async fn list(State(s): State<AppState>, _user: AuthUser) -> ApiResult<Json<Vec<Notice>>> {
    Ok(Json(s.read(|r| r.list::<Notice>()).await?))
}

async fn published(State(s): State<AppState>, _user: AuthUser) -> ApiResult<Json<Vec<Notice>>> {
    Ok(Json(s.read(|r| notices::published(r)).await?))
}

async fn fetch(
    State(s): State<AppState>,
    _user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Notice>> {
    Ok(Json(s.read(move |r| r.fetch::<Notice>(id)).await?))
}

async fn create(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<NoticeInput>,
) -> ApiResult<Json<Notice>> {
    user.staff()?;
    let actor = user.username;
    Ok(Json(
        s.write(move |tx| notices::create(tx, input, &actor))
            .await?,
    ))
}

async fn update(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<NoticeInput>,
) -> ApiResult<Json<Notice>> {
    user.staff()?;
    Ok(Json(s.write(move |tx| notices::update(tx, id, input)).await?))
}

async fn remove(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| notices::delete(tx, id)).await?;
    Ok(done("Notice deleted successfully"))
}
