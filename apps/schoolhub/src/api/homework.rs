use super::{ApiResult, AppState, AuthUser, Body, done, today};
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use schoolhub_core::Reader;
use schoolhub_core::homework::{self, Homework, HomeworkInput, HomeworkUpdate};
use serde_json::Value;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/upcoming", get(upcoming))
        .route("/class/{class_id}", get(by_class))
        .route("/class/{class_id}/section/{section_id}", get(by_class_section))
        .route("/{id}", put(update).delete(remove))
}

async fn list(State(s): State<AppState>, _user: AuthUser) -> ApiResult<Json<Vec<Homework>>> {
    Ok(Json(s.read(|r| r.list::<Homework>()).await?))
}

async fn by_class(
    State(s): State<AppState>,
    _user: AuthUser,
    Path(class_id): Path<u64>,
) -> ApiResult<Json<Vec<Homework>>> {
    Ok(Json(s.read(move |r| homework::by_class(r, class_id)).await?))
}

async fn by_class_section(
    State(s): State<AppState>,
    _user: AuthUser,
    Path((class_id, section_id)): Path<(u64, u64)>,
) -> ApiResult<Json<Vec<Homework>>> {
    Ok(Json(
        s.read(move |r| homework::by_class_section(r, class_id, section_id))
            .await?,
    ))
}

async fn upcoming(State(s): State<AppState>, _user: AuthUser) -> ApiResult<Json<Vec<Homework>>> {
    let day = today();
    Ok(Json(s.read(move |r| homework::upcoming(r, day)).await?))
}

async fn create(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<HomeworkInput>,
) -> ApiResult<Json<Homework>> {
    user.staff()?;
    let caller = user.teacher_id();
    Ok(Json(
        s.write(move |tx| homework::create(tx, input, caller))
            .await?,
    ))
}

async fn update(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<HomeworkUpdate>,
) -> ApiResult<Json<Homework>> {
    user.staff()?;
    Ok(Json(s.write(move |tx| homework::update(tx, id, input)).await?))
}

async fn remove(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.staff()?;
    s.write(move |tx| homework::delete(tx, id)).await?;
    Ok(done("Homework deleted successfully"))
}
