//! Student enrolment, lookup and parent records.

use super::{ApiError, ApiResult, AppState, AuthUser, Body, done, hash_login, today};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use schoolhub_core::students::{self, NewStudent, Parent, Student, StudentUpdate};
use schoolhub_core::{Reader, Role};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route("/parent/{parent_id}", get(by_parent))
        .route("/class/{class_id}/section/{section_id}", get(by_class_section))
        .route("/{id}", get(fetch).put(update).delete(remove))
        .route("/{id}/parent", post(save_parent).get(parent))
}

async fn list(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Student>>> {
    user.staff()?;
    Ok(Json(s.read(|r| r.list::<Student>()).await?))
}

async fn fetch(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Student>> {
    s.ensure_student_visible(&user, id).await?;
    Ok(Json(s.read(move |r| r.fetch::<Student>(id)).await?))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    query: String,
}

async fn search(
    State(s): State<AppState>,
    user: AuthUser,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Student>>> {
    user.staff()?;
    Ok(Json(s.read(move |r| students::search(r, &q.query)).await?))
}

async fn by_parent(
    State(s): State<AppState>,
    user: AuthUser,
    Path(parent_id): Path<u64>,
) -> ApiResult<Json<Vec<Student>>> {
    if user.role == Role::Parent && user.entity_id != Some(parent_id) {
        return Err(ApiError::Forbidden("Access denied".into()));
    }
    Ok(Json(s.read(move |r| students::by_parent(r, parent_id)).await?))
}

async fn by_class_section(
    State(s): State<AppState>,
    user: AuthUser,
    Path((class_id, section_id)): Path<(u64, u64)>,
) -> ApiResult<Json<Vec<Student>>> {
    user.staff()?;
    Ok(Json(
        s.read(move |r| students::by_class_section(r, class_id, section_id))
            .await?,
    ))
}

async fn create(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<NewStudent>,
) -> ApiResult<Json<Student>> {
    user.admin()?;
    let login = hash_login(input.parent_credentials()).await?;
    let day = today();
    let student = s
        .write(move |tx| students::create_student(tx, input, login, day))
        .await?;
    info!(id = student.id, admission_no = %student.admission_no, "student enrolled");
    Ok(Json(student))
}

async fn update(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<StudentUpdate>,
) -> ApiResult<Json<Student>> {
    user.admin()?;
    Ok(Json(
        s.write(move |tx| students::update_student(tx, id, input))
            .await?,
    ))
}

async fn remove(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| students::delete_student(tx, id)).await?;
    Ok(done("Student deleted successfully"))
}

async fn parent(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Parent>> {
    s.ensure_student_visible(&user, id).await?;
    Ok(Json(s.read(move |r| students::parent_of(r, id)).await?))
}

async fn save_parent(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<Parent>,
) -> ApiResult<Json<Parent>> {
    user.admin()?;
    Ok(Json(
        s.write(move |tx| students::save_parent(tx, id, input))
            .await?,
    ))
}
