//! Teacher records and subject assignments.

use super::{ApiResult, AppState, AuthUser, Body, done, hash_login, today};
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use schoolhub_core::Reader;
use schoolhub_core::teachers::{
    self, AssignmentInput, ClassTeacher, Teacher, TeacherAssignment, TeacherInput,
};
use serde_json::Value;
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/class/{class_id}", get(for_class))
        .route("/assignments", post(assign))
        .route("/assignments/{id}", delete(unassign))
        .route("/{id}", get(fetch).put(update).delete(remove))
        .route("/{id}/assignments", get(assignments))
}

async fn list(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Teacher>>> {
    user.staff()?;
    Ok(Json(s.read(|r| r.list::<Teacher>()).await?))
}

async fn fetch(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Teacher>> {
    user.staff()?;
    Ok(Json(s.read(move |r| r.fetch::<Teacher>(id)).await?))
}

async fn for_class(
    State(s): State<AppState>,
    _user: AuthUser,
    Path(class_id): Path<u64>,
) -> ApiResult<Json<Vec<ClassTeacher>>> {
    Ok(Json(
        s.read(move |r| teachers::teachers_for_class(r, class_id))
            .await?,
    ))
}

async fn create(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<TeacherInput>,
) -> ApiResult<Json<Teacher>> {
    user.admin()?;
    let login = hash_login(input.login_credentials()).await?;
    let day = today();
    let teacher = s
        .write(move |tx| teachers::create_teacher(tx, input, login, day))
        .await?;
    info!(id = teacher.id, employee_id = %teacher.employee_id, "teacher created");
    Ok(Json(teacher))
}

async fn update(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<TeacherInput>,
) -> ApiResult<Json<Teacher>> {
    user.admin()?;
    Ok(Json(
        s.write(move |tx| teachers::update_teacher(tx, id, input))
            .await?,
    ))
}

async fn remove(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| teachers::delete_teacher(tx, id)).await?;
    Ok(done("Teacher deleted successfully"))
}

async fn assignments(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<TeacherAssignment>>> {
    user.staff()?;
    Ok(Json(
        s.read(move |r| teachers::assignments_for_teacher(r, id))
            .await?,
    ))
}

async fn assign(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<AssignmentInput>,
) -> ApiResult<Json<TeacherAssignment>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| teachers::assign(tx, input)).await?))
}

async fn unassign(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| teachers::unassign(tx, id)).await?;
    Ok(done("Assignment removed successfully"))
}
