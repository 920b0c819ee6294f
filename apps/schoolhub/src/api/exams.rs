//! Examinations, their schedules and student marks.

use super::{ApiResult, AppState, AuthUser, Body, done};
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use schoolhub_core::Reader;
use schoolhub_core::exams::{
    self, ExamSchedule, Examination, ExaminationInput, Marks, MarksInput, MarksUpdate,
    ScheduleInput,
};
use serde_json::Value;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route("/schedules/{id}", put(update_schedule).delete(delete_schedule))
        .route("/marks", post(record_marks))
        .route("/marks/bulk", post(record_bulk))
        .route("/marks/{id}", put(update_marks).delete(delete_marks))
        .route("/{id}", get(fetch).put(update).delete(remove))
        .route("/{id}/schedules", get(schedules_for_exam))
        .route("/{id}/marks", get(marks_for_exam))
        .route("/{id}/student/{student_id}/marks", get(marks_for_student))
}

// =============================================================================
// EXAMINATIONS
// =============================================================================

async fn list(State(s): State<AppState>, _user: AuthUser) -> ApiResult<Json<Vec<Examination>>> {
    Ok(Json(s.read(|r| r.list::<Examination>()).await?))
}

async fn fetch(
    State(s): State<AppState>,
    _user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Examination>> {
    Ok(Json(s.read(move |r| r.fetch::<Examination>(id)).await?))
}

async fn create(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<ExaminationInput>,
) -> ApiResult<Json<Examination>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| exams::create_exam(tx, input)).await?))
}

async fn update(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<ExaminationInput>,
) -> ApiResult<Json<Examination>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| exams::update_exam(tx, id, input)).await?))
}

async fn remove(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| exams::delete_exam(tx, id)).await?;
    Ok(done("Examination deleted successfully"))
}

// =============================================================================
// SCHEDULES
// =============================================================================

async fn list_schedules(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<ExamSchedule>>> {
    user.staff()?;
    Ok(Json(s.read(|r| r.list::<ExamSchedule>()).await?))
}

async fn schedules_for_exam(
    State(s): State<AppState>,
    _user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<ExamSchedule>>> {
    Ok(Json(s.read(move |r| exams::schedules_for_exam(r, id)).await?))
}

async fn create_schedule(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<ScheduleInput>,
) -> ApiResult<Json<ExamSchedule>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| exams::create_schedule(tx, input)).await?))
}

async fn update_schedule(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<ScheduleInput>,
) -> ApiResult<Json<ExamSchedule>> {
    user.admin()?;
    Ok(Json(
        s.write(move |tx| exams::update_schedule(tx, id, input))
            .await?,
    ))
}

async fn delete_schedule(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| exams::delete_schedule(tx, id)).await?;
    Ok(done("Exam schedule deleted successfully"))
}

// =============================================================================
// MARKS
// =============================================================================

async fn marks_for_exam(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<Marks>>> {
    user.staff()?;
    Ok(Json(s.read(move |r| exams::marks_for_exam(r, id)).await?))
}

async fn marks_for_student(
    State(s): State<AppState>,
    user: AuthUser,
    Path((id, student_id)): Path<(u64, u64)>,
) -> ApiResult<Json<Vec<Marks>>> {
    s.ensure_student_visible(&user, student_id).await?;
    Ok(Json(
        s.read(move |r| exams::marks_for_student(r, id, student_id))
            .await?,
    ))
}

async fn record_marks(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<MarksInput>,
) -> ApiResult<Json<Marks>> {
    user.staff()?;
    let actor = user.username;
    Ok(Json(
        s.write(move |tx| exams::record_marks(tx, input, &actor))
            .await?,
    ))
}

async fn record_bulk(
    State(s): State<AppState>,
    user: AuthUser,
    Body(inputs): Body<Vec<MarksInput>>,
) -> ApiResult<Json<Vec<Marks>>> {
    user.staff()?;
    let actor = user.username;
    Ok(Json(
        s.write(move |tx| exams::record_bulk(tx, inputs, &actor))
            .await?,
    ))
}

async fn update_marks(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<MarksUpdate>,
) -> ApiResult<Json<Marks>> {
    user.staff()?;
    Ok(Json(s.write(move |tx| exams::update_marks(tx, id, input)).await?))
}

async fn delete_marks(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| exams::delete_marks(tx, id)).await?;
    Ok(done("Marks deleted successfully"))
}
