//! Daily attendance and leave applications.

use super::{ApiError, ApiResult, AppState, AuthUser, Body, today};
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use schoolhub_core::attendance::{
    self, Attendance, AttendanceEntry, AttendanceStats, LeaveApplication, LeaveRequest, Rejection,
};
use schoolhub_core::form::date_param;
use schoolhub_core::{Reader, Role};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/mark", post(mark))
        .route("/date/{date}", get(on_date))
        .route(
            "/class/{class_id}/section/{section_id}/date/{date}",
            get(for_class_section),
        )
        .route("/student/{student_id}", get(for_student))
        .route("/statistics/today", get(statistics))
        .route("/leaves", get(list_leaves).post(apply_leave))
        .route("/leaves/student/{student_id}", get(leaves_for_student))
        .route("/leaves/{id}/approve", put(approve_leave))
        .route("/leaves/{id}/reject", put(reject_leave))
}

fn path_date(raw: &str) -> ApiResult<NaiveDate> {
    date_param(Some(raw))?.ok_or_else(|| ApiError::BadRequest("Date is required".into()))
}

// =============================================================================
// ATTENDANCE
// =============================================================================

async fn mark(
    State(s): State<AppState>,
    user: AuthUser,
    Body(entries): Body<Vec<AttendanceEntry>>,
) -> ApiResult<Json<Vec<Attendance>>> {
    user.staff()?;
    let actor = user.username;
    Ok(Json(
        s.write(move |tx| attendance::mark(tx, entries, &actor))
            .await?,
    ))
}

async fn on_date(
    State(s): State<AppState>,
    user: AuthUser,
    Path(date): Path<String>,
) -> ApiResult<Json<Vec<Attendance>>> {
    user.staff()?;
    let date = path_date(&date)?;
    Ok(Json(s.read(move |r| attendance::on_date(r, date)).await?))
}

async fn for_class_section(
    State(s): State<AppState>,
    user: AuthUser,
    Path((class_id, section_id, date)): Path<(u64, u64, String)>,
) -> ApiResult<Json<Vec<Attendance>>> {
    user.staff()?;
    let date = path_date(&date)?;
    Ok(Json(
        s.read(move |r| attendance::for_class_section(r, class_id, section_id, date))
            .await?,
    ))
}

async fn for_student(
    State(s): State<AppState>,
    user: AuthUser,
    Path(student_id): Path<u64>,
) -> ApiResult<Json<Vec<Attendance>>> {
    s.ensure_student_visible(&user, student_id).await?;
    let day = today();
    Ok(Json(
        s.read(move |r| attendance::last_month(r, student_id, day))
            .await?,
    ))
}

async fn statistics(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<AttendanceStats>> {
    user.staff()?;
    let day = today();
    Ok(Json(s.read(move |r| attendance::stats_for(r, day)).await?))
}

// =============================================================================
// LEAVES
// =============================================================================

async fn list_leaves(
    State(s): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<LeaveApplication>>> {
    user.staff()?;
    Ok(Json(s.read(|r| r.list::<LeaveApplication>()).await?))
}

async fn leaves_for_student(
    State(s): State<AppState>,
    user: AuthUser,
    Path(student_id): Path<u64>,
) -> ApiResult<Json<Vec<LeaveApplication>>> {
    s.ensure_student_visible(&user, student_id).await?;
    Ok(Json(
        s.read(move |r| attendance::leaves_for_student(r, student_id))
            .await?,
    ))
}

async fn apply_leave(
    State(s): State<AppState>,
    user: AuthUser,
    Body(req): Body<LeaveRequest>,
) -> ApiResult<Json<LeaveApplication>> {
    user.require(&[Role::Admin, Role::Parent])?;
    s.ensure_student_visible(&user, req.student_id).await?;
    let day = today();
    Ok(Json(s.write(move |tx| attendance::apply(tx, req, day)).await?))
}

async fn approve_leave(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<LeaveApplication>> {
    user.staff()?;
    let actor = user.username;
    let day = today();
    Ok(Json(
        s.write(move |tx| attendance::approve(tx, id, &actor, day))
            .await?,
    ))
}

async fn reject_leave(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(rejection): Body<Rejection>,
) -> ApiResult<Json<LeaveApplication>> {
    user.staff()?;
    let actor = user.username;
    let day = today();
    Ok(Json(
        s.write(move |tx| attendance::reject(tx, id, rejection, &actor, day))
            .await?,
    ))
}
