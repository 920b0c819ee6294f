//! Transport routes and student route assignment.

use super::{ApiResult, AppState, AuthUser, Body, done};
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use schoolhub_core::Reader;
use schoolhub_core::students::Student;
use schoolhub_core::transport::{self, RouteInput, TransportRoute};
use serde::Deserialize;
use serde_json::Value;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/routes", get(list).post(create))
        .route("/routes/active", get(active))
        .route("/routes/{id}", get(fetch).put(update).delete(remove))
        .route("/routes/{id}/students", get(students_on_route))
        .route("/students/{student_id}/route", put(assign).delete(unassign))
}

async fn list(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<TransportRoute>>> {
    user.staff()?;
    Ok(Json(s.read(|r| r.list::<TransportRoute>()).await?))
}

async fn active(State(s): State<AppState>, _user: AuthUser) -> ApiResult<Json<Vec<TransportRoute>>> {
    Ok(Json(s.read(|r| transport::active_routes(r)).await?))
}

async fn fetch(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<TransportRoute>> {
    user.staff()?;
    Ok(Json(s.read(move |r| r.fetch::<TransportRoute>(id)).await?))
}

async fn create(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<RouteInput>,
) -> ApiResult<Json<TransportRoute>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| transport::create_route(tx, input)).await?))
}

async fn update(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<RouteInput>,
) -> ApiResult<Json<TransportRoute>> {
    user.admin()?;
    Ok(Json(
        s.write(move |tx| transport::update_route(tx, id, input))
            .await?,
    ))
}

async fn remove(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| transport::delete_route(tx, id)).await?;
    Ok(done("Route deleted successfully"))
}

async fn students_on_route(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Vec<Student>>> {
    user.staff()?;
    Ok(Json(
        s.read(move |r| transport::students_on_route(r, id))
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteAssignment {
    #[serde(default)]
    route_id: Option<u64>,
}

async fn assign(
    State(s): State<AppState>,
    user: AuthUser,
    Path(student_id): Path<u64>,
    Body(body): Body<RouteAssignment>,
) -> ApiResult<Json<Student>> {
    user.admin()?;
    Ok(Json(
        s.write(move |tx| transport::assign_route(tx, student_id, body.route_id))
            .await?,
    ))
}

async fn unassign(
    State(s): State<AppState>,
    user: AuthUser,
    Path(student_id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| transport::assign_route(tx, student_id, None))
        .await?;
    Ok(done("Route removed from student"))
}
