//! Fee structures, payments, receipts and collection reports.

use super::{ApiError, ApiResult, AppState, AuthUser, Body, done, today};
use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use schoolhub_core::fees::{
    self, Collection, FeePayment, FeeStatus, FeeStructure, FeeStructureInput, PaymentInput,
    PaymentUpdate, PaymentWithReceipt,
};
use schoolhub_core::form::date_param;
use schoolhub_core::{Reader, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/structures", get(list_structures).post(create_structure))
        .route(
            "/structures/{id}",
            get(get_structure).put(update_structure).delete(delete_structure),
        )
        .route("/payments", get(list_payments).post(record_payment))
        .route("/payments/student/{student_id}", get(payments_for_student))
        .route("/payments/{id}", put(update_payment).delete(delete_payment))
        .route("/status/student/{student_id}", get(status))
        .route("/receipts/{receipt_no}", get(receipt))
        .route("/reports/daily", get(daily_report))
        .route("/reports/monthly", get(monthly_report))
}

const ADMIN_OR_PARENT: &[Role] = &[Role::Admin, Role::Parent];

// =============================================================================
// STRUCTURES
// =============================================================================

async fn list_structures(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<FeeStructure>>> {
    user.staff()?;
    Ok(Json(s.read(|r| r.list::<FeeStructure>()).await?))
}

async fn get_structure(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<FeeStructure>> {
    user.staff()?;
    Ok(Json(s.read(move |r| r.fetch::<FeeStructure>(id)).await?))
}

async fn create_structure(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<FeeStructureInput>,
) -> ApiResult<Json<FeeStructure>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| fees::create_structure(tx, input)).await?))
}

async fn update_structure(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<FeeStructureInput>,
) -> ApiResult<Json<FeeStructure>> {
    user.admin()?;
    Ok(Json(
        s.write(move |tx| fees::update_structure(tx, id, input))
            .await?,
    ))
}

async fn delete_structure(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| fees::delete_structure(tx, id)).await?;
    Ok(done("Fee structure deleted successfully"))
}

// =============================================================================
// PAYMENTS
// =============================================================================

async fn list_payments(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<FeePayment>>> {
    user.admin()?;
    Ok(Json(s.read(|r| r.list::<FeePayment>()).await?))
}

async fn payments_for_student(
    State(s): State<AppState>,
    user: AuthUser,
    Path(student_id): Path<u64>,
) -> ApiResult<Json<Vec<FeePayment>>> {
    user.require(ADMIN_OR_PARENT)?;
    s.ensure_student_visible(&user, student_id).await?;
    Ok(Json(
        s.read(move |r| fees::payments_for_student(r, student_id))
            .await?,
    ))
}

async fn record_payment(
    State(s): State<AppState>,
    user: AuthUser,
    Body(input): Body<PaymentInput>,
) -> ApiResult<Json<PaymentWithReceipt>> {
    user.admin()?;
    let actor = user.username;
    let day = today();
    let recorded = s
        .write(move |tx| fees::record_payment(tx, input, &actor, day))
        .await?;
    info!(
        student = recorded.payment.student_id,
        receipt = %recorded.receipt.receipt_no,
        "fee payment recorded"
    );
    Ok(Json(recorded))
}

async fn update_payment(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
    Body(input): Body<PaymentUpdate>,
) -> ApiResult<Json<FeePayment>> {
    user.admin()?;
    Ok(Json(s.write(move |tx| fees::update_payment(tx, id, input)).await?))
}

async fn delete_payment(
    State(s): State<AppState>,
    user: AuthUser,
    Path(id): Path<u64>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    s.write(move |tx| fees::delete_payment(tx, id)).await?;
    Ok(done("Fee payment deleted successfully"))
}

async fn status(
    State(s): State<AppState>,
    user: AuthUser,
    Path(student_id): Path<u64>,
) -> ApiResult<Json<FeeStatus>> {
    user.require(ADMIN_OR_PARENT)?;
    s.ensure_student_visible(&user, student_id).await?;
    Ok(Json(s.read(move |r| fees::fee_status(r, student_id)).await?))
}

async fn receipt(
    State(s): State<AppState>,
    user: AuthUser,
    Path(receipt_no): Path<String>,
) -> ApiResult<Json<PaymentWithReceipt>> {
    user.require(ADMIN_OR_PARENT)?;
    let found = s
        .read(move |r| fees::receipt_by_number(r, &receipt_no))
        .await?;
    s.ensure_student_visible(&user, found.payment.student_id)
        .await?;
    Ok(Json(found))
}

// =============================================================================
// REPORTS
// =============================================================================

#[derive(Debug, Deserialize)]
struct DailyQuery {
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct DailyReport {
    date: NaiveDate,
    #[serde(flatten)]
    collection: Collection,
}

async fn daily_report(
    State(s): State<AppState>,
    user: AuthUser,
    Query(q): Query<DailyQuery>,
) -> ApiResult<Json<DailyReport>> {
    user.admin()?;
    let date = date_param(q.date.as_deref())?.unwrap_or_else(today);
    let collection = s
        .read(move |r| fees::collection_between(r, date, date))
        .await?;
    Ok(Json(DailyReport { date, collection }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RangeReport {
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(flatten)]
    collection: Collection,
}

async fn monthly_report(
    State(s): State<AppState>,
    user: AuthUser,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Json<RangeReport>> {
    user.admin()?;
    let start_date = date_param(q.start_date.as_deref())?
        .ok_or_else(|| ApiError::BadRequest("startDate is required".into()))?;
    let end_date = date_param(q.end_date.as_deref())?
        .ok_or_else(|| ApiError::BadRequest("endDate is required".into()))?;
    let collection = s
        .read(move |r| fees::collection_between(r, start_date, end_date))
        .await?;
    Ok(Json(RangeReport {
        start_date,
        end_date,
        collection,
    }))
}
