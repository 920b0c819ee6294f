//! SMS endpoints: custom, class-wide, absence, notice and fee reminder sends.
//!
//! Each send plans recipients in the core, makes one gateway call per plan
//! and logs one row per number in a single write.

use super::{ApiError, ApiResult, AppState, AuthUser, Body, today};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use schoolhub_core::Reader;
use schoolhub_core::form::date_param;
use schoolhub_core::notices::Notice;
use schoolhub_core::sms::{
    self, Addressee, DispatchPlan, DispatchSummary, FeeDefaulter, MessageType, PlanError,
    Recipient, SmsLog, SmsStatus,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/balance", get(balance))
        .route("/logs", get(logs))
        .route("/send", post(send))
        .route("/send-to-class", post(send_to_class))
        .route("/absent-alert", post(absent_alert))
        .route("/notice/{notice_id}", post(notice_alert))
        .route("/fee-reminder", post(fee_reminder))
        .route("/preview/absent", get(preview_absent))
        .route("/preview/fee-pending", get(preview_fee_pending))
}

/// Send a plan through the gateway and log the outcome.
async fn dispatch(
    state: &AppState,
    plan: Result<DispatchPlan, PlanError>,
) -> ApiResult<DispatchSummary> {
    let plan = match plan {
        Ok(plan) => plan,
        Err(e) => return Ok(DispatchSummary::from(e)),
    };
    let outcome = state.sms().send(&plan.numbers(), &plan.message).await;
    let summary = state
        .write(move |tx| sms::record_dispatch(tx, &plan, &outcome, Utc::now()))
        .await?;
    info!(
        sent = summary.sent_count,
        failed = summary.failed_count,
        demo = summary.demo_mode.unwrap_or(false),
        "SMS dispatch"
    );
    Ok(summary)
}

fn required_message(message: Option<String>) -> ApiResult<String> {
    message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Message is required".into()))
}

/// A non-blank custom message, else the generated one.
fn custom_or(message: Option<&str>, generated: impl FnOnce() -> String) -> String {
    match message {
        Some(m) if !m.trim().is_empty() => m.to_string(),
        _ => generated(),
    }
}

// =============================================================================
// STATUS & LOGS
// =============================================================================

async fn status(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Value>> {
    user.admin()?;
    let school_name = s.school_name().await?;
    Ok(Json(json!({
        "configured": s.sms().is_configured(),
        "schoolName": school_name,
    })))
}

async fn balance(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Value>> {
    user.admin()?;
    Ok(Json(s.sms().balance().await))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogFilter {
    message_type: Option<MessageType>,
    status: Option<SmsStatus>,
}

async fn logs(
    State(s): State<AppState>,
    user: AuthUser,
    Query(filter): Query<LogFilter>,
) -> ApiResult<Json<Vec<SmsLog>>> {
    user.admin()?;
    Ok(Json(
        s.read(move |r| sms::list_logs(r, filter.message_type, filter.status))
            .await?,
    ))
}

// =============================================================================
// SENDS
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SendRequest {
    numbers: Option<Vec<String>>,
    message: Option<String>,
}

async fn send(
    State(s): State<AppState>,
    user: AuthUser,
    Body(req): Body<SendRequest>,
) -> ApiResult<Json<DispatchSummary>> {
    user.admin()?;
    let message = required_message(req.message)?;
    let addressees = req
        .numbers
        .unwrap_or_default()
        .into_iter()
        .map(Addressee::bare)
        .collect();
    let plan = sms::plan(
        addressees,
        &message,
        MessageType::Custom,
        &user.username,
        Some("Custom".into()),
    );
    Ok(Json(dispatch(&s, plan).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ClassSendRequest {
    class_id: Option<u64>,
    section_id: Option<u64>,
    message: Option<String>,
}

async fn send_to_class(
    State(s): State<AppState>,
    user: AuthUser,
    Body(req): Body<ClassSendRequest>,
) -> ApiResult<Json<DispatchSummary>> {
    user.admin()?;
    let message = required_message(req.message)?;
    let (class_id, section_id) = (req.class_id, req.section_id);
    let audience = s
        .read(move |r| sms::class_audience(r, class_id, section_id))
        .await?;
    let plan = sms::plan(
        audience.addressees,
        &message,
        MessageType::Custom,
        &user.username,
        Some(audience.reference),
    );
    Ok(Json(dispatch(&s, plan).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AbsentAlertRequest {
    date: Option<String>,
    class_id: Option<u64>,
    section_id: Option<u64>,
    message: Option<String>,
}

async fn absent_alert(
    State(s): State<AppState>,
    user: AuthUser,
    Body(req): Body<AbsentAlertRequest>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    let date = date_param(req.date.as_deref())?.unwrap_or_else(today);
    let shown = sms::display_date(date);
    let (class_id, section_id) = (req.class_id, req.section_id);
    let absent = s
        .read(move |r| sms::absentees(r, date, class_id, section_id))
        .await?;
    if absent.is_empty() {
        return Ok(Json(json!({
            "success": true,
            "sentCount": 0,
            "message": format!("No absent students found for {shown}"),
        })));
    }

    let school = s.school_name().await?;
    let mut sent = 0usize;
    for recipient in &absent {
        let Some(addressee) = recipient.addressee() else {
            continue;
        };
        let message = custom_or(req.message.as_deref(), || {
            sms::absent_message(&recipient.student_name, date, &school)
        });
        let plan = sms::plan(
            vec![addressee],
            &message,
            MessageType::AttendanceAlert,
            &user.username,
            Some(format!("Absent:{}:{shown}", recipient.student_name)),
        );
        if dispatch(&s, plan).await?.success {
            sent += 1;
        }
    }
    Ok(Json(json!({
        "success": true,
        "sentCount": sent,
        "absentCount": absent.len(),
        "date": shown,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OptionalMessage {
    message: Option<String>,
}

/// The request body is optional here; an empty body means "use the template".
async fn notice_alert(
    State(s): State<AppState>,
    user: AuthUser,
    Path(notice_id): Path<u64>,
    body: Bytes,
) -> ApiResult<Json<DispatchSummary>> {
    user.admin()?;
    let custom: OptionalMessage = if body.iter().all(u8::is_ascii_whitespace) {
        OptionalMessage::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let notice = s.read(move |r| r.fetch::<Notice>(notice_id)).await?;
    let school = s.school_name().await?;
    let message = custom_or(custom.message.as_deref(), || {
        sms::notice_message(&notice, &school)
    });
    let audience = s
        .read(|r| sms::class_audience(r, None, None))
        .await?;
    let plan = sms::plan(
        audience.addressees,
        &message,
        MessageType::NoticeAlert,
        &user.username,
        Some(format!("Notice:{}", notice.title)),
    );
    Ok(Json(dispatch(&s, plan).await?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FeeReminderRequest {
    class_id: Option<u64>,
    message: Option<String>,
}

async fn fee_reminder(
    State(s): State<AppState>,
    user: AuthUser,
    Body(req): Body<FeeReminderRequest>,
) -> ApiResult<Json<Value>> {
    user.admin()?;
    let class_id = req.class_id;
    let defaulters = s
        .read(move |r| sms::fee_defaulters(r, class_id))
        .await?;
    let school = s.school_name().await?;
    let mut sent = 0usize;
    for defaulter in &defaulters {
        let recipient = &defaulter.recipient;
        let Some(addressee) = recipient.addressee() else {
            continue;
        };
        let pending = defaulter.pending_amount;
        let message = custom_or(req.message.as_deref(), || {
            sms::fee_message(pending, &recipient.student_name, &school)
        });
        let plan = sms::plan(
            vec![addressee],
            &message,
            MessageType::FeeReminder,
            &user.username,
            Some(format!(
                "FeeReminder:{}:Rs.{}",
                recipient.student_name,
                pending.whole_rupees()
            )),
        );
        if dispatch(&s, plan).await?.success {
            sent += 1;
        }
    }
    Ok(Json(json!({"success": true, "sentCount": sent})))
}

// =============================================================================
// PREVIEWS
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AbsentQuery {
    date: Option<String>,
    class_id: Option<u64>,
    section_id: Option<u64>,
}

async fn preview_absent(
    State(s): State<AppState>,
    user: AuthUser,
    Query(q): Query<AbsentQuery>,
) -> ApiResult<Json<Vec<Recipient>>> {
    user.admin()?;
    let date = date_param(q.date.as_deref())?.unwrap_or_else(today);
    Ok(Json(
        s.read(move |r| sms::absentees(r, date, q.class_id, q.section_id))
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeePendingQuery {
    class_id: Option<u64>,
}

async fn preview_fee_pending(
    State(s): State<AppState>,
    user: AuthUser,
    Query(q): Query<FeePendingQuery>,
) -> ApiResult<Json<Vec<FeeDefaulter>>> {
    user.admin()?;
    Ok(Json(
        s.read(move |r| sms::fee_defaulters(r, q.class_id))
            .await?,
    ))
}
