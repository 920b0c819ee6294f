//! # SMS
//!
//! Everything about parent SMS notifications except the HTTP call itself:
//! number normalization, recipient resolution, message templates and the
//! per-number delivery log.
//!
//! ## Dispatch Flow
//!
//! ```text
//! recipients ──plan()──► DispatchPlan ──(gateway, in the app)──► GatewayOutcome
//!                                                                      │
//!                    DispatchSummary ◄──record_dispatch()──────────────┘
//! ```
//!
//! A plan holds only cleaned, de-duplicated 10-digit numbers. Every number
//! in the plan gets exactly one [`SmsLog`], all SENT or all FAILED, because
//! the gateway accepts or rejects a bulk request as a whole.

use crate::academic::{SchoolClass, Section, active_year};
use crate::attendance::{Attendance, AttendanceStatus};
use crate::error::Result;
use crate::fees::{FeePayment, structure_for};
use crate::money::Money;
use crate::notices::Notice;
use crate::storage::{Reader, Tx};
use crate::students::{Parent, Student};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Gateway response recorded when no API key is configured.
pub const DEMO_RESPONSE: &str = "DEMO_MODE: API key not configured";

/// Longest gateway response kept in a log row.
pub const MAX_LOGGED_RESPONSE: usize = 490;

const NOTICE_EXCERPT_LIMIT: usize = 100;

// =============================================================================
// LOG RECORD
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Custom,
    AttendanceAlert,
    NoticeAlert,
    FeeReminder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmsStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsLog {
    pub id: u64,
    pub recipient_name: Option<String>,
    pub phone_number: String,
    pub message: String,
    pub message_type: MessageType,
    pub status: SmsStatus,
    pub api_response: Option<String>,
    pub sent_by: Option<String>,
    pub reference_info: Option<String>,
    pub created_at: DateTime<Utc>,
}

crate::record!(SmsLog, "sms_logs", "SmsLog");

/// Logs newest first, optionally narrowed by type and status.
pub fn list_logs(
    r: &impl Reader,
    message_type: Option<MessageType>,
    status: Option<SmsStatus>,
) -> Result<Vec<SmsLog>> {
    let mut logs = r.filter::<SmsLog>(|log| {
        message_type.is_none_or(|t| log.message_type == t) && status.is_none_or(|s| log.status == s)
    })?;
    logs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(logs)
}

// =============================================================================
// NUMBERS
// =============================================================================

/// Reduce a raw phone number to 10 digits, or `None` if it cannot be.
///
/// Non-digits are stripped and longer numbers keep their last 10 digits,
/// so `+91 98765-43210` becomes `9876543210`.
pub fn normalize_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let tail = digits.get(digits.len().saturating_sub(10)..)?;
    (tail.len() == 10).then(|| tail.to_string())
}

/// Normalize a batch, dropping invalid numbers and duplicates (first wins).
pub fn normalize_numbers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|n| normalize_number(n.as_ref()))
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

// =============================================================================
// PLANNING
// =============================================================================

/// A phone number and, when known, who it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addressee {
    pub phone: String,
    pub name: Option<String>,
}

impl Addressee {
    pub fn bare(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("No phone numbers provided")]
    NoNumbers,
    #[error("No valid 10-digit phone numbers")]
    NoValidNumbers,
}

/// A message ready to hand to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPlan {
    /// Cleaned, distinct 10-digit numbers in first-seen order.
    pub recipients: Vec<Addressee>,
    pub message: String,
    pub message_type: MessageType,
    pub sent_by: String,
    pub reference: Option<String>,
}

impl DispatchPlan {
    pub fn numbers(&self) -> Vec<&str> {
        self.recipients.iter().map(|a| a.phone.as_str()).collect()
    }
}

/// Clean the addressees and build a plan. A name stays with its own number.
pub fn plan(
    addressees: Vec<Addressee>,
    message: &str,
    message_type: MessageType,
    sent_by: &str,
    reference: Option<String>,
) -> std::result::Result<DispatchPlan, PlanError> {
    if addressees.is_empty() {
        return Err(PlanError::NoNumbers);
    }
    let mut seen = HashSet::new();
    let recipients: Vec<Addressee> = addressees
        .into_iter()
        .filter_map(|a| {
            let phone = normalize_number(&a.phone)?;
            seen.insert(phone.clone()).then_some(Addressee {
                phone,
                name: a.name,
            })
        })
        .collect();
    if recipients.is_empty() {
        return Err(PlanError::NoValidNumbers);
    }
    Ok(DispatchPlan {
        recipients,
        message: message.to_string(),
        message_type,
        sent_by: sent_by.to_string(),
        reference,
    })
}

/// What the gateway said about one bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOutcome {
    pub success: bool,
    pub api_response: String,
    pub demo_mode: bool,
}

impl GatewayOutcome {
    /// Outcome used when no API key is configured: nothing is sent, all succeed.
    pub fn demo() -> Self {
        Self {
            success: true,
            api_response: DEMO_RESPONSE.to_string(),
            demo_mode: true,
        }
    }
}

/// The result of one dispatch, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub success: bool,
    pub sent_count: usize,
    pub failed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_numbers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<PlanError> for DispatchSummary {
    fn from(err: PlanError) -> Self {
        Self {
            success: false,
            sent_count: 0,
            failed_count: 0,
            total_numbers: None,
            api_response: None,
            demo_mode: None,
            error: Some(err.to_string()),
        }
    }
}

/// Write one log row per planned number and summarize.
pub fn record_dispatch(
    tx: &mut Tx,
    plan: &DispatchPlan,
    outcome: &GatewayOutcome,
    now: DateTime<Utc>,
) -> Result<DispatchSummary> {
    let status = if outcome.success {
        SmsStatus::Sent
    } else {
        SmsStatus::Failed
    };
    let logged: String = outcome.api_response.chars().take(MAX_LOGGED_RESPONSE).collect();
    for addressee in &plan.recipients {
        tx.insert(SmsLog {
            id: 0,
            recipient_name: addressee.name.clone(),
            phone_number: addressee.phone.clone(),
            message: plan.message.clone(),
            message_type: plan.message_type,
            status,
            api_response: Some(logged.clone()),
            sent_by: Some(plan.sent_by.clone()),
            reference_info: plan.reference.clone(),
            created_at: now,
        })?;
    }
    let total = plan.recipients.len();
    let (sent_count, failed_count) = if outcome.success { (total, 0) } else { (0, total) };
    Ok(DispatchSummary {
        success: outcome.success,
        sent_count,
        failed_count,
        total_numbers: Some(total),
        api_response: Some(outcome.api_response.clone()),
        demo_mode: outcome.demo_mode.then_some(true),
        error: None,
    })
}

// =============================================================================
// RECIPIENTS
// =============================================================================

/// A student's parent as an SMS target. `phone` reads "No phone" when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub student_id: u64,
    pub student_name: String,
    pub class: String,
    pub section: String,
    pub parent_name: String,
    pub phone: String,
    pub has_phone: bool,
}

impl Recipient {
    pub fn contact(&self) -> Option<&str> {
        self.has_phone.then_some(self.phone.as_str())
    }

    pub fn addressee(&self) -> Option<Addressee> {
        self.contact().map(|phone| Addressee {
            phone: phone.to_string(),
            name: Some(self.parent_name.clone()),
        })
    }
}

/// A recipient who still owes fees for the active year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeDefaulter {
    #[serde(flatten)]
    pub recipient: Recipient,
    pub pending_amount: Money,
}

/// Who a class-wide message reaches and how the logs describe it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audience {
    pub addressees: Vec<Addressee>,
    pub reference: String,
}

fn recipient_for(r: &impl Reader, student: &Student) -> Result<Recipient> {
    let class = match student.class_id {
        Some(id) => r.get::<SchoolClass>(id)?.map(|c| c.name),
        None => None,
    };
    let section = match student.section_id {
        Some(id) => r.get::<Section>(id)?.map(|s| s.name),
        None => None,
    };
    let parent = match student.parent_id {
        Some(id) => r.get::<Parent>(id)?,
        None => None,
    };
    let phone = parent.as_ref().and_then(|p| p.contact_phone()).map(str::to_string);
    Ok(Recipient {
        student_id: student.id,
        student_name: student.full_name(),
        class: class.unwrap_or_default(),
        section: section.unwrap_or_default(),
        parent_name: parent
            .as_ref()
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|| "Parent".to_string()),
        has_phone: phone.is_some(),
        phone: phone.unwrap_or_else(|| "No phone".to_string()),
    })
}

fn students_in(r: &impl Reader, class_id: Option<u64>, section_id: Option<u64>) -> Result<Vec<Student>> {
    r.filter::<Student>(|s| {
        class_id.is_none_or(|c| s.class_id == Some(c))
            && section_id.is_none_or(|sec| s.section_id == Some(sec))
    })
}

/// Parents of every student in a class (or section), or of the whole school.
///
/// Only parents with a phone number are included. A section is ignored
/// unless a class is given.
pub fn class_audience(
    r: &impl Reader,
    class_id: Option<u64>,
    section_id: Option<u64>,
) -> Result<Audience> {
    let (students, reference) = match (class_id, section_id) {
        (Some(class), Some(section)) => {
            r.ensure::<SchoolClass>(class)?;
            r.ensure::<Section>(section)?;
            (
                students_in(r, Some(class), Some(section))?,
                format!("Class {class} Sec {section}"),
            )
        }
        (Some(class), None) => {
            r.ensure::<SchoolClass>(class)?;
            (students_in(r, Some(class), None)?, format!("Class {class}"))
        }
        (None, _) => (r.list::<Student>()?, "All Parents".to_string()),
    };
    let mut addressees = Vec::new();
    for student in &students {
        addressees.extend(recipient_for(r, student)?.addressee());
    }
    Ok(Audience {
        addressees,
        reference,
    })
}

/// Students marked ABSENT on `date`, optionally within a class (and section).
pub fn absentees(
    r: &impl Reader,
    date: NaiveDate,
    class_id: Option<u64>,
    section_id: Option<u64>,
) -> Result<Vec<Recipient>> {
    let section_id = class_id.and(section_id);
    let marks = r.filter::<Attendance>(|a| {
        a.date == date
            && a.status == AttendanceStatus::Absent
            && class_id.is_none_or(|c| a.class_id == Some(c))
            && section_id.is_none_or(|s| a.section_id == Some(s))
    })?;
    let mut out = Vec::with_capacity(marks.len());
    for mark in marks {
        if let Some(student) = r.get::<Student>(mark.student_id)? {
            out.push(recipient_for(r, &student)?);
        }
    }
    Ok(out)
}

/// Students whose active-year fee structure is not fully paid.
///
/// Empty when no academic year is active. Students without a class or
/// without a fee structure for their class are skipped.
pub fn fee_defaulters(r: &impl Reader, class_id: Option<u64>) -> Result<Vec<FeeDefaulter>> {
    let Some(year) = active_year(r)? else {
        return Ok(Vec::new());
    };
    let payments = r.filter::<FeePayment>(|p| p.academic_year_id == year.id)?;
    let mut out = Vec::new();
    for student in students_in(r, class_id, None)? {
        let Some(class) = student.class_id else {
            continue;
        };
        let Some(structure) = structure_for(r, class, year.id)? else {
            continue;
        };
        let paid: Money = payments
            .iter()
            .filter(|p| p.student_id == student.id)
            .map(|p| p.amount)
            .sum();
        let pending = structure.total_fee.saturating_sub(paid);
        if pending.is_positive() {
            out.push(FeeDefaulter {
                recipient: recipient_for(r, &student)?,
                pending_amount: pending,
            });
        }
    }
    Ok(out)
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// `dd-MM-yyyy`, the date format parents see.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

pub fn absent_message(student_name: &str, date: NaiveDate, school: &str) -> String {
    format!(
        "Dear Parent, {student_name} was marked ABSENT on {}. Please ensure regular attendance. - {school}",
        display_date(date)
    )
}

/// Notice alert. Content over 100 characters is cut to 97 plus "...".
pub fn notice_message(notice: &Notice, school: &str) -> String {
    let content = &notice.content;
    let excerpt = if content.chars().count() > NOTICE_EXCERPT_LIMIT {
        let head: String = content.chars().take(NOTICE_EXCERPT_LIMIT - 3).collect();
        format!("{head}...")
    } else {
        content.clone()
    };
    format!(
        "Dear Parent, Notice: {}. {excerpt} - {school}",
        notice.title
    )
}

pub fn fee_message(pending: Money, student_name: &str, school: &str) -> String {
    format!(
        "Dear Parent, Fee of Rs.{} is pending for {student_name}. Please pay at the earliest to avoid late fees. - {school}",
        pending.whole_rupees()
    )
}

// =============================================================================
// TESTS
// =============================================================================
