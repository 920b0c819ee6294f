//! # Attendance and Leave
//!
//! Daily attendance marks and leave applications.
//!
//! A student has at most one attendance record per date; marking again
//! overwrites it. Leave applications move PENDING → APPROVED or
//! PENDING → REJECTED and never leave those terminal states.

use crate::academic::{SchoolClass, Section};
use crate::error::{CoreError, Result, require};
use crate::form;
use crate::storage::{Reader, Tx};
use crate::students::Student;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

// =============================================================================
// ATTENDANCE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: u64,
    pub student_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub class_id: Option<u64>,
    pub section_id: Option<u64>,
    pub marked_by: Option<String>,
    pub remarks: Option<String>,
}

crate::record!(Attendance, "attendance", "Attendance");

/// One mark in a batch. Class and section default to the student's own.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub student_id: u64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub class_id: Option<u64>,
    #[serde(default)]
    pub section_id: Option<u64>,
    #[serde(default)]
    pub marked_by: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Today's counters. `absent` is everything not PRESENT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub present: u64,
    pub total: u64,
    pub absent: u64,
}

/// Record a batch of marks, replacing any existing mark for the same student and date.
pub fn mark(tx: &mut Tx, entries: Vec<AttendanceEntry>, actor: &str) -> Result<Vec<Attendance>> {
    let mut saved = Vec::with_capacity(entries.len());
    for entry in entries {
        let student = tx.fetch::<Student>(entry.student_id)?;
        let class_id = entry.class_id.or(student.class_id);
        let section_id = entry.section_id.or(student.section_id);
        let marked_by = form::clean(entry.marked_by).or_else(|| Some(actor.to_string()));
        let existing =
            tx.find::<Attendance>(|a| a.student_id == entry.student_id && a.date == entry.date)?;
        let record = match existing {
            Some(mut a) => {
                a.status = entry.status;
                a.class_id = class_id;
                a.section_id = section_id;
                a.marked_by = marked_by;
                a.remarks = form::clean(entry.remarks);
                tx.put(&a)?;
                a
            }
            None => tx.insert(Attendance {
                id: 0,
                student_id: entry.student_id,
                date: entry.date,
                status: entry.status,
                class_id,
                section_id,
                marked_by,
                remarks: form::clean(entry.remarks),
            })?,
        };
        saved.push(record);
    }
    Ok(saved)
}

pub fn on_date(r: &impl Reader, date: NaiveDate) -> Result<Vec<Attendance>> {
    r.filter::<Attendance>(|a| a.date == date)
}

pub fn for_class_section(
    r: &impl Reader,
    class_id: u64,
    section_id: u64,
    date: NaiveDate,
) -> Result<Vec<Attendance>> {
    r.ensure::<SchoolClass>(class_id)?;
    r.ensure::<Section>(section_id)?;
    r.filter::<Attendance>(|a| {
        a.date == date && a.class_id == Some(class_id) && a.section_id == Some(section_id)
    })
}

/// A student's marks from one month before `today` through `today`.
pub fn last_month(r: &impl Reader, student_id: u64, today: NaiveDate) -> Result<Vec<Attendance>> {
    r.ensure::<Student>(student_id)?;
    let start = today.checked_sub_months(Months::new(1)).unwrap_or(today);
    let mut marks =
        r.filter::<Attendance>(|a| a.student_id == student_id && a.date >= start && a.date <= today)?;
    marks.sort_by_key(|a| a.date);
    Ok(marks)
}

pub fn stats_for(r: &impl Reader, day: NaiveDate) -> Result<AttendanceStats> {
    let marks = on_date(r, day)?;
    let total = marks.len() as u64;
    let present = marks
        .iter()
        .filter(|a| a.status == AttendanceStatus::Present)
        .count() as u64;
    Ok(AttendanceStats {
        present,
        total,
        absent: total.saturating_sub(present),
    })
}

// =============================================================================
// LEAVE APPLICATIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveApplication {
    pub id: u64,
    pub student_id: u64,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
    pub applied_date: NaiveDate,
    pub approved_by: Option<String>,
    pub approval_date: Option<NaiveDate>,
    pub rejection_reason: Option<String>,
    pub medical_certificate: Option<String>,
}

crate::record!(LeaveApplication, "leave_applications", "Leave Application");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub student_id: u64,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub medical_certificate: Option<String>,
}

/// Body of a rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rejection {
    #[serde(default)]
    pub reason: Option<String>,
}

pub fn leaves_for_student(r: &impl Reader, student_id: u64) -> Result<Vec<LeaveApplication>> {
    r.ensure::<Student>(student_id)?;
    r.filter::<LeaveApplication>(|l| l.student_id == student_id)
}

pub fn apply(tx: &mut Tx, req: LeaveRequest, today: NaiveDate) -> Result<LeaveApplication> {
    tx.ensure::<Student>(req.student_id)?;
    require(&req.reason, "Reason")?;
    if req.to_date < req.from_date {
        return Err(CoreError::validation("To date must not be before from date"));
    }
    tx.insert(LeaveApplication {
        id: 0,
        student_id: req.student_id,
        from_date: req.from_date,
        to_date: req.to_date,
        reason: req.reason.trim().to_string(),
        status: LeaveStatus::Pending,
        applied_date: today,
        approved_by: None,
        approval_date: None,
        rejection_reason: None,
        medical_certificate: form::clean(req.medical_certificate),
    })
}

fn pending(tx: &Tx, id: u64) -> Result<LeaveApplication> {
    let leave = tx.fetch::<LeaveApplication>(id)?;
    if leave.status != LeaveStatus::Pending {
        return Err(CoreError::conflict(format!(
            "Leave application {id} is not pending"
        )));
    }
    Ok(leave)
}

pub fn approve(tx: &mut Tx, id: u64, actor: &str, today: NaiveDate) -> Result<LeaveApplication> {
    let mut leave = pending(tx, id)?;
    leave.status = LeaveStatus::Approved;
    leave.approved_by = Some(actor.to_string());
    leave.approval_date = Some(today);
    tx.put(&leave)?;
    Ok(leave)
}

pub fn reject(
    tx: &mut Tx,
    id: u64,
    rejection: Rejection,
    actor: &str,
    today: NaiveDate,
) -> Result<LeaveApplication> {
    let mut leave = pending(tx, id)?;
    leave.status = LeaveStatus::Rejected;
    leave.rejection_reason = form::clean(rejection.reason);
    leave.approved_by = Some(actor.to_string());
    leave.approval_date = Some(today);
    tx.put(&leave)?;
    Ok(leave)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::Store;
    use crate::students::{NewStudent, create_student};
    use crate::testing::{day, store};

    fn student(store: &Store) -> Student {
        store
            .write(|tx| {
                create_student(
                    tx,
                    NewStudent {
                        first_name: "Kabir".into(),
                        last_name: "Singh".into(),
                        ..NewStudent::default()
                    },
                    None,
                    day(2025, 6, 1),
                )
            })
            .unwrap()
    }

    fn entry(student_id: u64, date: NaiveDate, status: AttendanceStatus) -> AttendanceEntry {
        AttendanceEntry {
            student_id,
            date,
            status,
            class_id: None,
            section_id: None,
            marked_by: None,
            remarks: None,
        }
    }

    fn leave(student_id: u64) -> LeaveRequest {
        LeaveRequest {
            student_id,
            from_date: day(2025, 7, 10),
            to_date: day(2025, 7, 12),
            reason: "Fever".into(),
            medical_certificate: None,
        }
    }

    #[test]
    fn marking_twice_overwrites() {
        let (_dir, store) = store();
        let s = student(&store);
        let d = day(2025, 7, 1);
        store
            .write(|tx| mark(tx, vec![entry(s.id, d, AttendanceStatus::Absent)], "teacher1"))
            .unwrap();
        let second = store
            .write(|tx| mark(tx, vec![entry(s.id, d, AttendanceStatus::Present)], "teacher2"))
            .unwrap();

        let all = store.read(|r| on_date(r, d)).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, AttendanceStatus::Present);
        assert_eq!(all[0].marked_by.as_deref(), Some("teacher2"));
        assert_eq!(second[0].id, all[0].id);
    }

    #[test]
    fn empty_batch_is_empty() {
        let (_dir, store) = store();
        assert!(store.write(|tx| mark(tx, Vec::new(), "x")).unwrap().is_empty());
    }

    #[test]
    fn unknown_student_aborts_the_batch() {
        let (_dir, store) = store();
        let s = student(&store);
        let d = day(2025, 7, 1);
        let err = store
            .write(|tx| {
                mark(
                    tx,
                    vec![
                        entry(s.id, d, AttendanceStatus::Present),
                        entry(999, d, AttendanceStatus::Present),
                    ],
                    "t",
                )
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert!(store.read(|r| on_date(r, d)).unwrap().is_empty());
    }

    #[test]
    fn stats_count_absent_as_not_present() {
        let (_dir, store) = store();
        let a = student(&store);
        let b = student(&store);
        let c = student(&store);
        let d = day(2025, 7, 1);
        store
            .write(|tx| {
                mark(
                    tx,
                    vec![
                        entry(a.id, d, AttendanceStatus::Present),
                        entry(b.id, d, AttendanceStatus::Late),
                        entry(c.id, d, AttendanceStatus::Absent),
                    ],
                    "t",
                )
            })
            .unwrap();
        let stats = store.read(|r| stats_for(r, d)).unwrap();
        assert_eq!(
            stats,
            AttendanceStats {
                present: 1,
                total: 3,
                absent: 2
            }
        );
        let none = store.read(|r| stats_for(r, day(2025, 7, 2))).unwrap();
        assert_eq!(none.total, 0);
    }

    #[test]
    fn last_month_window_is_inclusive() {
        let (_dir, store) = store();
        let s = student(&store);
        let dates = [day(2025, 5, 31), day(2025, 6, 1), day(2025, 6, 15), day(2025, 7, 1), day(2025, 7, 2)];
        store
            .write(|tx| {
                let entries = dates
                    .iter()
                    .map(|d| entry(s.id, *d, AttendanceStatus::Present))
                    .collect();
                mark(tx, entries, "t")
            })
            .unwrap();
        let window = store.read(|r| last_month(r, s.id, day(2025, 7, 1))).unwrap();
        let got: Vec<_> = window.iter().map(|a| a.date).collect();
        assert_eq!(got, vec![day(2025, 6, 1), day(2025, 6, 15), day(2025, 7, 1)]);
    }

    #[test]
    fn leave_lifecycle() {
        let (_dir, store) = store();
        let s = student(&store);
        let applied = store.write(|tx| apply(tx, leave(s.id), day(2025, 7, 5))).unwrap();
        assert_eq!(applied.status, LeaveStatus::Pending);
        assert_eq!(applied.applied_date, day(2025, 7, 5));

        let approved = store
            .write(|tx| approve(tx, applied.id, "principal", day(2025, 7, 6)))
            .unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.approval_date, Some(day(2025, 7, 6)));

        let err = store
            .write(|tx| reject(tx, applied.id, Rejection::default(), "x", day(2025, 7, 7)))
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn rejection_records_reason() {
        let (_dir, store) = store();
        let s = student(&store);
        let applied = store.write(|tx| apply(tx, leave(s.id), day(2025, 7, 5))).unwrap();
        let rejected = store
            .write(|tx| {
                reject(
                    tx,
                    applied.id,
                    Rejection {
                        reason: Some("Exams that week".into()),
                    },
                    "teacher1",
                    day(2025, 7, 6),
                )
            })
            .unwrap();
        assert_eq!(rejected.status, LeaveStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Exams that week"));
        assert_eq!(store.read(|r| leaves_for_student(r, s.id)).unwrap().len(), 1);
    }

    #[test]
    fn leave_range_must_be_ordered() {
        let (_dir, store) = store();
        let s = student(&store);
        let mut bad = leave(s.id);
        bad.to_date = day(2025, 7, 1);
        assert!(matches!(
            store.write(|tx| apply(tx, bad, day(2025, 7, 5))).unwrap_err(),
            CoreError::Validation(_)
        ));
    }
}
