//! # Examinations
//!
//! Examinations, per-class subject schedules and student marks.
//!
//! Marks are unique per (student, examination, subject); recording marks
//! for an existing triple updates it. The total is derived:
//! theory + practical when both are present, theory alone otherwise.

use crate::academic::{AcademicYear, SchoolClass, Subject, active_year};
use crate::error::{CoreError, Result, require};
use crate::form::{self, optional_date};
use crate::storage::{Reader, Tx};
use crate::students::Student;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// =============================================================================
// EXAMINATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Examination {
    pub id: u64,
    pub name: String,
    pub exam_type: Option<String>,
    pub academic_year_id: u64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub published: bool,
}

crate::record!(Examination, "examinations", "Examination");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExaminationInput {
    pub name: String,
    #[serde(default)]
    pub exam_type: Option<String>,
    /// Defaults to the active academic year.
    #[serde(default)]
    pub academic_year_id: Option<u64>,
    #[serde(default, deserialize_with = "optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl ExaminationInput {
    fn validate(&self) -> Result<()> {
        require(&self.name, "Name")?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end < start
        {
            return Err(CoreError::validation(
                "End date must not be before start date",
            ));
        }
        Ok(())
    }
}

fn resolve_year(r: &impl Reader, requested: Option<u64>) -> Result<u64> {
    match requested {
        Some(id) => {
            r.ensure::<AcademicYear>(id)?;
            Ok(id)
        }
        None => active_year(r)?
            .map(|y| y.id)
            .ok_or_else(|| CoreError::validation("No active academic year; academicYearId is required")),
    }
}

pub fn create_exam(tx: &mut Tx, input: ExaminationInput) -> Result<Examination> {
    input.validate()?;
    let academic_year_id = resolve_year(tx, input.academic_year_id)?;
    tx.insert(Examination {
        id: 0,
        name: input.name.trim().to_string(),
        exam_type: form::clean(input.exam_type),
        academic_year_id,
        start_date: input.start_date,
        end_date: input.end_date,
        description: form::clean(input.description),
        published: input.published,
    })
}

pub fn update_exam(tx: &mut Tx, id: u64, input: ExaminationInput) -> Result<Examination> {
    input.validate()?;
    let mut exam = tx.fetch::<Examination>(id)?;
    if let Some(year) = input.academic_year_id {
        exam.academic_year_id = resolve_year(tx, Some(year))?;
    }
    exam.name = input.name.trim().to_string();
    exam.exam_type = form::clean(input.exam_type);
    exam.start_date = input.start_date;
    exam.end_date = input.end_date;
    exam.description = form::clean(input.description);
    exam.published = input.published;
    tx.put(&exam)?;
    Ok(exam)
}

pub fn delete_exam(tx: &mut Tx, id: u64) -> Result<()> {
    tx.ensure::<Examination>(id)?;
    tx.ensure_unreferenced::<ExamSchedule>("Examination", |s| s.exam_id == id)?;
    tx.ensure_unreferenced::<Marks>("Examination", |m| m.exam_id == id)?;
    tx.remove::<Examination>(id)?;
    Ok(())
}

// =============================================================================
// SCHEDULE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSchedule {
    pub id: u64,
    pub exam_id: u64,
    pub subject_id: u64,
    pub class_id: u64,
    pub exam_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub room_number: Option<String>,
    pub max_marks: Option<u32>,
    pub pass_marks: Option<u32>,
}

crate::record!(ExamSchedule, "exam_schedules", "ExamSchedule");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub exam_id: u64,
    pub subject_id: u64,
    pub class_id: u64,
    pub exam_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default, alias = "roomNo")]
    pub room_number: Option<String>,
    #[serde(default)]
    pub max_marks: Option<u32>,
    #[serde(default)]
    pub pass_marks: Option<u32>,
}

impl ScheduleInput {
    fn validate(&self, r: &impl Reader) -> Result<()> {
        r.ensure::<Examination>(self.exam_id)?;
        r.ensure::<Subject>(self.subject_id)?;
        r.ensure::<SchoolClass>(self.class_id)?;
        if let (Some(start), Some(end)) = (self.start_time, self.end_time)
            && end <= start
        {
            return Err(CoreError::validation("End time must be after start time"));
        }
        if let (Some(max), Some(pass)) = (self.max_marks, self.pass_marks)
            && pass > max
        {
            return Err(CoreError::validation("Pass marks cannot exceed max marks"));
        }
        Ok(())
    }

    fn into_schedule(self, id: u64) -> ExamSchedule {
        ExamSchedule {
            id,
            exam_id: self.exam_id,
            subject_id: self.subject_id,
            class_id: self.class_id,
            exam_date: self.exam_date,
            start_time: self.start_time,
            end_time: self.end_time,
            room_number: form::clean(self.room_number),
            max_marks: self.max_marks,
            pass_marks: self.pass_marks,
        }
    }
}

pub fn schedules_for_exam(r: &impl Reader, exam_id: u64) -> Result<Vec<ExamSchedule>> {
    r.ensure::<Examination>(exam_id)?;
    let mut schedules = r.filter::<ExamSchedule>(|s| s.exam_id == exam_id)?;
    schedules.sort_by_key(|s| (s.exam_date, s.start_time));
    Ok(schedules)
}

pub fn create_schedule(tx: &mut Tx, input: ScheduleInput) -> Result<ExamSchedule> {
    input.validate(tx)?;
    tx.insert(input.into_schedule(0))
}

pub fn update_schedule(tx: &mut Tx, id: u64, input: ScheduleInput) -> Result<ExamSchedule> {
    tx.ensure::<ExamSchedule>(id)?;
    input.validate(tx)?;
    let schedule = input.into_schedule(id);
    tx.put(&schedule)?;
    Ok(schedule)
}

pub fn delete_schedule(tx: &mut Tx, id: u64) -> Result<()> {
    tx.remove::<ExamSchedule>(id)?;
    Ok(())
}

// =============================================================================
// MARKS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marks {
    pub id: u64,
    pub student_id: u64,
    pub exam_id: u64,
    pub subject_id: u64,
    pub theory_marks: Option<u32>,
    pub practical_marks: Option<u32>,
    pub total_marks: Option<u32>,
    pub grade: Option<String>,
    pub result: Option<String>,
    pub remarks: Option<String>,
    pub entered_by: Option<String>,
    pub is_absent: Option<bool>,
}

crate::record!(Marks, "marks", "Marks");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksInput {
    pub student_id: u64,
    pub exam_id: u64,
    pub subject_id: u64,
    #[serde(default)]
    pub theory_marks: Option<u32>,
    #[serde(default)]
    pub practical_marks: Option<u32>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub is_absent: Option<bool>,
}

/// Marks edit. The total is recomputed from the new theory/practical values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarksUpdate {
    pub theory_marks: Option<u32>,
    pub practical_marks: Option<u32>,
    pub grade: Option<String>,
    pub remarks: Option<String>,
    pub is_absent: Option<bool>,
}

/// theory + practical when both are present, theory alone when only it is.
pub fn total_marks(theory: Option<u32>, practical: Option<u32>) -> Option<u32> {
    match (theory, practical) {
        (Some(t), Some(p)) => Some(t.saturating_add(p)),
        (Some(t), None) => Some(t),
        (None, _) => None,
    }
}

/// Pass mark for a subject in an exam: the schedule for the student's class
/// when it sets one, else the subject's own.
fn pass_mark(
    r: &impl Reader,
    exam_id: u64,
    subject: &Subject,
    student: &Student,
) -> Result<Option<u32>> {
    let scheduled = match student.class_id {
        Some(class_id) => r
            .find::<ExamSchedule>(|s| {
                s.exam_id == exam_id && s.subject_id == subject.id && s.class_id == class_id
            })?
            .and_then(|s| s.pass_marks),
        None => None,
    };
    Ok(scheduled.or(subject.pass_marks))
}

fn derive_result(pass: Option<u32>, total: Option<u32>) -> Option<String> {
    let (pass, total) = (pass?, total?);
    Some(if total >= pass { "PASS" } else { "FAIL" }.to_string())
}

pub fn marks_for_exam(r: &impl Reader, exam_id: u64) -> Result<Vec<Marks>> {
    r.ensure::<Examination>(exam_id)?;
    r.filter::<Marks>(|m| m.exam_id == exam_id)
}

pub fn marks_for_student(r: &impl Reader, exam_id: u64, student_id: u64) -> Result<Vec<Marks>> {
    r.ensure::<Examination>(exam_id)?;
    r.ensure::<Student>(student_id)?;
    r.filter::<Marks>(|m| m.exam_id == exam_id && m.student_id == student_id)
}

/// Create or update the marks for (student, exam, subject).
pub fn record_marks(tx: &mut Tx, input: MarksInput, actor: &str) -> Result<Marks> {
    let student = tx.fetch::<Student>(input.student_id)?;
    tx.ensure::<Examination>(input.exam_id)?;
    let subject = tx.fetch::<Subject>(input.subject_id)?;
    let total = total_marks(input.theory_marks, input.practical_marks);
    let pass = pass_mark(tx, input.exam_id, &subject, &student)?;
    let result = form::clean(input.result).or_else(|| derive_result(pass, total));

    let existing = tx.find::<Marks>(|m| {
        m.student_id == input.student_id
            && m.exam_id == input.exam_id
            && m.subject_id == input.subject_id
    })?;
    let marks = Marks {
        id: existing.map(|m| m.id).unwrap_or(0),
        student_id: input.student_id,
        exam_id: input.exam_id,
        subject_id: input.subject_id,
        theory_marks: input.theory_marks,
        practical_marks: input.practical_marks,
        total_marks: total,
        grade: form::clean(input.grade),
        result,
        remarks: form::clean(input.remarks),
        entered_by: Some(actor.to_string()),
        is_absent: input.is_absent,
    };
    if marks.id == 0 {
        tx.insert(marks)
    } else {
        tx.put(&marks)?;
        Ok(marks)
    }
}

/// Record a batch atomically.
pub fn record_bulk(tx: &mut Tx, inputs: Vec<MarksInput>, actor: &str) -> Result<Vec<Marks>> {
    inputs
        .into_iter()
        .map(|input| record_marks(tx, input, actor))
        .collect()
}

pub fn update_marks(tx: &mut Tx, id: u64, input: MarksUpdate) -> Result<Marks> {
    let mut marks = tx.fetch::<Marks>(id)?;
    let subject = tx.fetch::<Subject>(marks.subject_id)?;
    let student = tx.fetch::<Student>(marks.student_id)?;
    let total = total_marks(input.theory_marks, input.practical_marks);
    let pass = pass_mark(tx, marks.exam_id, &subject, &student)?;
    marks.theory_marks = input.theory_marks;
    marks.practical_marks = input.practical_marks;
    marks.total_marks = total;
    marks.grade = form::clean(input.grade);
    marks.remarks = form::clean(input.remarks);
    marks.is_absent = input.is_absent;
    marks.result = derive_result(pass, total).or(marks.result);
    tx.put(&marks)?;
    Ok(marks)
}

pub fn delete_marks(tx: &mut Tx, id: u64) -> Result<()> {
    tx.remove::<Marks>(id)?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
