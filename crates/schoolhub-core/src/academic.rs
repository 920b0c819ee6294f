//! # Academic Setup
//!
//! Academic years, classes, sections and subjects: the structure every
//! other record hangs off.
//!
//! ## Invariants
//!
//! - At most one academic year is active. Activating a year deactivates the
//!   previous one in the same transaction.
//! - A year's end date never precedes its start date.
//! - Class codes and subject codes are unique.
//! - A section always belongs to an existing class.

use crate::attendance::Attendance;
use crate::error::{CoreError, Result, require};
use crate::exams::{ExamSchedule, Examination, Marks};
use crate::fees::{FeePayment, FeeStructure};
use crate::form;
use crate::homework::Homework;
use crate::storage::{Reader, Tx};
use crate::students::Student;
use crate::teachers::{Teacher, TeacherAssignment};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// ACADEMIC YEAR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
    pub id: u64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(rename = "isActive")]
    pub active: bool,
    pub description: Option<String>,
}

crate::record!(AcademicYear, "academic_years", "AcademicYear");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYearInput {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl AcademicYearInput {
    fn validate(&self) -> Result<()> {
        require(&self.name, "Name")?;
        if self.end_date < self.start_date {
            return Err(CoreError::validation(
                "End date must not be before start date",
            ));
        }
        Ok(())
    }
}

pub fn active_year(r: &impl Reader) -> Result<Option<AcademicYear>> {
    r.find::<AcademicYear>(|y| y.active)
}

fn deactivate_others(tx: &mut Tx, keep: u64) -> Result<()> {
    for mut year in tx.filter::<AcademicYear>(|y| y.active && y.id != keep)? {
        year.active = false;
        tx.put(&year)?;
    }
    Ok(())
}

pub fn create_year(tx: &mut Tx, input: AcademicYearInput) -> Result<AcademicYear> {
    input.validate()?;
    let year = tx.insert(AcademicYear {
        id: 0,
        name: input.name.trim().to_string(),
        start_date: input.start_date,
        end_date: input.end_date,
        active: input.is_active,
        description: form::clean(input.description),
    })?;
    if year.active {
        deactivate_others(tx, year.id)?;
    }
    Ok(year)
}

pub fn update_year(tx: &mut Tx, id: u64, input: AcademicYearInput) -> Result<AcademicYear> {
    input.validate()?;
    let mut year = tx.fetch::<AcademicYear>(id)?;
    year.name = input.name.trim().to_string();
    year.start_date = input.start_date;
    year.end_date = input.end_date;
    year.active = input.is_active;
    year.description = form::clean(input.description);
    tx.put(&year)?;
    if year.active {
        deactivate_others(tx, year.id)?;
    }
    Ok(year)
}

pub fn delete_year(tx: &mut Tx, id: u64) -> Result<()> {
    tx.ensure::<AcademicYear>(id)?;
    let owner = "AcademicYear";
    tx.ensure_unreferenced::<Student>(owner, |s| s.academic_year_id == Some(id))?;
    tx.ensure_unreferenced::<Examination>(owner, |e| e.academic_year_id == id)?;
    tx.ensure_unreferenced::<FeeStructure>(owner, |f| f.academic_year_id == id)?;
    tx.ensure_unreferenced::<FeePayment>(owner, |p| p.academic_year_id == id)?;
    tx.ensure_unreferenced::<TeacherAssignment>(owner, |a| a.academic_year_id == Some(id))?;
    tx.remove::<AcademicYear>(id)?;
    Ok(())
}

// =============================================================================
// CLASS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: u64,
    pub name: String,
    pub code: Option<String>,
    pub grade: Option<u32>,
    pub capacity: Option<u32>,
    pub description: Option<String>,
}

crate::record!(SchoolClass, "classes", "Class");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInput {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub grade: Option<u32>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

fn ensure_class_code_free(r: &impl Reader, code: Option<&str>, except: u64) -> Result<()> {
    if let Some(code) = code
        && r.find::<SchoolClass>(|c| c.id != except && c.code.as_deref() == Some(code))?
            .is_some()
    {
        return Err(CoreError::conflict(format!("Class code already exists: {code}")));
    }
    Ok(())
}

pub fn create_class(tx: &mut Tx, input: ClassInput) -> Result<SchoolClass> {
    require(&input.name, "Name")?;
    let code = form::clean(input.code);
    ensure_class_code_free(tx, code.as_deref(), 0)?;
    tx.insert(SchoolClass {
        id: 0,
        name: input.name.trim().to_string(),
        code,
        grade: input.grade,
        capacity: input.capacity,
        description: form::clean(input.description),
    })
}

pub fn update_class(tx: &mut Tx, id: u64, input: ClassInput) -> Result<SchoolClass> {
    require(&input.name, "Name")?;
    let mut class = tx.fetch::<SchoolClass>(id)?;
    let code = form::clean(input.code);
    ensure_class_code_free(tx, code.as_deref(), id)?;
    class.name = input.name.trim().to_string();
    class.code = code;
    class.grade = input.grade;
    class.capacity = input.capacity;
    class.description = form::clean(input.description);
    tx.put(&class)?;
    Ok(class)
}

pub fn delete_class(tx: &mut Tx, id: u64) -> Result<()> {
    tx.ensure::<SchoolClass>(id)?;
    let owner = "Class";
    tx.ensure_unreferenced::<Section>(owner, |s| s.class_id == id)?;
    tx.ensure_unreferenced::<Student>(owner, |s| s.class_id == Some(id))?;
    tx.ensure_unreferenced::<FeeStructure>(owner, |f| f.class_id == id)?;
    tx.ensure_unreferenced::<Homework>(owner, |h| h.class_id == id)?;
    tx.ensure_unreferenced::<ExamSchedule>(owner, |s| s.class_id == id)?;
    tx.ensure_unreferenced::<TeacherAssignment>(owner, |a| a.class_id == id)?;
    tx.ensure_unreferenced::<Attendance>(owner, |a| a.class_id == Some(id))?;
    tx.remove::<SchoolClass>(id)?;
    Ok(())
}

// =============================================================================
// SECTION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: u64,
    pub name: String,
    pub class_id: u64,
    pub capacity: u32,
    pub class_teacher_id: Option<u64>,
    pub description: Option<String>,
}

crate::record!(Section, "sections", "Section");

/// Default seats per section.
pub const DEFAULT_SECTION_CAPACITY: u32 = 40;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    pub name: String,
    pub class_id: u64,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub class_teacher_id: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SectionInput {
    fn validate(&self, r: &impl Reader) -> Result<()> {
        require(&self.name, "Name")?;
        r.ensure::<SchoolClass>(self.class_id)?;
        if let Some(teacher) = self.class_teacher_id {
            r.ensure::<Teacher>(teacher)?;
        }
        Ok(())
    }
}

pub fn sections_by_class(r: &impl Reader, class_id: u64) -> Result<Vec<Section>> {
    r.filter::<Section>(|s| s.class_id == class_id)
}

pub fn create_section(tx: &mut Tx, input: SectionInput) -> Result<Section> {
    input.validate(tx)?;
    tx.insert(Section {
        id: 0,
        name: input.name.trim().to_string(),
        class_id: input.class_id,
        capacity: input.capacity.unwrap_or(DEFAULT_SECTION_CAPACITY),
        class_teacher_id: input.class_teacher_id,
        description: form::clean(input.description),
    })
}

pub fn update_section(tx: &mut Tx, id: u64, input: SectionInput) -> Result<Section> {
    input.validate(tx)?;
    let mut section = tx.fetch::<Section>(id)?;
    section.name = input.name.trim().to_string();
    section.class_id = input.class_id;
    section.capacity = input.capacity.unwrap_or(section.capacity);
    section.class_teacher_id = input.class_teacher_id;
    section.description = form::clean(input.description);
    tx.put(&section)?;
    Ok(section)
}

pub fn delete_section(tx: &mut Tx, id: u64) -> Result<()> {
    tx.ensure::<Section>(id)?;
    let owner = "Section";
    tx.ensure_unreferenced::<Student>(owner, |s| s.section_id == Some(id))?;
    tx.ensure_unreferenced::<Homework>(owner, |h| h.section_id == Some(id))?;
    tx.ensure_unreferenced::<Attendance>(owner, |a| a.section_id == Some(id))?;
    tx.remove::<Section>(id)?;
    Ok(())
}

/// `Validation` unless the section belongs to the class.
pub(crate) fn ensure_section_in_class(
    r: &impl Reader,
    class_id: u64,
    section_id: u64,
) -> Result<()> {
    let section = r.fetch::<Section>(section_id)?;
    if section.class_id != class_id {
        return Err(CoreError::validation(format!(
            "Section {section_id} does not belong to class {class_id}"
        )));
    }
    Ok(())
}

// =============================================================================
// SUBJECT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: u64,
    pub name: String,
    pub code: String,
    pub subject_type: Option<String>,
    pub max_marks: Option<u32>,
    pub theory_max_marks: Option<u32>,
    pub practical_max_marks: Option<u32>,
    pub pass_marks: Option<u32>,
    pub description: Option<String>,
}

crate::record!(Subject, "subjects", "Subject");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInput {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub subject_type: Option<String>,
    #[serde(default)]
    pub max_marks: Option<u32>,
    #[serde(default)]
    pub theory_max_marks: Option<u32>,
    #[serde(default)]
    pub practical_max_marks: Option<u32>,
    #[serde(default)]
    pub pass_marks: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SubjectInput {
    fn validate(&self, r: &impl Reader, except: u64) -> Result<()> {
        require(&self.name, "Name")?;
        require(&self.code, "Code")?;
        let code = self.code.trim();
        if r.find::<Subject>(|s| s.id != except && s.code == code)?.is_some() {
            return Err(CoreError::conflict(format!("Subject code already exists: {code}")));
        }
        if let (Some(max), Some(pass)) = (self.max_marks, self.pass_marks)
            && pass > max
        {
            return Err(CoreError::validation("Pass marks cannot exceed max marks"));
        }
        Ok(())
    }

    fn apply(self, subject: &mut Subject) {
        subject.name = self.name.trim().to_string();
        subject.code = self.code.trim().to_string();
        subject.subject_type = form::clean(self.subject_type);
        subject.max_marks = self.max_marks;
        subject.theory_max_marks = self.theory_max_marks;
        subject.practical_max_marks = self.practical_max_marks;
        subject.pass_marks = self.pass_marks;
        subject.description = form::clean(self.description);
    }
}

pub fn create_subject(tx: &mut Tx, input: SubjectInput) -> Result<Subject> {
    input.validate(tx, 0)?;
    let mut subject = Subject {
        id: 0,
        name: String::new(),
        code: String::new(),
        subject_type: None,
        max_marks: None,
        theory_max_marks: None,
        practical_max_marks: None,
        pass_marks: None,
        description: None,
    };
    input.apply(&mut subject);
    tx.insert(subject)
}

pub fn update_subject(tx: &mut Tx, id: u64, input: SubjectInput) -> Result<Subject> {
    let mut subject = tx.fetch::<Subject>(id)?;
    input.validate(tx, id)?;
    input.apply(&mut subject);
    tx.put(&subject)?;
    Ok(subject)
}

pub fn delete_subject(tx: &mut Tx, id: u64) -> Result<()> {
    tx.ensure::<Subject>(id)?;
    let owner = "Subject";
    tx.ensure_unreferenced::<TeacherAssignment>(owner, |a| a.subject_id == id)?;
    tx.ensure_unreferenced::<ExamSchedule>(owner, |s| s.subject_id == id)?;
    tx.ensure_unreferenced::<Marks>(owner, |m| m.subject_id == id)?;
    tx.ensure_unreferenced::<Homework>(owner, |h| h.subject_id == id)?;
    tx.remove::<Subject>(id)?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
