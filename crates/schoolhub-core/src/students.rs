//! # Students and Parents
//!
//! Student enrolment, lookup and parent contact records.
//!
//! Enrolment creates the parent record, an optional PARENT login and the
//! student in one transaction. Admission numbers are `STU<year><id:05>`,
//! where `id` is the student's own id.

use crate::academic::{AcademicYear, SchoolClass, Section, active_year, ensure_section_in_class};
use crate::attendance::{Attendance, LeaveApplication};
use crate::error::{CoreError, Result, require};
use crate::exams::Marks;
use crate::fees::FeePayment;
use crate::form::{self, first_present, optional_date};
use crate::storage::{Reader, Tx};
use crate::users::{self, NewLogin, NewUser, Role};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// =============================================================================
// RECORDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: u64,
    pub admission_no: String,
    pub roll_no: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub photo: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub class_id: Option<u64>,
    pub section_id: Option<u64>,
    pub academic_year_id: Option<u64>,
    pub parent_id: Option<u64>,
    pub transport_route_id: Option<u64>,
    pub admission_date: Option<NaiveDate>,
    pub active: bool,
    pub previous_school: Option<String>,
}

crate::record!(Student, "students", "Student");

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    #[serde(default)]
    pub id: u64,
    pub father_name: Option<String>,
    pub father_occupation: Option<String>,
    pub father_phone: Option<String>,
    pub father_email: Option<String>,
    pub mother_name: Option<String>,
    pub mother_occupation: Option<String>,
    pub mother_phone: Option<String>,
    pub mother_email: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_email: Option<String>,
    pub guardian_relation: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
}

crate::record!(Parent, "parents", "Parent");

impl Parent {
    /// Preferred phone for notifications: father, then mother, then guardian.
    pub fn contact_phone(&self) -> Option<&str> {
        first_present([
            self.father_phone.as_deref(),
            self.mother_phone.as_deref(),
            self.guardian_phone.as_deref(),
        ])
    }

    /// Name used to address the parent: father, then mother, else "Parent".
    pub fn display_name(&self) -> &str {
        first_present([self.father_name.as_deref(), self.mother_name.as_deref()])
            .unwrap_or("Parent")
    }
}

// =============================================================================
// INPUTS
// =============================================================================

/// Enrolment request: student fields, parent fields and optional parent login.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    #[serde(deserialize_with = "optional_date")]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub roll_no: Option<String>,
    #[serde(deserialize_with = "optional_date")]
    pub admission_date: Option<NaiveDate>,
    pub class_id: Option<u64>,
    pub section_id: Option<u64>,
    pub academic_year_id: Option<u64>,
    pub previous_school: Option<String>,

    pub parent_username: Option<String>,
    pub parent_password: Option<String>,
    pub parent_full_name: Option<String>,
    pub parent_phone: Option<String>,
    pub parent_email: Option<String>,

    pub father_name: Option<String>,
    pub father_phone: Option<String>,
    pub father_email: Option<String>,
    pub father_occupation: Option<String>,
    pub mother_name: Option<String>,
    pub mother_phone: Option<String>,
    pub mother_email: Option<String>,
    pub mother_occupation: Option<String>,
    /// Parent's address.
    pub address2: Option<String>,
    pub emergency_contact: Option<String>,
}

impl NewStudent {
    /// Username and plaintext password, when both are non-blank.
    pub fn parent_credentials(&self) -> Option<(String, String)> {
        let username = form::clean(self.parent_username.clone())?;
        let password = self.parent_password.clone()?;
        if password.trim().is_empty() {
            return None;
        }
        Some((username, password))
    }
}

/// Student edit. Class and section change only when given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentUpdate {
    pub first_name: String,
    pub last_name: String,
    #[serde(deserialize_with = "optional_date")]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub roll_no: Option<String>,
    pub class_id: Option<u64>,
    pub section_id: Option<u64>,
}

// =============================================================================
// QUERIES
// =============================================================================

/// Case-insensitive substring match on first name, last name or admission number.
pub fn search(r: &impl Reader, query: &str) -> Result<Vec<Student>> {
    let needle = query.trim().to_lowercase();
    r.filter::<Student>(|s| {
        s.first_name.to_lowercase().contains(&needle)
            || s.last_name.to_lowercase().contains(&needle)
            || s.admission_no.to_lowercase().contains(&needle)
    })
}

pub fn by_parent(r: &impl Reader, parent_id: u64) -> Result<Vec<Student>> {
    r.filter::<Student>(|s| s.parent_id == Some(parent_id))
}

pub fn by_class_section(r: &impl Reader, class_id: u64, section_id: u64) -> Result<Vec<Student>> {
    r.filter::<Student>(|s| s.class_id == Some(class_id) && s.section_id == Some(section_id))
}

/// Students in a class, optionally narrowed to one section.
pub fn by_class(r: &impl Reader, class_id: u64, section_id: Option<u64>) -> Result<Vec<Student>> {
    r.filter::<Student>(|s| {
        s.class_id == Some(class_id) && section_id.is_none_or(|sec| s.section_id == Some(sec))
    })
}

/// The student's parent record. `NotFound` when the student has none.
pub fn parent_of(r: &impl Reader, student_id: u64) -> Result<Parent> {
    let student = r.fetch::<Student>(student_id)?;
    let parent_id = student
        .parent_id
        .ok_or_else(|| CoreError::not_found("Parent", "student_id", student_id))?;
    r.get::<Parent>(parent_id)?
        .ok_or_else(|| CoreError::not_found("Parent", "student_id", student_id))
}

// =============================================================================
// CHANGES
// =============================================================================

fn validate_placement(
    r: &impl Reader,
    class_id: Option<u64>,
    section_id: Option<u64>,
) -> Result<()> {
    match (class_id, section_id) {
        (Some(class), Some(section)) => ensure_section_in_class(r, class, section),
        (Some(class), None) => r.ensure::<SchoolClass>(class),
        (None, Some(section)) => r.ensure::<Section>(section),
        (None, None) => Ok(()),
    }
}

/// Enrol a student.
///
/// `login` carries the parent's username and already-hashed password. When the
/// username is taken the login is skipped and the rest of the enrolment proceeds.
pub fn create_student(
    tx: &mut Tx,
    input: NewStudent,
    login: Option<NewLogin>,
    today: NaiveDate,
) -> Result<Student> {
    require(&input.first_name, "First name")?;
    require(&input.last_name, "Last name")?;
    validate_placement(tx, input.class_id, input.section_id)?;
    let academic_year_id = match input.academic_year_id {
        Some(id) => {
            tx.ensure::<AcademicYear>(id)?;
            Some(id)
        }
        None => active_year(tx)?.map(|y| y.id),
    };

    let parent = tx.insert(Parent {
        father_name: form::clean(input.father_name.clone()),
        father_occupation: form::clean(input.father_occupation),
        father_phone: form::clean(input.father_phone.clone()),
        father_email: form::clean(input.father_email.clone()),
        mother_name: form::clean(input.mother_name),
        mother_occupation: form::clean(input.mother_occupation),
        mother_phone: form::clean(input.mother_phone),
        mother_email: form::clean(input.mother_email),
        address: form::clean(input.address2),
        emergency_contact: form::clean(input.emergency_contact),
        ..Parent::default()
    })?;

    if let Some(login) = login
        && users::find_by_username(tx, &login.username)?.is_none()
    {
        let mut user = NewUser::new(login, Role::Parent);
        user.email = form::clean(input.parent_email).or_else(|| parent.father_email.clone());
        user.full_name =
            form::clean(input.parent_full_name).or_else(|| parent.father_name.clone());
        user.contact = form::clean(input.parent_phone).or_else(|| parent.father_phone.clone());
        user.entity_id = Some(parent.id);
        users::create_user(tx, user)?;
    }

    let id = tx.next_id::<Student>()?;
    let student = Student {
        id,
        admission_no: format!("STU{}{:05}", today.year(), id),
        roll_no: form::clean(input.roll_no),
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        date_of_birth: input.date_of_birth,
        gender: form::clean(input.gender),
        blood_group: form::clean(input.blood_group),
        photo: None,
        address: form::clean(input.address),
        phone: form::clean(input.phone),
        email: form::clean(input.email),
        class_id: input.class_id,
        section_id: input.section_id,
        academic_year_id,
        parent_id: Some(parent.id),
        transport_route_id: None,
        admission_date: Some(input.admission_date.unwrap_or(today)),
        active: true,
        previous_school: form::clean(input.previous_school),
    };
    tx.put(&student)?;
    Ok(student)
}

pub fn update_student(tx: &mut Tx, id: u64, input: StudentUpdate) -> Result<Student> {
    let mut student = tx.fetch::<Student>(id)?;
    require(&input.first_name, "First name")?;
    require(&input.last_name, "Last name")?;
    let class_id = input.class_id.or(student.class_id);
    let section_id = input.section_id.or(student.section_id);
    if input.class_id.is_some() || input.section_id.is_some() {
        validate_placement(tx, class_id, section_id)?;
    }

    student.first_name = input.first_name.trim().to_string();
    student.last_name = input.last_name.trim().to_string();
    student.date_of_birth = input.date_of_birth;
    student.gender = form::clean(input.gender);
    student.blood_group = form::clean(input.blood_group);
    student.address = form::clean(input.address);
    student.phone = form::clean(input.phone);
    student.email = form::clean(input.email);
    student.roll_no = form::clean(input.roll_no);
    student.class_id = class_id;
    student.section_id = section_id;
    tx.put(&student)?;
    Ok(student)
}

pub fn delete_student(tx: &mut Tx, id: u64) -> Result<()> {
    tx.ensure::<Student>(id)?;
    let owner = "Student";
    tx.ensure_unreferenced::<Attendance>(owner, |a| a.student_id == id)?;
    tx.ensure_unreferenced::<Marks>(owner, |m| m.student_id == id)?;
    tx.ensure_unreferenced::<LeaveApplication>(owner, |l| l.student_id == id)?;
    tx.ensure_unreferenced::<FeePayment>(owner, |p| p.student_id == id)?;
    tx.remove::<Student>(id)?;
    Ok(())
}

/// Create the student's parent record, or overwrite the existing one.
pub fn save_parent(tx: &mut Tx, student_id: u64, input: Parent) -> Result<Parent> {
    let mut student = tx.fetch::<Student>(student_id)?;
    let existing = match student.parent_id {
        Some(pid) => tx.get::<Parent>(pid)?,
        None => None,
    };
    let fields = Parent {
        id: 0,
        father_name: form::clean(input.father_name),
        father_occupation: form::clean(input.father_occupation),
        father_phone: form::clean(input.father_phone),
        father_email: form::clean(input.father_email),
        mother_name: form::clean(input.mother_name),
        mother_occupation: form::clean(input.mother_occupation),
        mother_phone: form::clean(input.mother_phone),
        mother_email: form::clean(input.mother_email),
        guardian_name: form::clean(input.guardian_name),
        guardian_phone: form::clean(input.guardian_phone),
        guardian_email: form::clean(input.guardian_email),
        guardian_relation: form::clean(input.guardian_relation),
        address: form::clean(input.address),
        emergency_contact: form::clean(input.emergency_contact),
    };
    match existing {
        Some(old) => {
            let parent = Parent { id: old.id, ..fields };
            tx.put(&parent)?;
            Ok(parent)
        }
        None => {
            let parent = tx.insert(fields)?;
            student.parent_id = Some(parent.id);
            tx.put(&student)?;
            Ok(parent)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
