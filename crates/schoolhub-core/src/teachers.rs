//! # Teachers
//!
//! Teacher records, their optional TEACHER login and subject assignments
//! (teacher + subject + class, optionally per academic year).
//!
//! Employee ids are `EMP<year><id:04>`.

use crate::academic::{AcademicYear, SchoolClass, Section, Subject, active_year};
use crate::error::{CoreError, Result, require};
use crate::form::{self, optional_date};
use crate::homework::Homework;
use crate::storage::{Reader, Tx};
use crate::users::{self, NewLogin, NewUser, Role, User};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// =============================================================================
// RECORDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: u64,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub designation: Option<String>,
    pub joining_date: Option<NaiveDate>,
    pub photo: Option<String>,
    pub address: Option<String>,
    pub specialization: Option<String>,
    pub active: bool,
    pub user_id: Option<u64>,
}

crate::record!(Teacher, "teachers", "Teacher");

impl Teacher {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A teacher teaching a subject to a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAssignment {
    pub id: u64,
    pub teacher_id: u64,
    pub subject_id: u64,
    pub class_id: u64,
    pub academic_year_id: Option<u64>,
}

crate::record!(TeacherAssignment, "teacher_assignments", "TeacherSubjectAssignment");

// =============================================================================
// INPUTS
// =============================================================================

/// Teacher fields shared by create and update. `login_*` only matter on create.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeacherInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(deserialize_with = "optional_date")]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<String>,
    pub designation: Option<String>,
    pub specialization: Option<String>,
    pub address: Option<String>,
    #[serde(deserialize_with = "optional_date")]
    pub joining_date: Option<NaiveDate>,
    pub active: Option<bool>,
    pub login_username: Option<String>,
    pub login_password: Option<String>,
}

impl TeacherInput {
    /// Username and plaintext password, when both are non-blank.
    pub fn login_credentials(&self) -> Option<(String, String)> {
        let username = form::clean(self.login_username.clone())?;
        let password = self.login_password.clone()?;
        if password.trim().is_empty() {
            return None;
        }
        Some((username, password))
    }

    fn apply(self, teacher: &mut Teacher) {
        teacher.first_name = self.first_name.trim().to_string();
        teacher.last_name = self.last_name.trim().to_string();
        teacher.date_of_birth = self.date_of_birth;
        teacher.gender = form::clean(self.gender);
        teacher.phone = form::clean(self.phone);
        teacher.email = form::clean(self.email);
        teacher.qualification = form::clean(self.qualification);
        teacher.experience = form::clean(self.experience);
        teacher.designation = form::clean(self.designation);
        teacher.specialization = form::clean(self.specialization);
        teacher.address = form::clean(self.address);
        if let Some(joining) = self.joining_date {
            teacher.joining_date = Some(joining);
        }
        if let Some(active) = self.active {
            teacher.active = active;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInput {
    pub teacher_id: u64,
    pub subject_id: u64,
    pub class_id: u64,
    #[serde(default)]
    pub academic_year_id: Option<u64>,
}

// =============================================================================
// TEACHERS
// =============================================================================

/// Create a teacher with a generated employee id and an optional TEACHER login.
///
/// A taken username skips the login; the teacher is still created.
pub fn create_teacher(
    tx: &mut Tx,
    input: TeacherInput,
    login: Option<NewLogin>,
    today: NaiveDate,
) -> Result<Teacher> {
    require(&input.first_name, "First name")?;
    require(&input.last_name, "Last name")?;
    let id = tx.next_id::<Teacher>()?;
    let mut teacher = Teacher {
        id,
        employee_id: format!("EMP{}{:04}", today.year(), id),
        first_name: String::new(),
        last_name: String::new(),
        date_of_birth: None,
        gender: None,
        phone: None,
        email: None,
        qualification: None,
        experience: None,
        designation: None,
        joining_date: None,
        photo: None,
        address: None,
        specialization: None,
        active: true,
        user_id: None,
    };
    input.apply(&mut teacher);

    if let Some(login) = login
        && users::find_by_username(tx, &login.username)?.is_none()
    {
        let mut user = NewUser::new(login, Role::Teacher);
        user.email = teacher.email.clone();
        user.full_name = Some(teacher.full_name());
        user.contact = teacher.phone.clone();
        user.entity_id = Some(teacher.id);
        teacher.user_id = Some(users::create_user(tx, user)?.id);
    }

    tx.put(&teacher)?;
    Ok(teacher)
}

pub fn update_teacher(tx: &mut Tx, id: u64, input: TeacherInput) -> Result<Teacher> {
    let mut teacher = tx.fetch::<Teacher>(id)?;
    require(&input.first_name, "First name")?;
    require(&input.last_name, "Last name")?;
    input.apply(&mut teacher);
    tx.put(&teacher)?;
    Ok(teacher)
}

/// Delete a teacher and its login account.
pub fn delete_teacher(tx: &mut Tx, id: u64) -> Result<()> {
    let teacher = tx.fetch::<Teacher>(id)?;
    let owner = "Teacher";
    tx.ensure_unreferenced::<TeacherAssignment>(owner, |a| a.teacher_id == id)?;
    tx.ensure_unreferenced::<Homework>(owner, |h| h.teacher_id == id)?;
    tx.ensure_unreferenced::<Section>(owner, |s| s.class_teacher_id == Some(id))?;
    if let Some(user_id) = teacher.user_id
        && tx.exists::<User>(user_id)?
    {
        tx.remove::<User>(user_id)?;
    }
    tx.remove::<Teacher>(id)?;
    Ok(())
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

pub fn assignments_for_teacher(r: &impl Reader, teacher_id: u64) -> Result<Vec<TeacherAssignment>> {
    r.ensure::<Teacher>(teacher_id)?;
    r.filter::<TeacherAssignment>(|a| a.teacher_id == teacher_id)
}

/// Assign a subject/class to a teacher. The year defaults to the active one.
pub fn assign(tx: &mut Tx, input: AssignmentInput) -> Result<TeacherAssignment> {
    tx.ensure::<Teacher>(input.teacher_id)?;
    tx.ensure::<Subject>(input.subject_id)?;
    tx.ensure::<SchoolClass>(input.class_id)?;
    let academic_year_id = match input.academic_year_id {
        Some(id) => {
            tx.ensure::<AcademicYear>(id)?;
            Some(id)
        }
        None => active_year(tx)?.map(|y| y.id),
    };
    let duplicate = tx.find::<TeacherAssignment>(|a| {
        a.teacher_id == input.teacher_id
            && a.subject_id == input.subject_id
            && a.class_id == input.class_id
    })?;
    if duplicate.is_some() {
        return Err(CoreError::conflict(
            "Teacher is already assigned to this subject and class",
        ));
    }
    tx.insert(TeacherAssignment {
        id: 0,
        teacher_id: input.teacher_id,
        subject_id: input.subject_id,
        class_id: input.class_id,
        academic_year_id,
    })
}

pub fn unassign(tx: &mut Tx, id: u64) -> Result<()> {
    tx.remove::<TeacherAssignment>(id)?;
    Ok(())
}

// =============================================================================
// CLASS ROSTER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectBrief {
    pub id: u64,
    pub name: String,
    pub code: String,
    pub subject_type: Option<String>,
}

/// An active teacher of a class with the subjects they teach there.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTeacher {
    pub id: u64,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<String>,
    pub qualification: Option<String>,
    pub specialization: Option<String>,
    pub subjects: Vec<SubjectBrief>,
}

/// Active teachers assigned to a class, grouped by teacher in assignment order.
pub fn teachers_for_class(r: &impl Reader, class_id: u64) -> Result<Vec<ClassTeacher>> {
    r.ensure::<SchoolClass>(class_id)?;
    let mut roster: Vec<ClassTeacher> = Vec::new();
    for a in r.filter::<TeacherAssignment>(|a| a.class_id == class_id)? {
        let Some(t) = r.get::<Teacher>(a.teacher_id)?.filter(|t| t.active) else {
            continue;
        };
        let pos = match roster.iter().position(|c| c.id == t.id) {
            Some(pos) => pos,
            None => {
                roster.push(ClassTeacher {
                    id: t.id,
                    employee_id: t.employee_id,
                    first_name: t.first_name,
                    last_name: t.last_name,
                    email: t.email,
                    phone: t.phone,
                    designation: t.designation,
                    qualification: t.qualification,
                    specialization: t.specialization,
                    subjects: Vec::new(),
                });
                roster.len() - 1
            }
        };
        if let Some(s) = r.get::<Subject>(a.subject_id)?
            && let Some(entry) = roster.get_mut(pos)
        {
            entry.subjects.push(SubjectBrief {
                id: s.id,
                name: s.name,
                code: s.code,
                subject_type: s.subject_type,
            });
        }
    }
    Ok(roster)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::academic::{ClassInput, SubjectInput, create_class, create_subject};
    use crate::storage::Store;
    use crate::testing::{day, store};

    fn teacher(first: &str) -> TeacherInput {
        TeacherInput {
            first_name: first.into(),
            last_name: "Verma".into(),
            email: Some(format!("{}@school.test", first.to_lowercase())),
            phone: Some("9811111111".into()),
            designation: Some("TGT".into()),
            ..TeacherInput::default()
        }
    }

    fn setup(store: &Store) -> (u64, u64, u64) {
        store
            .write(|tx| {
                let class = create_class(
                    tx,
                    ClassInput {
                        name: "Class 3".into(),
                        code: Some("CLASS_3".into()),
                        grade: Some(3),
                        capacity: None,
                        description: None,
                    },
                )?;
                let math = create_subject(tx, subject("Mathematics", "MATH"))?;
                let eng = create_subject(tx, subject("English", "ENG"))?;
                Ok((class.id, math.id, eng.id))
            })
            .unwrap()
    }

    fn subject(name: &str, code: &str) -> SubjectInput {
        SubjectInput {
            name: name.into(),
            code: code.into(),
            subject_type: Some("THEORY".into()),
            max_marks: None,
            theory_max_marks: None,
            practical_max_marks: None,
            pass_marks: None,
            description: None,
        }
    }

    fn assignment(teacher_id: u64, subject_id: u64, class_id: u64) -> AssignmentInput {
        AssignmentInput {
            teacher_id,
            subject_id,
            class_id,
            academic_year_id: None,
        }
    }

    #[test]
    fn create_generates_employee_id_and_login() {
        let (_dir, store) = store();
        let login = NewLogin {
            username: "anita".into(),
            password_hash: "h".into(),
        };
        let t = store
            .write(|tx| create_teacher(tx, teacher("Anita"), Some(login), day(2025, 7, 1)))
            .unwrap();
        assert_eq!(t.employee_id, "EMP20250001");
        assert!(t.active);

        let user = store.read(|r| r.fetch::<User>(t.user_id.unwrap())).unwrap();
        assert_eq!(user.role, Role::Teacher);
        assert_eq!(user.entity_id, Some(t.id));
        assert_eq!(user.full_name.as_deref(), Some("Anita Verma"));
    }

    #[test]
    fn duplicate_assignment_conflicts() {
        let (_dir, store) = store();
        let (class, math, _) = setup(&store);
        let t = store
            .write(|tx| create_teacher(tx, teacher("Anita"), None, day(2025, 7, 1)))
            .unwrap();
        store.write(|tx| assign(tx, assignment(t.id, math, class))).unwrap();
        let err = store
            .write(|tx| assign(tx, assignment(t.id, math, class)))
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn class_roster_groups_subjects_and_skips_inactive() {
        let (_dir, store) = store();
        let (class, math, eng) = setup(&store);
        let (a, b) = store
            .write(|tx| {
                Ok((
                    create_teacher(tx, teacher("Anita"), None, day(2025, 7, 1))?,
                    create_teacher(tx, teacher("Bala"), None, day(2025, 7, 1))?,
                ))
            })
            .unwrap();
        store
            .write(|tx| {
                assign(tx, assignment(a.id, math, class))?;
                assign(tx, assignment(b.id, eng, class))?;
                assign(tx, assignment(a.id, eng, class))?;
                Ok(())
            })
            .unwrap();

        let roster = store.read(|r| teachers_for_class(r, class)).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].id, a.id);
        let codes: Vec<_> = roster[0].subjects.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, ["MATH", "ENG"]);

        let mut deactivate = teacher("Bala");
        deactivate.active = Some(false);
        store.write(|tx| update_teacher(tx, b.id, deactivate)).unwrap();
        let roster = store.read(|r| teachers_for_class(r, class)).unwrap();
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn roster_for_missing_class_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.read(|r| teachers_for_class(r, 42)).unwrap_err(),
            CoreError::NotFound { .. }
        ));
    }

    #[test]
    fn delete_restricted_by_assignment_then_removes_login() {
        let (_dir, store) = store();
        let (class, math, _) = setup(&store);
        let login = NewLogin {
            username: "bala".into(),
            password_hash: "h".into(),
        };
        let t = store
            .write(|tx| create_teacher(tx, teacher("Bala"), Some(login), day(2025, 7, 1)))
            .unwrap();
        let a = store.write(|tx| assign(tx, assignment(t.id, math, class))).unwrap();
        assert!(store.write(|tx| delete_teacher(tx, t.id)).is_err());

        store.write(|tx| unassign(tx, a.id)).unwrap();
        store.write(|tx| delete_teacher(tx, t.id)).unwrap();
        assert!(store.read(|r| users::find_by_username(r, "bala")).unwrap().is_none());
    }
}
