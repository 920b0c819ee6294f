//! # Seeding
//!
//! The default administrator and an optional demonstration dataset.
//!
//! Passwords arrive already hashed; this crate never sees plaintext.

use crate::academic::{
    AcademicYear, AcademicYearInput, ClassInput, SectionInput, SubjectInput, create_class,
    create_section, create_subject, create_year,
};
use crate::error::Result;
use crate::exams::{ExaminationInput, create_exam};
use crate::fees::{FeeStructureInput, create_structure};
use crate::money::Money;
use crate::notices::{NoticeInput, create as create_notice};
use crate::storage::{Reader, Tx};
use crate::students::{NewStudent, create_student};
use crate::teachers::{TeacherInput, create_teacher};
use crate::users::{self, NewLogin, NewUser, Role, User};
use chrono::{Days, Months, NaiveDate};
use serde::Serialize;

pub const ADMIN_USERNAME: &str = "admin";

/// Create the `admin` account unless it already exists. Returns whether it was created.
pub fn ensure_admin(tx: &mut Tx, password_hash: String) -> Result<bool> {
    if users::find_by_username(tx, ADMIN_USERNAME)?.is_some() {
        return Ok(false);
    }
    let mut admin = NewUser::new(
        NewLogin {
            username: ADMIN_USERNAME.to_string(),
            password_hash,
        },
        Role::Admin,
    );
    admin.email = Some("admin@school.com".to_string());
    admin.full_name = Some("System Administrator".to_string());
    admin.contact = Some("1234567890".to_string());
    users::create_user(tx, admin)?;
    Ok(true)
}

/// Hashed passwords shared by every sample login of a role.
#[derive(Debug, Clone)]
pub struct SampleLogins {
    pub teacher_hash: String,
    pub parent_hash: String,
}

/// What [`sample_data`] created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub skipped: bool,
    pub academic_years: usize,
    pub classes: usize,
    pub sections: usize,
    pub subjects: usize,
    pub teachers: usize,
    pub students: usize,
    pub notices: usize,
    pub fee_structures: usize,
    pub examinations: usize,
}

const SUBJECTS: [(&str, &str, &str); 8] = [
    ("Mathematics", "MATH", "Core mathematics curriculum"),
    ("English", "ENG", "English language and literature"),
    ("Science", "SCI", "General science"),
    ("Social Studies", "SOC", "History, geography, and civics"),
    ("Hindi", "HIN", "Hindi language"),
    ("Computer Science", "CS", "Basic computer education"),
    ("Physical Education", "PE", "Sports and physical activities"),
    ("Art", "ART", "Drawing and painting"),
];

const TEACHERS: [(&str, &str, &str, &str, &str); 5] = [
    ("John", "Smith", "john.smith", "9876543210", "Mathematics"),
    ("Emily", "Johnson", "emily.johnson", "9876543211", "English"),
    ("Robert", "Brown", "robert.brown", "9876543212", "Science"),
    ("Sarah", "Davis", "sarah.davis", "9876543213", "Social Studies"),
    ("Michael", "Wilson", "michael.wilson", "9876543214", "Hindi"),
];

/// (student first, last, gender, father first, father last)
const STUDENTS: [(&str, &str, &str, &str, &str); 5] = [
    ("Rahul", "Kumar", "Male", "Rajesh", "Kumar"),
    ("Priya", "Sharma", "Female", "Suresh", "Sharma"),
    ("Amit", "Singh", "Male", "Vijay", "Singh"),
    ("Neha", "Gupta", "Female", "Rakesh", "Gupta"),
    ("Vikram", "Patel", "Male", "Mukesh", "Patel"),
];

const NOTICES: [(&str, &str, &str); 5] = [
    (
        "Annual Day Celebration",
        "All students are invited to the Annual Day celebration on March 15th. Parents are welcome.",
        "EVENT",
    ),
    (
        "Summer Vacation Notice",
        "Summer vacation will commence from May 1st to June 15th. School will reopen on June 16th.",
        "ANNOUNCEMENT",
    ),
    (
        "Parent-Teacher Meeting",
        "PTM scheduled for Saturday. Please confirm your attendance.",
        "MEETING",
    ),
    (
        "Sports Day",
        "Annual Sports Day will be held on April 20th. All students must participate.",
        "EVENT",
    ),
    (
        "Fee Payment Reminder",
        "Last date for fee payment is March 31st. Please clear all dues.",
        "REMINDER",
    ),
];

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn plus_days(today: NaiveDate, days: u64) -> NaiveDate {
    today.checked_add_days(Days::new(days)).unwrap_or(today)
}

/// Populate an empty school with demonstration records.
///
/// Skipped when any academic year already exists. Sample logins are created
/// for every teacher (username from the e-mail) and every parent.
pub fn sample_data(tx: &mut Tx, logins: &SampleLogins, today: NaiveDate) -> Result<SeedReport> {
    if !tx.list::<AcademicYear>()?.is_empty() {
        return Ok(SeedReport {
            skipped: true,
            ..SeedReport::default()
        });
    }
    let mut report = SeedReport::default();

    let current = create_year(
        tx,
        AcademicYearInput {
            name: "2025-2026".into(),
            start_date: date(2025, 4, 1),
            end_date: date(2026, 3, 31),
            is_active: true,
            description: None,
        },
    )?;
    create_year(
        tx,
        AcademicYearInput {
            name: "2024-2025".into(),
            start_date: date(2024, 4, 1),
            end_date: date(2025, 3, 31),
            is_active: false,
            description: None,
        },
    )?;
    report.academic_years = 2;

    let mut classes = Vec::new();
    for grade in 1..=10u32 {
        let class = create_class(
            tx,
            ClassInput {
                name: format!("Class {grade}"),
                code: Some(format!("CLASS_{grade}")),
                grade: Some(grade),
                capacity: Some(120),
                description: Some(format!("Grade {grade} students")),
            },
        )?;
        let mut sections = Vec::new();
        for name in ["A", "B", "C"] {
            sections.push(create_section(
                tx,
                SectionInput {
                    name: name.into(),
                    class_id: class.id,
                    capacity: Some(40),
                    class_teacher_id: None,
                    description: None,
                },
            )?);
            report.sections += 1;
        }
        classes.push((class, sections));
    }
    report.classes = classes.len();

    for (name, code, description) in SUBJECTS {
        create_subject(
            tx,
            SubjectInput {
                name: name.into(),
                code: code.into(),
                subject_type: None,
                max_marks: Some(100),
                theory_max_marks: Some(80),
                practical_max_marks: Some(20),
                pass_marks: Some(35),
                description: Some(description.into()),
            },
        )?;
        report.subjects += 1;
    }

    let joined = today.checked_sub_months(Months::new(24)).unwrap_or(today);
    for (first, last, handle, phone, specialization) in TEACHERS {
        create_teacher(
            tx,
            TeacherInput {
                first_name: first.into(),
                last_name: last.into(),
                gender: Some("Male".into()),
                phone: Some(phone.into()),
                email: Some(format!("{handle}@school.com")),
                qualification: Some("M.Ed, B.Ed".into()),
                specialization: Some(specialization.into()),
                address: Some("123 Teacher Street".into()),
                joining_date: Some(joined),
                ..TeacherInput::default()
            },
            Some(NewLogin {
                username: handle.into(),
                password_hash: logins.teacher_hash.clone(),
            }),
            today,
        )?;
        report.teachers += 1;
    }

    let admitted = today.checked_sub_months(Months::new(6)).unwrap_or(today);
    if let Some((class1, sections)) = classes.first() {
        let section_a = sections.first().map(|s| s.id);
        for (n, (first, last, gender, father_first, father_last)) in STUDENTS.into_iter().enumerate() {
            let suffix = n + 1;
            let handle = format!("{}.{}", father_first.to_lowercase(), father_last.to_lowercase());
            create_student(
                tx,
                NewStudent {
                    first_name: first.into(),
                    last_name: last.into(),
                    gender: Some(gender.into()),
                    date_of_birth: Some(date(2015, 5, 15)),
                    blood_group: Some("O+".into()),
                    address: Some("123 Student Lane, City".into()),
                    phone: Some(format!("98765431{suffix:02}")),
                    email: Some(format!(
                        "{}.{}@student.school.com",
                        first.to_lowercase(),
                        last.to_lowercase()
                    )),
                    admission_date: Some(admitted),
                    class_id: Some(class1.id),
                    section_id: section_a,
                    academic_year_id: Some(current.id),
                    parent_full_name: Some(format!("{father_first} {father_last}")),
                    parent_email: Some(format!("{handle}@email.com")),
                    father_name: Some(format!("{father_first} {father_last}")),
                    father_phone: Some(format!("98765432{suffix:02}")),
                    father_email: Some(format!("{handle}@email.com")),
                    father_occupation: Some("Business".into()),
                    mother_name: Some(format!("Mrs. {father_last}")),
                    mother_phone: Some(format!("98765433{suffix:02}")),
                    address2: Some("123 Parent Street, City".into()),
                    ..NewStudent::default()
                },
                Some(NewLogin {
                    username: handle,
                    password_hash: logins.parent_hash.clone(),
                }),
                today,
            )?;
            report.students += 1;
        }
    }

    for (title, content, kind) in NOTICES {
        create_notice(
            tx,
            NoticeInput {
                title: title.into(),
                content: content.into(),
                notice_type: Some(kind.into()),
                target_audience: Some("ALL".into()),
                target_class_id: None,
                target_section_id: None,
                publish_date: Some(today),
                expiry_date: Some(plus_days(today, 30)),
                priority: Some("NORMAL".into()),
                attachment_url: None,
                created_by: None,
                published: true,
                send_sms: false,
                send_email: false,
            },
            ADMIN_USERNAME,
        )?;
        report.notices += 1;
    }

    for (class, _) in classes.iter().take(5) {
        create_structure(
            tx,
            FeeStructureInput {
                class_id: class.id,
                academic_year_id: Some(current.id),
                tuition_fee: Some(Money::from_rupees(15_000)),
                admission_fee: Some(Money::from_rupees(5_000)),
                exam_fee: Some(Money::from_rupees(2_000)),
                transport_fee: Some(Money::from_rupees(3_000)),
                library_fee: Some(Money::from_rupees(1_000)),
                lab_fee: Some(Money::from_rupees(1_500)),
                sports_fee: Some(Money::from_rupees(1_000)),
                other_fee: None,
                total_fee: Some(Money::from_rupees(28_500)),
                installment_type: None,
                description: None,
            },
        )?;
        report.fee_structures += 1;
    }

    for (name, kind, start, end, description) in [
        ("Mid-Term Examination 2025", "MID_TERM", 30, 45, "Mid-term examination for all classes"),
        ("Final Examination 2026", "FINAL", 90, 105, "Final examination for all classes"),
    ] {
        create_exam(
            tx,
            ExaminationInput {
                name: name.into(),
                exam_type: Some(kind.into()),
                academic_year_id: Some(current.id),
                start_date: Some(plus_days(today, start)),
                end_date: Some(plus_days(today, end)),
                description: Some(description.into()),
                published: false,
            },
        )?;
        report.examinations += 1;
    }

    Ok(report)
}

/// Whether any account exists yet.
pub fn has_users(r: &impl Reader) -> Result<bool> {
    Ok(!r.list::<User>()?.is_empty())
}
