//! # Homework
//!
//! Assignments set by a teacher for a class (optionally one section).

use crate::academic::{SchoolClass, Section, Subject, ensure_section_in_class};
use crate::error::{CoreError, Result, require};
use crate::form;
use crate::storage::{Reader, Tx};
use crate::teachers::Teacher;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Homework {
    pub id: u64,
    pub teacher_id: u64,
    pub subject_id: u64,
    pub class_id: u64,
    pub section_id: Option<u64>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub priority: Option<String>,
    pub attachment_url: Option<String>,
    pub attachments: Option<String>,
}

crate::record!(Homework, "homework", "Homework");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkInput {
    /// Defaults to the calling teacher.
    #[serde(default)]
    pub teacher_id: Option<u64>,
    pub subject_id: u64,
    pub class_id: u64,
    #[serde(default)]
    pub section_id: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub attachments: Option<String>,
}

/// Homework edit. Subject, class, section and attachments change only when given.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkUpdate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub subject_id: Option<u64>,
    #[serde(default)]
    pub class_id: Option<u64>,
    #[serde(default)]
    pub section_id: Option<u64>,
    #[serde(default)]
    pub attachments: Option<String>,
}

fn check_placement(r: &impl Reader, class_id: u64, section_id: Option<u64>) -> Result<()> {
    match section_id {
        Some(section) => ensure_section_in_class(r, class_id, section),
        None => r.ensure::<SchoolClass>(class_id),
    }
}

pub fn by_class(r: &impl Reader, class_id: u64) -> Result<Vec<Homework>> {
    r.ensure::<SchoolClass>(class_id)?;
    r.filter::<Homework>(|h| h.class_id == class_id)
}

pub fn by_class_section(r: &impl Reader, class_id: u64, section_id: u64) -> Result<Vec<Homework>> {
    r.ensure::<SchoolClass>(class_id)?;
    r.ensure::<Section>(section_id)?;
    r.filter::<Homework>(|h| h.class_id == class_id && h.section_id == Some(section_id))
}

/// Homework due strictly after `today`, soonest first.
pub fn upcoming(r: &impl Reader, today: NaiveDate) -> Result<Vec<Homework>> {
    let mut due = r.filter::<Homework>(|h| h.due_date > today)?;
    due.sort_by_key(|h| (h.due_date, h.id));
    Ok(due)
}

pub fn create(tx: &mut Tx, input: HomeworkInput, caller_teacher: Option<u64>) -> Result<Homework> {
    require(&input.title, "Title")?;
    let teacher_id = input
        .teacher_id
        .or(caller_teacher)
        .ok_or_else(|| CoreError::validation("teacherId is required"))?;
    tx.ensure::<Teacher>(teacher_id)?;
    tx.ensure::<Subject>(input.subject_id)?;
    check_placement(tx, input.class_id, input.section_id)?;
    tx.insert(Homework {
        id: 0,
        teacher_id,
        subject_id: input.subject_id,
        class_id: input.class_id,
        section_id: input.section_id,
        title: input.title.trim().to_string(),
        description: form::clean(input.description),
        due_date: input.due_date,
        priority: form::clean(input.priority),
        attachment_url: form::clean(input.attachment_url),
        attachments: form::clean(input.attachments),
    })
}

pub fn update(tx: &mut Tx, id: u64, input: HomeworkUpdate) -> Result<Homework> {
    let mut hw = tx.fetch::<Homework>(id)?;
    require(&input.title, "Title")?;
    if let Some(subject) = input.subject_id {
        tx.ensure::<Subject>(subject)?;
        hw.subject_id = subject;
    }
    let class_id = input.class_id.unwrap_or(hw.class_id);
    let section_id = input.section_id.or(hw.section_id);
    if input.class_id.is_some() || input.section_id.is_some() {
        check_placement(tx, class_id, section_id)?;
    }
    hw.class_id = class_id;
    hw.section_id = section_id;
    hw.title = input.title.trim().to_string();
    hw.description = form::clean(input.description);
    hw.due_date = input.due_date;
    hw.priority = form::clean(input.priority);
    if let Some(attachments) = form::clean(input.attachments) {
        hw.attachments = Some(attachments);
    }
    tx.put(&hw)?;
    Ok(hw)
}

pub fn delete(tx: &mut Tx, id: u64) -> Result<()> {
    tx.remove::<Homework>(id)?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
