//! # Notices
//!
//! School notices. Only published notices are offered to parents and used
//! for SMS alerts.

use crate::error::{CoreError, Result, require};
use crate::form::{self, optional_date};
use crate::storage::{Reader, Tx};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub notice_type: Option<String>,
    pub target_audience: Option<String>,
    pub target_class_id: Option<u64>,
    pub target_section_id: Option<u64>,
    pub publish_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub priority: Option<String>,
    pub attachment_url: Option<String>,
    pub created_by: Option<String>,
    pub published: bool,
    pub send_sms: bool,
    pub send_email: bool,
}

crate::record!(Notice, "notices", "Notice");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub notice_type: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub target_class_id: Option<u64>,
    #[serde(default)]
    pub target_section_id: Option<u64>,
    #[serde(default, deserialize_with = "optional_date")]
    pub publish_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_date")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    /// Defaults to the caller.
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub send_sms: bool,
    #[serde(default)]
    pub send_email: bool,
}

impl NoticeInput {
    fn validate(&self) -> Result<()> {
        require(&self.title, "Title")?;
        require(&self.content, "Content")?;
        if let (Some(publish), Some(expiry)) = (self.publish_date, self.expiry_date)
            && expiry < publish
        {
            return Err(CoreError::validation(
                "Expiry date must not be before publish date",
            ));
        }
        Ok(())
    }

    fn into_notice(self, id: u64, created_by: Option<String>) -> Notice {
        Notice {
            id,
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            notice_type: form::clean(self.notice_type),
            target_audience: form::clean(self.target_audience),
            target_class_id: self.target_class_id,
            target_section_id: self.target_section_id,
            publish_date: self.publish_date,
            expiry_date: self.expiry_date,
            priority: form::clean(self.priority),
            attachment_url: form::clean(self.attachment_url),
            created_by,
            published: self.published,
            send_sms: self.send_sms,
            send_email: self.send_email,
        }
    }
}

pub fn published(r: &impl Reader) -> Result<Vec<Notice>> {
    r.filter::<Notice>(|n| n.published)
}

pub fn create(tx: &mut Tx, input: NoticeInput, actor: &str) -> Result<Notice> {
    input.validate()?;
    let created_by = form::clean(input.created_by.clone()).or_else(|| Some(actor.to_string()));
    tx.insert(input.into_notice(0, created_by))
}

/// Replace a notice's content. The original author is kept unless another is given.
pub fn update(tx: &mut Tx, id: u64, input: NoticeInput) -> Result<Notice> {
    let existing = tx.fetch::<Notice>(id)?;
    input.validate()?;
    let created_by = form::clean(input.created_by.clone()).or(existing.created_by);
    let notice = input.into_notice(id, created_by);
    tx.put(&notice)?;
    Ok(notice)
}

pub fn delete(tx: &mut Tx, id: u64) -> Result<()> {
    tx.remove::<Notice>(id)?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
