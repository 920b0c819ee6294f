//! # Form Helpers
//!
//! Serde helpers for request bodies posted by browser forms, where an
//! unset date arrives as `""` instead of `null`.
//!
//! Only used on input structs. Stored records never go through these.

use crate::error::{CoreError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// `Option<NaiveDate>` that treats `null`, `""` and whitespace as absent.
pub fn optional_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Parse an optional `YYYY-MM-DD` query parameter, treating blank as absent.
pub fn date_param(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| CoreError::validation(format!("Invalid date: {s}"))),
    }
}

/// Trim a string and drop it when blank.
pub fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// First non-blank value among candidates.
pub fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
}

// =============================================================================
// TESTS
// =============================================================================
