//! # School Profile
//!
//! The single school profile row. Its name signs outgoing SMS messages.

use crate::error::{Result, require};
use crate::form;
use crate::storage::{Reader, Tx};
use serde::{Deserialize, Serialize};

/// The profile always lives under this id.
pub const PROFILE_ID: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolProfile {
    pub id: u64,
    pub name: String,
    pub logo: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub code: Option<String>,
    pub affiliation: Option<String>,
    pub principal_name: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
}

crate::record!(SchoolProfile, "school_profile", "SchoolProfile");

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileInput {
    pub name: String,
    pub logo: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub code: Option<String>,
    pub affiliation: Option<String>,
    pub principal_name: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
}

pub fn profile(r: &impl Reader) -> Result<Option<SchoolProfile>> {
    r.get::<SchoolProfile>(PROFILE_ID)
}

/// Create or replace the profile.
pub fn save_profile(tx: &mut Tx, input: ProfileInput) -> Result<SchoolProfile> {
    require(&input.name, "School name")?;
    let profile = SchoolProfile {
        id: PROFILE_ID,
        name: input.name.trim().to_string(),
        logo: form::clean(input.logo),
        address: form::clean(input.address),
        contact: form::clean(input.contact),
        email: form::clean(input.email),
        code: form::clean(input.code),
        affiliation: form::clean(input.affiliation),
        principal_name: form::clean(input.principal_name),
        website: form::clean(input.website),
        description: form::clean(input.description),
    };
    tx.put(&profile)?;
    Ok(profile)
}

/// Name used to sign messages: the stored profile name, else `fallback`.
pub fn school_name(r: &impl Reader, fallback: &str) -> Result<String> {
    Ok(profile(r)?
        .map(|p| p.name)
        .unwrap_or_else(|| fallback.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::store;

    #[test]
    fn profile_name_overrides_fallback() {
        let (_dir, store) = store();
        assert_eq!(store.read(|r| school_name(r, "School")).unwrap(), "School");

        store
            .write(|tx| {
                save_profile(
                    tx,
                    ProfileInput {
                        name: " Green Valley Public School ".into(),
                        website: Some("  ".into()),
                        ..ProfileInput::default()
                    },
                )
            })
            .unwrap();
        let saved = store.read(|r| profile(r)).unwrap().unwrap();
        assert_eq!(saved.website, None);
        assert_eq!(
            store.read(|r| school_name(r, "School")).unwrap(),
            "Green Valley Public School"
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        let (_dir, store) = store();
        assert!(store.write(|tx| save_profile(tx, ProfileInput::default())).is_err());
    }
}
