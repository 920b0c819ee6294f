//! # User Accounts
//!
//! Login accounts and roles. Password hashing lives in the app layer; the
//! core only stores the encoded hash string it is given.

use crate::error::{CoreError, Result, require};
use crate::storage::{Reader, Tx};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ROLE
// =============================================================================

/// Account role. Exactly one per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Teacher,
    Parent,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Teacher => "TEACHER",
            Self::Parent => "PARENT",
        }
    }

    /// Admins and teachers.
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Teacher)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("ROLE_").unwrap_or(&upper) {
            "ADMIN" => Ok(Self::Admin),
            "TEACHER" => Ok(Self::Teacher),
            "PARENT" => Ok(Self::Parent),
            _ => Err(CoreError::validation(format!("Unknown role: {s}"))),
        }
    }
}

// =============================================================================
// USER
// =============================================================================

/// A login account.
///
/// `entity_id` links a TEACHER account to its teacher record and a PARENT
/// account to its parent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub role: Role,
    pub active: bool,
    pub full_name: Option<String>,
    pub contact: Option<String>,
    pub entity_id: Option<u64>,
}

crate::record!(User, "users", "User");

/// A user as shown to clients: never includes the password hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: u64,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub full_name: Option<String>,
    pub contact: Option<String>,
    pub active: bool,
    pub entity_id: Option<u64>,
    pub entity_type: &'static str,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            role: u.role,
            full_name: u.full_name.clone(),
            contact: u.contact.clone(),
            active: u.active,
            entity_id: u.entity_id,
            entity_type: u.role.as_str(),
        }
    }
}

/// Credentials for an account created alongside a student or teacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogin {
    pub username: String,
    pub password_hash: String,
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub contact: Option<String>,
    pub entity_id: Option<u64>,
}

impl NewUser {
    pub fn new(login: NewLogin, role: Role) -> Self {
        Self {
            username: login.username,
            password_hash: login.password_hash,
            role,
            email: None,
            full_name: None,
            contact: None,
            entity_id: None,
        }
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

pub fn find_by_username(r: &impl Reader, username: &str) -> Result<Option<User>> {
    let username = username.trim();
    r.find::<User>(|u| u.username == username)
}

/// Create an account. Usernames are unique.
pub fn create_user(tx: &mut Tx, new: NewUser) -> Result<User> {
    require(&new.username, "Username")?;
    if find_by_username(tx, &new.username)?.is_some() {
        return Err(CoreError::conflict(format!(
            "Username already exists: {}",
            new.username.trim()
        )));
    }
    tx.insert(User {
        id: 0,
        username: new.username.trim().to_string(),
        password_hash: new.password_hash,
        email: new.email,
        role: new.role,
        active: true,
        full_name: new.full_name,
        contact: new.contact,
        entity_id: new.entity_id,
    })
}

/// Replace the stored hash for an existing account.
pub fn set_password(tx: &mut Tx, username: &str, password_hash: String) -> Result<User> {
    let mut user = find_by_username(tx, username)?
        .ok_or_else(|| CoreError::not_found("User", "username", username))?;
    user.password_hash = password_hash;
    tx.put(&user)?;
    Ok(user)
}

pub fn list_users(r: &impl Reader) -> Result<Vec<UserView>> {
    Ok(r.list::<User>()?.iter().map(UserView::from).collect())
}

// =============================================================================
// TESTS
// =============================================================================
