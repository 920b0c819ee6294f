//! Integration tests for SchoolHub CLI commands.
//!
//! Uses tempfile for testing file-based operations.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use schoolhub::auth::verify_password;
use schoolhub::cli::{CliError, cmd_init, cmd_status, cmd_user_add};
use schoolhub_core::users::{Role, find_by_username};
use schoolhub_core::{Store, TABLES};
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("schoolhub.redb")
}

// =============================================================================
// INIT COMMAND TESTS
// =============================================================================

#[test]
fn test_init_creates_database_and_admin() {
    let temp = create_temp_dir();
    let db = db_path(&temp);

    let report = cmd_init(&db, false, "s3cret", false).unwrap();
    assert!(db.exists());
    assert!(report.admin_created);
    assert!(report.sample.is_none());

    let store = Store::open(&db).unwrap();
    let admin = store
        .read(|r| find_by_username(r, "admin"))
        .unwrap()
        .unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert!(verify_password("s3cret", &admin.password_hash));
}

#[test]
fn test_init_fails_if_exists_without_force() {
    let temp = create_temp_dir();
    let db = db_path(&temp);

    cmd_init(&db, false, "admin123", false).unwrap();

    let result = cmd_init(&db, false, "admin123", false);
    assert!(matches!(result, Err(CliError::AlreadyExists(_))));
}

#[test]
fn test_init_with_force_replaces_database() {
    let temp = create_temp_dir();
    let db = db_path(&temp);

    cmd_init(&db, false, "admin123", false).unwrap();
    cmd_user_add(&db, "extra", "pw", "TEACHER", None).unwrap();

    let report = cmd_init(&db, true, "admin123", false).unwrap();
    assert!(report.admin_created);

    let store = Store::open(&db).unwrap();
    assert!(store.read(|r| find_by_username(r, "extra")).unwrap().is_none());
}

#[test]
fn test_init_with_sample_data() {
    let temp = create_temp_dir();
    let db = db_path(&temp);

    let report = cmd_init(&db, false, "admin123", true).unwrap();
    let sample = report.sample.unwrap();
    assert!(!sample.skipped);
    assert_eq!(sample.classes, 10);
    assert_eq!(sample.sections, 30);
    assert_eq!(sample.teachers, 5);
    assert_eq!(sample.students, 5);

    let store = Store::open(&db).unwrap();
    let teacher = store
        .read(|r| find_by_username(r, "john.smith"))
        .unwrap()
        .unwrap();
    assert_eq!(teacher.role, Role::Teacher);
    assert!(verify_password("teacher123", &teacher.password_hash));
}

// =============================================================================
// STATUS COMMAND TESTS
// =============================================================================

#[test]
fn test_status_lists_every_table() {
    let temp = create_temp_dir();
    let db = db_path(&temp);
    cmd_init(&db, false, "admin123", false).unwrap();

    let text = cmd_status(&db, false).unwrap();
    for table in TABLES {
        assert!(text.contains(table), "missing {table}");
    }
}

#[test]
fn test_status_json_counts() {
    let temp = create_temp_dir();
    let db = db_path(&temp);
    cmd_init(&db, false, "admin123", false).unwrap();

    let out = cmd_status(&db, true).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["tables"]["users"], 1);
    assert_eq!(parsed["tables"]["students"], 0);
}

#[test]
fn test_status_missing_database() {
    let temp = create_temp_dir();
    let result = cmd_status(&db_path(&temp), false);
    assert!(matches!(result, Err(CliError::Missing(_))));
}

// =============================================================================
// USER COMMAND TESTS
// =============================================================================

#[test]
fn test_user_add_creates_account() {
    let temp = create_temp_dir();
    let db = db_path(&temp);
    cmd_init(&db, false, "admin123", false).unwrap();

    let view = cmd_user_add(&db, "office", "pw123", "role_admin", Some("Front Office".into())).unwrap();
    assert_eq!(view.username, "office");
    assert_eq!(view.role, Role::Admin);
    assert_eq!(view.full_name.as_deref(), Some("Front Office"));
}

#[test]
fn test_user_add_rejects_duplicates_and_bad_roles() {
    let temp = create_temp_dir();
    let db = db_path(&temp);
    cmd_init(&db, false, "admin123", false).unwrap();

    assert!(cmd_user_add(&db, "admin", "pw", "ADMIN", None).is_err());
    assert!(cmd_user_add(&db, "someone", "pw", "JANITOR", None).is_err());
    assert!(cmd_user_add(&db, "someone", "  ", "PARENT", None).is_err());
}
