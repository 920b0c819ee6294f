//! Integration tests for the HTTP API.
//!
//! Each test runs the full router against a fresh on-disk database through
//! axum-test. SMS runs in demo mode, so nothing leaves the process.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum_test::TestServer;
use schoolhub::api::{AppConfig, AppState, router};
use schoolhub::auth::{TokenKeys, hash_password};
use schoolhub::sms::{DEFAULT_BASE_URL, SmsGateway};
use schoolhub_core::Store;
use schoolhub_core::seed::ensure_admin;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct Harness {
    _dir: TempDir,
    server: TestServer,
}

/// Fresh database with the default admin, plus the state serving it.
fn state_with_rate(login_rate_per_minute: u32) -> (TempDir, AppState) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Store::open(dir.path().join("api.redb")).unwrap();
    let hash = hash_password("admin123").unwrap();
    store.write(|tx| ensure_admin(tx, hash)).unwrap();

    let state = AppState::new(
        store,
        AppConfig {
            keys: TokenKeys::new(b"test-secret".to_vec(), 1),
            sms: SmsGateway::new(None, DEFAULT_BASE_URL),
            school_name: "Test School".into(),
            login_rate_per_minute,
        },
    );
    (dir, state)
}

fn harness_with_rate(login_rate_per_minute: u32) -> Harness {
    let (dir, state) = state_with_rate(login_rate_per_minute);
    Harness {
        _dir: dir,
        server: TestServer::new(router(state)).unwrap(),
    }
}

fn harness() -> Harness {
    harness_with_rate(1000)
}

async fn login(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({"username": username, "password": password}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

async fn admin_token(server: &TestServer) -> String {
    login(server, "admin", "admin123").await
}

/// POST as `token` and return the JSON body, asserting 200.
async fn post_ok(server: &TestServer, token: &str, path: &str, body: Value) -> Value {
    let response = server
        .post(path)
        .authorization_bearer(token)
        .json(&body)
        .await;
    response.assert_status_ok();
    response.json()
}

async fn get_ok(server: &TestServer, token: &str, path: &str) -> Value {
    let response = server.get(path).authorization_bearer(token).await;
    response.assert_status_ok();
    response.json()
}

/// Active year, class "1" with section "A". Returns (year, class, section) ids.
async fn academic_setup(server: &TestServer, token: &str) -> (u64, u64, u64) {
    let year = post_ok(
        server,
        token,
        "/api/academic/years",
        json!({"name": "2025-2026", "startDate": "2025-04-01", "endDate": "2026-03-31", "isActive": true}),
    )
    .await;
    let class = post_ok(server, token, "/api/academic/classes", json!({"name": "Class 1", "code": "C1"})).await;
    let class_id = class["id"].as_u64().unwrap();
    let section = post_ok(
        server,
        token,
        "/api/academic/sections",
        json!({"name": "A", "classId": class_id}),
    )
    .await;
    (
        year["id"].as_u64().unwrap(),
        class_id,
        section["id"].as_u64().unwrap(),
    )
}

async fn enrol(server: &TestServer, token: &str, body: Value) -> Value {
    post_ok(server, token, "/api/students", body).await
}

// =============================================================================
// HEALTH & AUTH
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let h = harness();
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_router_rejects_anonymous_api_calls() {
    let (_dir, state) = state_with_rate(10);
    let request = Request::builder()
        .uri("/api/notices")
        .body(Body::empty())
        .unwrap();
    let response = router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_returns_token_and_profile() {
    let h = harness();
    let response = h
        .server
        .post("/api/auth/login")
        .json(&json!({"username": "admin", "password": "admin123"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "ADMIN");
    assert_eq!(body["email"], "admin@school.com");
    assert_eq!(body["fullName"], "System Administrator");
    assert!(body["token"].as_str().unwrap().split('.').count() == 3);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let h = harness();
    for (username, password) in [("admin", "wrong"), ("nobody", "admin123")] {
        let response = h
            .server
            .post("/api/auth/login")
            .json(&json!({"username": username, "password": password}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["message"], "Invalid username or password");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let h = harness_with_rate(1);
    let body = json!({"username": "admin", "password": "wrong"});
    h.server.post("/api/auth/login").json(&body).await;
    let response = h.server.post("/api/auth/login").json(&body).await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    // Same account in another case shares the budget.
    let upper = json!({"username": "ADMIN", "password": "wrong"});
    h.server
        .post("/api/auth/login")
        .json(&upper)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    // Other accounts are unaffected.
    let other = json!({"username": "office", "password": "wrong"});
    h.server
        .post("/api/auth/login")
        .json(&other)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_required() {
    let h = harness();
    h.server
        .get("/api/students")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .get("/api/students")
        .authorization_bearer("not.a.token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_endpoints() {
    let h = harness();
    let token = admin_token(&h.server).await;

    let check = get_ok(&h.server, &token, "/api/auth/check").await;
    assert_eq!(check["message"], "Authentication working");

    let me = get_ok(&h.server, &token, "/api/auth/me").await;
    assert_eq!(me["username"], "admin");
    assert!(me.get("passwordHash").is_none());

    let logout = post_ok(&h.server, &token, "/api/auth/logout", json!({})).await;
    assert_eq!(logout["message"], "Logout successful");
    assert_eq!(logout["success"], true);
}

// =============================================================================
// ACADEMIC
// =============================================================================

#[tokio::test]
async fn test_only_one_active_year() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let (first, _, _) = academic_setup(&h.server, &token).await;

    let second = post_ok(
        &h.server,
        &token,
        "/api/academic/years",
        json!({"name": "2026-2027", "startDate": "2026-04-01", "endDate": "2027-03-31", "isActive": true}),
    )
    .await;

    let active = get_ok(&h.server, &token, "/api/academic/years/active").await;
    assert_eq!(active["id"], second["id"]);
    let old = get_ok(&h.server, &token, &format!("/api/academic/years/{first}")).await;
    assert_eq!(old["isActive"], false);
}

#[tokio::test]
async fn test_year_dates_validated() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let response = h
        .server
        .post("/api/academic/years")
        .authorization_bearer(&token)
        .json(&json!({"name": "Bad", "startDate": "2025-04-01", "endDate": "2025-03-01"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_record_is_404() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let response = h
        .server
        .get("/api/academic/classes/999")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_class_in_use_cannot_be_deleted() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let (_, class_id, _) = academic_setup(&h.server, &token).await;
    h.server
        .delete(&format!("/api/academic/classes/{class_id}"))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::CONFLICT);
}

// =============================================================================
// STUDENTS & PARENTS
// =============================================================================

#[tokio::test]
async fn test_enrolment_creates_parent_login_and_scopes_access() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let (_, class_id, section_id) = academic_setup(&h.server, &token).await;

    let own = enrol(
        &h.server,
        &token,
        json!({
            "firstName": "Aarav", "lastName": "Kumar",
            "classId": class_id, "sectionId": section_id,
            "fatherName": "Rajesh Kumar", "fatherPhone": "9876543210",
            "parentUsername": "rajesh", "parentPassword": "parent123"
        }),
    )
    .await;
    assert!(own["admissionNo"].as_str().unwrap().starts_with("STU"));
    let other = enrol(
        &h.server,
        &token,
        json!({"firstName": "Diya", "lastName": "Shah", "classId": class_id}),
    )
    .await;

    let parent = login(&h.server, "rajesh", "parent123").await;
    let own_id = own["id"].as_u64().unwrap();
    let other_id = other["id"].as_u64().unwrap();

    let seen = get_ok(&h.server, &parent, &format!("/api/students/{own_id}")).await;
    assert_eq!(seen["firstName"], "Aarav");
    let parent_record = get_ok(&h.server, &parent, &format!("/api/students/{own_id}/parent")).await;
    assert_eq!(parent_record["fatherPhone"], "9876543210");

    h.server
        .get(&format!("/api/students/{other_id}"))
        .authorization_bearer(&parent)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    h.server
        .get("/api/students")
        .authorization_bearer(&parent)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_student_search() {
    let h = harness();
    let token = admin_token(&h.server).await;
    enrol(&h.server, &token, json!({"firstName": "Aarav", "lastName": "Kumar"})).await;
    enrol(&h.server, &token, json!({"firstName": "Diya", "lastName": "Shah"})).await;

    let response = h
        .server
        .get("/api/students/search")
        .add_query_param("query", "kum")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let found: Vec<Value> = response.json();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["lastName"], "Kumar");
}

// =============================================================================
// ATTENDANCE
// =============================================================================

#[tokio::test]
async fn test_attendance_upsert_and_leave_guard() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let (_, class_id, section_id) = academic_setup(&h.server, &token).await;
    let student = enrol(
        &h.server,
        &token,
        json!({"firstName": "Aarav", "lastName": "Kumar", "classId": class_id, "sectionId": section_id}),
    )
    .await;
    let sid = student["id"].as_u64().unwrap();

    post_ok(
        &h.server,
        &token,
        "/api/attendance/mark",
        json!([{"studentId": sid, "date": "2025-07-01", "status": "PRESENT"}]),
    )
    .await;
    let marked = post_ok(
        &h.server,
        &token,
        "/api/attendance/mark",
        json!([{"studentId": sid, "date": "2025-07-01", "status": "ABSENT"}]),
    )
    .await;
    assert_eq!(marked[0]["classId"], class_id);
    assert_eq!(marked[0]["markedBy"], "admin");

    let day = get_ok(
        &h.server,
        &token,
        &format!("/api/attendance/class/{class_id}/section/{section_id}/date/2025-07-01"),
    )
    .await;
    assert_eq!(day.as_array().unwrap().len(), 1);
    assert_eq!(day[0]["status"], "ABSENT");

    let leave = post_ok(
        &h.server,
        &token,
        "/api/attendance/leaves",
        json!({"studentId": sid, "fromDate": "2025-07-10", "toDate": "2025-07-12", "reason": "Fever"}),
    )
    .await;
    assert_eq!(leave["status"], "PENDING");
    let id = leave["id"].as_u64().unwrap();

    let approved = h
        .server
        .put(&format!("/api/attendance/leaves/{id}/approve"))
        .authorization_bearer(&token)
        .await;
    approved.assert_status_ok();
    let again = h
        .server
        .put(&format!("/api/attendance/leaves/{id}/reject"))
        .authorization_bearer(&token)
        .json(&json!({"reason": "late"}))
        .await;
    again.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_attendance_bad_date_is_400() {
    let h = harness();
    let token = admin_token(&h.server).await;
    h.server
        .get("/api/attendance/date/yesterday")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// FEES
// =============================================================================

#[tokio::test]
async fn test_fee_status_and_receipt() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let (_, class_id, _) = academic_setup(&h.server, &token).await;
    let student = enrol(
        &h.server,
        &token,
        json!({"firstName": "Aarav", "lastName": "Kumar", "classId": class_id}),
    )
    .await;
    let sid = student["id"].as_u64().unwrap();

    let structure = post_ok(
        &h.server,
        &token,
        "/api/fees/structures",
        json!({"classId": class_id, "tuitionFee": 5000, "examFee": "500.50"}),
    )
    .await;
    assert_eq!(structure["totalFee"], "5500.50");

    let paid = post_ok(
        &h.server,
        &token,
        "/api/fees/payments",
        json!({"studentId": sid, "amount": 2000, "paymentMode": "CASH"}),
    )
    .await;
    let receipt_no = paid["receipt"]["receiptNo"].as_str().unwrap().to_string();
    assert!(receipt_no.starts_with("REC"));

    let status = get_ok(&h.server, &token, &format!("/api/fees/status/student/{sid}")).await;
    assert_eq!(status["totalFee"], "5500.50");
    assert_eq!(status["paidAmount"], "2000.00");
    assert_eq!(status["pendingAmount"], "3500.50");

    let found = get_ok(&h.server, &token, &format!("/api/fees/receipts/{receipt_no}")).await;
    assert_eq!(found["payment"]["studentId"], sid);
}

#[tokio::test]
async fn test_teacher_cannot_record_payment() {
    let h = harness();
    let token = admin_token(&h.server).await;
    post_ok(
        &h.server,
        &token,
        "/api/teachers",
        json!({
            "firstName": "Meera", "lastName": "Iyer",
            "loginUsername": "meera", "loginPassword": "teacher123"
        }),
    )
    .await;
    let teacher = login(&h.server, "meera", "teacher123").await;
    h.server
        .post("/api/fees/payments")
        .authorization_bearer(&teacher)
        .json(&json!({"studentId": 1, "amount": 100}))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

// =============================================================================
// SMS
// =============================================================================

#[tokio::test]
async fn test_sms_send_in_demo_mode_logs_each_number() {
    let h = harness();
    let token = admin_token(&h.server).await;

    let summary = post_ok(
        &h.server,
        &token,
        "/api/sms/send",
        json!({"numbers": ["+91 98765-43210", "9876543210", "12345", "9123456789"], "message": "School closed tomorrow"}),
    )
    .await;
    assert_eq!(summary["success"], true);
    assert_eq!(summary["demoMode"], true);
    assert_eq!(summary["sentCount"], 2);
    assert_eq!(summary["totalNumbers"], 2);

    let logs = get_ok(&h.server, &token, "/api/sms/logs").await;
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l["status"] == "SENT" && l["sentBy"] == "admin"));
}

#[tokio::test]
async fn test_sms_send_validation() {
    let h = harness();
    let token = admin_token(&h.server).await;

    h.server
        .post("/api/sms/send")
        .authorization_bearer(&token)
        .json(&json!({"numbers": ["9876543210"], "message": "  "}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let none = post_ok(
        &h.server,
        &token,
        "/api/sms/send",
        json!({"numbers": [], "message": "Hi"}),
    )
    .await;
    assert_eq!(none["success"], false);
    assert_eq!(none["error"], "No phone numbers provided");

    let invalid = post_ok(
        &h.server,
        &token,
        "/api/sms/send",
        json!({"numbers": ["123"], "message": "Hi"}),
    )
    .await;
    assert_eq!(invalid["error"], "No valid 10-digit phone numbers");

    let blanks = post_ok(
        &h.server,
        &token,
        "/api/sms/send",
        json!({"numbers": ["", "  "], "message": "Hi"}),
    )
    .await;
    assert_eq!(blanks["error"], "No valid 10-digit phone numbers");

    let null = post_ok(
        &h.server,
        &token,
        "/api/sms/send",
        json!({"numbers": null, "message": "Hi"}),
    )
    .await;
    assert_eq!(null["error"], "No phone numbers provided");

    let missing = post_ok(&h.server, &token, "/api/sms/send", json!({"message": "Hi"})).await;
    assert_eq!(missing["error"], "No phone numbers provided");
}

#[tokio::test]
async fn test_absent_alert_and_preview() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let (_, class_id, section_id) = academic_setup(&h.server, &token).await;
    let student = enrol(
        &h.server,
        &token,
        json!({
            "firstName": "Aarav", "lastName": "Kumar",
            "classId": class_id, "sectionId": section_id,
            "fatherName": "Rajesh Kumar", "fatherPhone": "9876543210"
        }),
    )
    .await;
    let sid = student["id"].as_u64().unwrap();
    post_ok(
        &h.server,
        &token,
        "/api/attendance/mark",
        json!([{"studentId": sid, "date": "2025-07-01", "status": "ABSENT"}]),
    )
    .await;

    let response = h
        .server
        .get("/api/sms/preview/absent")
        .add_query_param("date", "2025-07-01")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let preview: Vec<Value> = response.json();
    assert_eq!(preview.len(), 1);
    assert_eq!(preview[0]["parentName"], "Rajesh Kumar");
    assert_eq!(preview[0]["hasPhone"], true);

    let alert = post_ok(
        &h.server,
        &token,
        "/api/sms/absent-alert",
        json!({"date": "2025-07-01"}),
    )
    .await;
    assert_eq!(alert["sentCount"], 1);
    assert_eq!(alert["absentCount"], 1);
    assert_eq!(alert["date"], "01-07-2025");

    let response = h
        .server
        .get("/api/sms/logs")
        .add_query_param("messageType", "ATTENDANCE_ALERT")
        .authorization_bearer(&token)
        .await;
    let logs: Vec<Value> = response.json();
    assert_eq!(logs.len(), 1);
    assert_eq!(
        logs[0]["message"],
        "Dear Parent, Aarav Kumar was marked ABSENT on 01-07-2025. Please ensure regular attendance. - Test School"
    );
    assert_eq!(logs[0]["recipientName"], "Rajesh Kumar");

    let quiet = post_ok(
        &h.server,
        &token,
        "/api/sms/absent-alert",
        json!({"date": "2025-07-02"}),
    )
    .await;
    assert_eq!(quiet["sentCount"], 0);
    assert_eq!(quiet["message"], "No absent students found for 02-07-2025");
}

#[tokio::test]
async fn test_sms_status_uses_profile_name() {
    let h = harness();
    let token = admin_token(&h.server).await;

    let status = get_ok(&h.server, &token, "/api/sms/status").await;
    assert_eq!(status["configured"], false);
    assert_eq!(status["schoolName"], "Test School");

    h.server
        .put("/api/school/profile")
        .authorization_bearer(&token)
        .json(&json!({"name": "Green Valley School"}))
        .await
        .assert_status_ok();
    let status = get_ok(&h.server, &token, "/api/sms/status").await;
    assert_eq!(status["schoolName"], "Green Valley School");
}

/// Two students in class 1: one in section A with a father's phone, one
/// without any phone. Returns (class, section, reachable student) ids.
async fn sms_class(server: &TestServer, token: &str) -> (u64, u64, u64) {
    let (_, class_id, section_id) = academic_setup(server, token).await;
    let reachable = enrol(
        server,
        token,
        json!({
            "firstName": "Aarav", "lastName": "Kumar",
            "classId": class_id, "sectionId": section_id,
            "fatherName": "Rajesh Kumar", "fatherPhone": "+91 98765 43210"
        }),
    )
    .await;
    enrol(
        server,
        token,
        json!({"firstName": "Diya", "lastName": "Shah", "classId": class_id}),
    )
    .await;
    (class_id, section_id, reachable["id"].as_u64().unwrap())
}

#[tokio::test]
async fn test_send_to_class_reaches_parents_with_phones() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let (class_id, section_id, _) = sms_class(&h.server, &token).await;

    let summary = post_ok(
        &h.server,
        &token,
        "/api/sms/send-to-class",
        json!({"classId": class_id, "sectionId": section_id, "message": "PTM on Saturday"}),
    )
    .await;
    assert_eq!(summary["success"], true);
    assert_eq!(summary["sentCount"], 1);

    let logs = get_ok(&h.server, &token, "/api/sms/logs").await;
    assert_eq!(logs[0]["phoneNumber"], "9876543210");
    assert_eq!(logs[0]["recipientName"], "Rajesh Kumar");
    assert_eq!(logs[0]["messageType"], "CUSTOM");

    h.server
        .post("/api/sms/send-to-class")
        .authorization_bearer(&token)
        .json(&json!({"classId": 999, "message": "Hi"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .post("/api/sms/send-to-class")
        .authorization_bearer(&token)
        .json(&json!({"classId": class_id}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_notice_alert_with_and_without_body() {
    let h = harness();
    let token = admin_token(&h.server).await;
    sms_class(&h.server, &token).await;
    let notice = post_ok(
        &h.server,
        &token,
        "/api/notices",
        json!({"title": "Sports Day", "content": "Sports day is on Friday.", "published": true}),
    )
    .await;
    let path = format!("/api/sms/notice/{}", notice["id"]);

    let response = h.server.post(&path).authorization_bearer(&token).await;
    response.assert_status_ok();
    let summary: Value = response.json();
    assert_eq!(summary["sentCount"], 1);

    post_ok(&h.server, &token, &path, json!({"message": "Bring your kit"})).await;

    let response = h
        .server
        .get("/api/sms/logs")
        .add_query_param("messageType", "NOTICE_ALERT")
        .authorization_bearer(&token)
        .await;
    let logs: Vec<Value> = response.json();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["message"], "Bring your kit");
    assert_eq!(
        logs[1]["message"],
        "Dear Parent, Notice: Sports Day. Sports day is on Friday. - Test School"
    );
    assert_eq!(logs[1]["referenceInfo"], "Notice:Sports Day");

    h.server
        .post("/api/sms/notice/999")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .post(&path)
        .authorization_bearer(&token)
        .text("not json")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fee_reminder_targets_pending_students() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let (class_id, _, sid) = sms_class(&h.server, &token).await;
    post_ok(
        &h.server,
        &token,
        "/api/fees/structures",
        json!({"classId": class_id, "tuitionFee": 5000}),
    )
    .await;
    post_ok(
        &h.server,
        &token,
        "/api/fees/payments",
        json!({"studentId": sid, "amount": 1999.5, "paymentDate": ""}),
    )
    .await;

    let response = h
        .server
        .get("/api/sms/preview/fee-pending")
        .add_query_param("classId", class_id)
        .authorization_bearer(&token)
        .await;
    let pending: Vec<Value> = response.json();
    assert_eq!(pending.len(), 2);

    let reminder = post_ok(
        &h.server,
        &token,
        "/api/sms/fee-reminder",
        json!({"classId": class_id}),
    )
    .await;
    assert_eq!(reminder["success"], true);
    assert_eq!(reminder["sentCount"], 1);

    let response = h
        .server
        .get("/api/sms/logs")
        .add_query_param("messageType", "FEE_REMINDER")
        .authorization_bearer(&token)
        .await;
    let logs: Vec<Value> = response.json();
    assert_eq!(logs.len(), 1);
    assert_eq!(
        logs[0]["message"],
        "Dear Parent, Fee of Rs.3000 is pending for Aarav Kumar. Please pay at the earliest to avoid late fees. - Test School"
    );
}

// =============================================================================
// TRANSPORT, HOMEWORK, NOTICES & EXAMINATIONS
// =============================================================================

#[tokio::test]
async fn test_transport_routes_and_assignment() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let student = enrol(&h.server, &token, json!({"firstName": "Aarav", "lastName": "Kumar"})).await;
    let sid = student["id"].as_u64().unwrap();

    let route = post_ok(
        &h.server,
        &token,
        "/api/transport/routes",
        json!({"routeName": "North Loop", "routeCode": "R1", "monthlyFee": 800}),
    )
    .await;
    assert_eq!(route["annualFee"], "9600.00");
    let rid = route["id"].as_u64().unwrap();

    let response = h
        .server
        .put(&format!("/api/transport/students/{sid}/route"))
        .authorization_bearer(&token)
        .json(&json!({"routeId": rid}))
        .await;
    response.assert_status_ok();
    let riders = get_ok(&h.server, &token, &format!("/api/transport/routes/{rid}/students")).await;
    assert_eq!(riders[0]["id"], sid);

    h.server
        .put(&format!("/api/transport/students/{sid}/route"))
        .authorization_bearer(&token)
        .json(&json!({"routeId": 999}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .get("/api/transport/routes/999")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .post("/api/transport/routes")
        .authorization_bearer(&token)
        .json(&json!({"routeName": "Copy", "routeCode": "R1"}))
        .await
        .assert_status(StatusCode::CONFLICT);

    let response = h
        .server
        .delete(&format!("/api/transport/routes/{rid}"))
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    let after = get_ok(&h.server, &token, &format!("/api/students/{sid}")).await;
    assert!(after["transportRouteId"].is_null());
}

#[tokio::test]
async fn test_homework_defaults_to_calling_teacher() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let (_, class_id, section_id) = academic_setup(&h.server, &token).await;
    let subject = post_ok(
        &h.server,
        &token,
        "/api/academic/subjects",
        json!({"name": "Mathematics", "code": "MATH"}),
    )
    .await;
    let teacher = post_ok(
        &h.server,
        &token,
        "/api/teachers",
        json!({
            "firstName": "Meera", "lastName": "Iyer",
            "loginUsername": "meera", "loginPassword": "teacher123"
        }),
    )
    .await;
    let meera = login(&h.server, "meera", "teacher123").await;

    let hw = post_ok(
        &h.server,
        &meera,
        "/api/homework",
        json!({
            "subjectId": subject["id"], "classId": class_id, "sectionId": section_id,
            "title": "Fractions worksheet", "dueDate": "2099-12-31"
        }),
    )
    .await;
    assert_eq!(hw["teacherId"], teacher["id"]);
    let hid = hw["id"].as_u64().unwrap();

    let upcoming = get_ok(&h.server, &meera, "/api/homework/upcoming").await;
    assert_eq!(upcoming.as_array().unwrap().len(), 1);
    let by_section = get_ok(
        &h.server,
        &meera,
        &format!("/api/homework/class/{class_id}/section/{section_id}"),
    )
    .await;
    assert_eq!(by_section[0]["title"], "Fractions worksheet");

    let response = h
        .server
        .put(&format!("/api/homework/{hid}"))
        .authorization_bearer(&meera)
        .json(&json!({"title": "Fractions revision", "dueDate": "2099-12-30"}))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["title"], "Fractions revision");

    h.server
        .put("/api/homework/999")
        .authorization_bearer(&meera)
        .json(&json!({"title": "x", "dueDate": "2099-12-30"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .delete(&format!("/api/homework/{hid}"))
        .authorization_bearer(&meera)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_notice_roles() {
    let h = harness();
    let token = admin_token(&h.server).await;
    post_ok(
        &h.server,
        &token,
        "/api/teachers",
        json!({
            "firstName": "Meera", "lastName": "Iyer",
            "loginUsername": "meera", "loginPassword": "teacher123"
        }),
    )
    .await;
    let meera = login(&h.server, "meera", "teacher123").await;

    let draft = post_ok(
        &h.server,
        &meera,
        "/api/notices",
        json!({"title": "Holiday", "content": "Closed on Monday.", "publishDate": ""}),
    )
    .await;
    assert_eq!(draft["createdBy"], "meera");
    assert!(draft["publishDate"].is_null());
    post_ok(
        &h.server,
        &token,
        "/api/notices",
        json!({"title": "Exam week", "content": "Exams start soon.", "published": true}),
    )
    .await;

    let published = get_ok(&h.server, &meera, "/api/notices/published").await;
    assert_eq!(published.as_array().unwrap().len(), 1);
    assert_eq!(published[0]["title"], "Exam week");

    let path = format!("/api/notices/{}", draft["id"]);
    h.server
        .delete(&path)
        .authorization_bearer(&meera)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    h.server
        .delete(&path)
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
    h.server
        .get(&path)
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_examination_schedule_and_marks() {
    let h = harness();
    let token = admin_token(&h.server).await;
    let (_, class_id, section_id) = academic_setup(&h.server, &token).await;
    let subject = post_ok(
        &h.server,
        &token,
        "/api/academic/subjects",
        json!({"name": "Science", "code": "SCI", "maxMarks": 80, "passMarks": 30}),
    )
    .await;
    let student = enrol(
        &h.server,
        &token,
        json!({"firstName": "Aarav", "lastName": "Kumar", "classId": class_id, "sectionId": section_id}),
    )
    .await;
    let (sid, sub) = (student["id"].as_u64().unwrap(), subject["id"].as_u64().unwrap());

    let exam = post_ok(
        &h.server,
        &token,
        "/api/examinations",
        json!({"name": "Mid-Term", "startDate": "", "endDate": "2025-09-25"}),
    )
    .await;
    assert!(exam["startDate"].is_null());
    let eid = exam["id"].as_u64().unwrap();
    post_ok(
        &h.server,
        &token,
        "/api/examinations/schedules",
        json!({
            "examId": eid, "subjectId": sub, "classId": class_id,
            "examDate": "2025-09-16", "maxMarks": 100, "passMarks": 40
        }),
    )
    .await;

    // Above the subject's maximum, below the schedule's pass mark.
    let marks = post_ok(
        &h.server,
        &token,
        "/api/examinations/marks",
        json!({"studentId": sid, "examId": eid, "subjectId": sub, "theoryMarks": 20, "practicalMarks": 18}),
    )
    .await;
    assert_eq!(marks["totalMarks"], 38);
    assert_eq!(marks["result"], "FAIL");

    let bulk = post_ok(
        &h.server,
        &token,
        "/api/examinations/marks/bulk",
        json!([{"studentId": sid, "examId": eid, "subjectId": sub, "theoryMarks": 75, "practicalMarks": 18}]),
    )
    .await;
    assert_eq!(bulk[0]["id"], marks["id"]);
    assert_eq!(bulk[0]["totalMarks"], 93);
    assert_eq!(bulk[0]["result"], "PASS");

    let student_marks = get_ok(
        &h.server,
        &token,
        &format!("/api/examinations/{eid}/student/{sid}/marks"),
    )
    .await;
    assert_eq!(student_marks.as_array().unwrap().len(), 1);

    h.server
        .get("/api/examinations/999")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .delete(&format!("/api/examinations/{eid}"))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::CONFLICT);
}
