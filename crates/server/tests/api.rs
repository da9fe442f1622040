//! HTTP-level tests driving the full router against an in-memory SQLite
//! database, one fresh database per test.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Set};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use tower_http::cors::CorsLayer;

use server::auth::AppState;
use server::routes::build_router;
use service::rate_limit::SyncRateLimiter;

const SCHEMA: &[&str] = &[
    "CREATE TABLE clients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        category TEXT NOT NULL,
        location TEXT,
        soft_deleted INTEGER NOT NULL DEFAULT 0,
        deleted_at TEXT,
        deleted_by TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE contacts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        contact_date TEXT NOT NULL,
        days_ago INTEGER NOT NULL,
        provider_name TEXT NOT NULL,
        client_name TEXT NOT NULL,
        category TEXT NOT NULL,
        food_accessed INTEGER NOT NULL DEFAULT 0,
        services_requested TEXT NOT NULL,
        services_provided TEXT NOT NULL,
        comments TEXT NOT NULL,
        case_management_requested INTEGER NOT NULL DEFAULT 0,
        case_management_provided INTEGER NOT NULL DEFAULT 0,
        occupational_therapy_requested INTEGER NOT NULL DEFAULT 0,
        occupational_therapy_provided INTEGER NOT NULL DEFAULT 0,
        food_requested INTEGER NOT NULL DEFAULT 0,
        food_provided INTEGER NOT NULL DEFAULT 0,
        healthcare_requested INTEGER NOT NULL DEFAULT 0,
        healthcare_provided INTEGER NOT NULL DEFAULT 0,
        housing_requested INTEGER NOT NULL DEFAULT 0,
        housing_provided INTEGER NOT NULL DEFAULT 0,
        employment_requested INTEGER NOT NULL DEFAULT 0,
        employment_provided INTEGER NOT NULL DEFAULT 0,
        benefits_requested INTEGER NOT NULL DEFAULT 0,
        benefits_provided INTEGER NOT NULL DEFAULT 0,
        legal_requested INTEGER NOT NULL DEFAULT 0,
        legal_provided INTEGER NOT NULL DEFAULT 0,
        transportation_requested INTEGER NOT NULL DEFAULT 0,
        transportation_provided INTEGER NOT NULL DEFAULT 0,
        childcare_requested INTEGER NOT NULL DEFAULT 0,
        childcare_provided INTEGER NOT NULL DEFAULT 0,
        mental_health_requested INTEGER NOT NULL DEFAULT 0,
        mental_health_provided INTEGER NOT NULL DEFAULT 0,
        substance_abuse_requested INTEGER NOT NULL DEFAULT 0,
        substance_abuse_provided INTEGER NOT NULL DEFAULT 0,
        education_requested INTEGER NOT NULL DEFAULT 0,
        education_provided INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_name TEXT NOT NULL,
        provider_name TEXT NOT NULL,
        message TEXT,
        severity TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        resolved_at TEXT
    )",
    "CREATE TABLE cm_checkins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        contact_id INTEGER NOT NULL,
        client_name TEXT NOT NULL,
        client_uuid TEXT,
        provider_name TEXT NOT NULL,
        notes TEXT,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE ot_checkins (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        contact_id INTEGER NOT NULL,
        client_name TEXT NOT NULL,
        client_uuid TEXT,
        provider_name TEXT NOT NULL,
        notes TEXT,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE cm_goals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_name TEXT NOT NULL,
        goal_text TEXT NOT NULL,
        status TEXT NOT NULL,
        priority TEXT NOT NULL,
        target_date TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE ot_goals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_name TEXT NOT NULL,
        goal_text TEXT NOT NULL,
        status TEXT NOT NULL,
        priority TEXT NOT NULL,
        target_date TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE cm_goal_progress (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        goal_id INTEGER NOT NULL,
        progress_note TEXT,
        previous_status TEXT NOT NULL,
        new_status TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE ot_goal_progress (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        goal_id INTEGER NOT NULL,
        progress_note TEXT,
        previous_status TEXT NOT NULL,
        new_status TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE intake_forms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_id INTEGER NOT NULL,
        form_data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        active INTEGER NOT NULL DEFAULT 1,
        can_view_client_demographics INTEGER NOT NULL DEFAULT 0,
        can_view_client_services INTEGER NOT NULL DEFAULT 0,
        can_view_all_clients INTEGER NOT NULL DEFAULT 0,
        can_export_client_data INTEGER NOT NULL DEFAULT 0,
        can_manage_users INTEGER NOT NULL DEFAULT 0,
        can_manage_system_settings INTEGER NOT NULL DEFAULT 0,
        can_view_audit_logs INTEGER NOT NULL DEFAULT 0,
        can_manage_database INTEGER NOT NULL DEFAULT 0,
        can_create_contacts INTEGER NOT NULL DEFAULT 0,
        can_edit_own_contacts INTEGER NOT NULL DEFAULT 0,
        can_edit_all_contacts INTEGER NOT NULL DEFAULT 0,
        can_delete_contacts INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE audit_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_email TEXT NOT NULL,
        action TEXT NOT NULL,
        table_name TEXT NOT NULL,
        record_id TEXT,
        client_name TEXT,
        ip_address TEXT,
        changes TEXT,
        timestamp TEXT NOT NULL
    )",
    "CREATE TABLE services_update_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        contact_id INTEGER NOT NULL,
        updated_by TEXT NOT NULL,
        services_added TEXT NOT NULL,
        services_removed TEXT NOT NULL,
        update_type TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE monthly_service_summary (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_name TEXT NOT NULL,
        month INTEGER NOT NULL,
        year INTEGER NOT NULL,
        case_management INTEGER NOT NULL DEFAULT 0,
        occupational_therapy INTEGER NOT NULL DEFAULT 0,
        food INTEGER NOT NULL DEFAULT 0,
        healthcare INTEGER NOT NULL DEFAULT 0,
        housing INTEGER NOT NULL DEFAULT 0,
        employment INTEGER NOT NULL DEFAULT 0,
        benefits INTEGER NOT NULL DEFAULT 0,
        legal INTEGER NOT NULL DEFAULT 0,
        transportation INTEGER NOT NULL DEFAULT 0,
        childcare INTEGER NOT NULL DEFAULT 0,
        mental_health INTEGER NOT NULL DEFAULT 0,
        substance_abuse INTEGER NOT NULL DEFAULT 0,
        education INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE outreach_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_date TEXT NOT NULL,
        run_time TEXT,
        lead_staff TEXT NOT NULL,
        team_members TEXT,
        planned_locations TEXT,
        safety_notes TEXT,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE outreach_locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        address TEXT,
        notes TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )",
];

const ADMIN_KEY: &str = "test-admin-key";

async fn setup() -> (Router, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.expect("sqlite connect");
    for ddl in SCHEMA {
        db.execute_unprepared(ddl).await.expect("create table");
    }
    let state = AppState {
        db: db.clone(),
        admin_key: Some(ADMIN_KEY.to_string()),
        sync_limiter: Arc::new(SyncRateLimiter::default()),
    };
    (build_router(CorsLayer::very_permissive(), state), db)
}

async fn seed_staff_user(db: &DatabaseConnection, email: &str) {
    let am = models::user::ActiveModel {
        email: Set(email.to_string()),
        active: Set(true),
        can_view_client_demographics: Set(true),
        can_view_client_services: Set(true),
        can_view_all_clients: Set(true),
        can_export_client_data: Set(false),
        can_manage_users: Set(false),
        can_manage_system_settings: Set(false),
        can_view_audit_logs: Set(false),
        can_manage_database: Set(false),
        can_create_contacts: Set(true),
        can_edit_own_contacts: Set(true),
        can_edit_all_contacts: Set(false),
        can_delete_contacts: Set(false),
        ..Default::default()
    };
    models::user::create(db, am).await.expect("seed user");
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn get_as(uri: &str, email: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-email", email)
        .body(Body::empty())
        .expect("request")
}

fn req_json(method: &str, uri: &str, email: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(email) = email {
        builder = builder.header("x-user-email", email);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn admin_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-admin-key", ADMIN_KEY)
        .header("x-user-email", "admin@example.org")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(res: Response) -> Value {
    let bytes = res.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_is_public() {
    let (app, _db) = setup().await;
    let res = app.oneshot(get("/health")).await.expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn admin_routes_require_the_key() {
    let (app, _db) = setup().await;

    let res = app
        .clone()
        .oneshot(get("/api/admin/users"))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/api/admin/users")
        .header("x-admin-key", "nope")
        .body(Body::empty())
        .expect("request");
    let res = app.clone().oneshot(wrong).await.expect("response");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_fail_closed_without_configured_key() {
    let db = Database::connect("sqlite::memory:").await.expect("sqlite connect");
    for ddl in SCHEMA {
        db.execute_unprepared(ddl).await.expect("create table");
    }
    let state = AppState {
        db,
        admin_key: None,
        sync_limiter: Arc::new(SyncRateLimiter::default()),
    };
    let app = build_router(CorsLayer::very_permissive(), state);

    let with_key = Request::builder()
        .uri("/api/admin/users")
        .header("x-admin-key", "anything")
        .body(Body::empty())
        .expect("request");
    let res = app.oneshot(with_key).await.expect("response");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn alert_dedup_is_per_client_per_day() {
    let (app, _db) = setup().await;
    let payload = json!({"clientName": "Jane Roe", "providerName": "Sam"});

    let res = app
        .clone()
        .oneshot(req_json("POST", "/api/alerts", None, payload.clone()))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(req_json("POST", "/api/alerts", None, payload))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // A different client is unaffected.
    let other = json!({"clientName": "John Doe", "providerName": "Sam"});
    let res = app
        .oneshot(req_json("POST", "/api/alerts", None, other))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn alert_delete_resolves_and_hides_from_active_list() {
    let (app, _db) = setup().await;
    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/alerts",
            None,
            json!({"clientName": "Jane Roe", "providerName": "Sam"}),
        ))
        .await
        .expect("response");
    let created = body_json(res).await;
    let id = created["alert"]["id"].as_i64().expect("alert id");

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/alerts/{id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["alert"]["status"], "resolved");

    let res = app.oneshot(get("/api/alerts")).await.expect("response");
    let body = body_json(res).await;
    assert_eq!(body["alerts"].as_array().expect("array").len(), 0);
}

#[tokio::test]
async fn checkin_terminal_state_rejects_reopening() {
    let (app, _db) = setup().await;
    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/checkins",
            None,
            json!({"contact_id": 1, "client_name": "Jane Roe", "provider_name": "Sam", "client_uuid": null, "notes": null}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let id = body["checkin"]["id"].as_i64().expect("checkin id");
    assert_eq!(body["checkin"]["status"], "Draft");

    let res = app
        .clone()
        .oneshot(req_json(
            "PUT",
            &format!("/api/checkins/{id}"),
            None,
            json!({"status": "Completed"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(req_json(
            "PUT",
            &format!("/api/checkins/{id}"),
            None,
            json!({"status": "Draft"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    let details = &body["error"]["details"];
    assert_eq!(details["currentStatus"], "Completed");
    assert_eq!(details["requestedStatus"], "Draft");
    assert_eq!(details["allowedTransitions"], json!([]));
}

#[tokio::test]
async fn goal_updates_append_progress_only_when_due() {
    let (app, _db) = setup().await;
    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/goals",
            None,
            json!({"client_name": "Jane Roe", "goal_text": "Obtain ID"}),
        ))
        .await
        .expect("response");
    let body = body_json(res).await;
    let id = body["goal"]["id"].as_i64().expect("goal id");

    // Status change: one progress row.
    let res = app
        .clone()
        .oneshot(req_json(
            "PUT",
            &format!("/api/goals/{id}"),
            None,
            json!({"status": "In Progress"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    // Same status, no note: nothing appended.
    let res = app
        .clone()
        .oneshot(req_json(
            "PUT",
            &format!("/api/goals/{id}"),
            None,
            json!({"status": "In Progress"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    // Same status with a note: appended.
    let res = app
        .clone()
        .oneshot(req_json(
            "PUT",
            &format!("/api/goals/{id}"),
            None,
            json!({"status": "In Progress", "progress_note": "met at shelter"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(get(&format!("/api/goals/{id}/progress")))
        .await
        .expect("response");
    let body = body_json(res).await;
    let history = body["progress"].as_array().expect("array");
    assert_eq!(history.len(), 2);
    // Newest first.
    assert_eq!(history[0]["progress_note"], "met at shelter");
    assert_eq!(history[1]["previous_status"], "Not Started");
}

#[tokio::test]
async fn intake_creates_prospect_and_blocks_second_same_day() {
    let (app, db) = setup().await;
    seed_staff_user(&db, "staff@example.org").await;

    let payload = json!({
        "clientName": "New Person",
        "providerName": "Sam",
        "servicesRequested": ["Food", "Housing"],
        "foodAccessed": true,
    });
    let res = app
        .clone()
        .oneshot(req_json("POST", "/api/checkin", Some("staff@example.org"), payload.clone()))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["contact"]["category"], "Prospect");
    assert_eq!(body["contact"]["food_provided"], 1);
    assert_eq!(body["contact"]["housing_requested"], 1);

    let res = app
        .clone()
        .oneshot(req_json("POST", "/api/checkin", Some("staff@example.org"), payload))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Listing requires identity.
    let res = app
        .clone()
        .oneshot(get("/api/contacts"))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .oneshot(get_as("/api/contacts?client=New%20Person", "staff@example.org"))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn update_services_merges_and_is_idempotent() {
    let (app, db) = setup().await;
    seed_staff_user(&db, "staff@example.org").await;

    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/checkin",
            Some("staff@example.org"),
            json!({"clientName": "Jane Roe", "providerName": "Sam", "servicesRequested": ["Legal"]}),
        ))
        .await
        .expect("response");
    let body = body_json(res).await;
    let contact_id = body["contact"]["id"].as_i64().expect("contact id");

    let update = json!({
        "contactId": contact_id,
        "services": [{"service": "Legal", "provider": "Dan"}],
    });
    let res = app
        .clone()
        .oneshot(req_json("POST", "/api/update-services", Some("staff@example.org"), update.clone()))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["changes"]["added"], json!(["Legal"]));
    assert_eq!(body["contact"]["legal_provided"], 1);
    assert_eq!(body["contact"]["legal_requested"], 1);

    // Same payload again: no change reported, state stable.
    let res = app
        .clone()
        .oneshot(req_json("POST", "/api/update-services", Some("staff@example.org"), update))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["changes"]["added"], json!([]));
    assert_eq!(body["changes"]["removed"], json!([]));
    assert_eq!(body["contact"]["legal_provided"], 1);
}

#[tokio::test]
async fn client_deletion_requires_exact_confirmation() {
    let (app, db) = setup().await;
    seed_staff_user(&db, "staff@example.org").await;

    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/checkin",
            Some("staff@example.org"),
            json!({"clientName": "Jane Roe", "providerName": "Sam"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(admin_json(
            "POST",
            "/api/admin/data-management/client-summary",
            json!({"clientName": "Jane Roe"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["summary"]["contacts"], 1);

    let res = app
        .clone()
        .oneshot(admin_json(
            "POST",
            "/api/admin/data-management/delete-client",
            json!({"clientName": "Jane Roe", "confirmationName": "jane roe"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(admin_json(
            "POST",
            "/api/admin/data-management/delete-client",
            json!({"clientName": "Jane Roe", "confirmationName": "Jane Roe"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    // The client is now invisible to the deletion flow.
    let res = app
        .oneshot(admin_json(
            "POST",
            "/api/admin/data-management/client-summary",
            json!({"clientName": "Jane Roe"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_creation_applies_role_template_and_rejects_duplicates() {
    let (app, _db) = setup().await;

    let res = app
        .clone()
        .oneshot(admin_json(
            "POST",
            "/api/admin/users",
            json!({"email": "case@example.org", "role": "Direct Service Provider"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["user"]["role"], "Direct Service Provider");
    assert_eq!(body["user"]["permissions"]["can_create_contacts"], true);
    assert_eq!(body["user"]["permissions"]["can_manage_users"], false);

    let res = app
        .oneshot(admin_json(
            "POST",
            "/api/admin/users",
            json!({"email": "case@example.org", "role": "Reports Viewer"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sync_services_is_rate_limited_per_caller() {
    let (app, _db) = setup().await;
    let payload = json!({"month": 6, "year": 2026});

    let res = app
        .clone()
        .oneshot(admin_json("POST", "/api/admin/sync-services", payload.clone()))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["month"], 6);

    let res = app
        .oneshot(admin_json("POST", "/api/admin/sync-services", payload))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn audit_log_export_is_csv_with_dated_filename() {
    let (app, _db) = setup().await;

    // Generate at least one audit row.
    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/alerts",
            Some("sam@example.org"),
            json!({"clientName": "Jane Roe", "providerName": "Sam"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    let export = Request::builder()
        .uri("/api/admin/audit-logs/export")
        .header("x-admin-key", ADMIN_KEY)
        .body(Body::empty())
        .expect("request");
    let res = app.oneshot(export).await.expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).expect("content type"),
        "text/csv"
    );
    let disposition = res
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .expect("disposition")
        .to_str()
        .expect("ascii")
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"audit-logs-"));
    assert!(disposition.ends_with(".csv\""));

    let bytes = res.into_body().collect().await.expect("body").to_bytes();
    let text = String::from_utf8(bytes.to_vec()).expect("utf8");
    let mut lines = text.lines();
    assert_eq!(
        lines.next().expect("header row"),
        "\"ID\",\"Timestamp\",\"User\",\"Action\",\"Table\",\"Record ID\",\"Client\",\"Changes\""
    );
    assert!(lines.next().is_some());
}

#[tokio::test]
async fn alert_expires_next_day_and_is_expired_on_list_read() {
    let (app, db) = setup().await;

    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/alerts",
            None,
            json!({"clientName": "Jane Roe", "providerName": "Sam"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let id = body["alert"]["id"].as_i64().expect("alert id") as i32;
    let created =
        chrono::DateTime::parse_from_rfc3339(body["alert"]["created_at"].as_str().expect("created_at"))
            .expect("created_at parses");
    let expires =
        chrono::DateTime::parse_from_rfc3339(body["alert"]["expires_at"].as_str().expect("expires_at"))
            .expect("expires_at parses");
    assert_eq!(expires.date_naive(), created.date_naive() + chrono::Days::new(1));
    assert_eq!(expires.time(), chrono::NaiveTime::MIN);

    let res = app.clone().oneshot(get("/api/alerts")).await.expect("response");
    let body = body_json(res).await;
    assert_eq!(body["alerts"].as_array().expect("array").len(), 1);

    // Move the expiry into the past, as if a day had gone by.
    let stored = models::alert::Entity::find_by_id(id)
        .one(&db)
        .await
        .expect("query")
        .expect("alert row");
    let mut am: models::alert::ActiveModel = stored.into();
    am.expires_at = Set((Utc::now() - chrono::Duration::hours(2)).into());
    am.update(&db).await.expect("backdate expiry");

    let res = app.oneshot(get("/api/alerts")).await.expect("response");
    let body = body_json(res).await;
    assert_eq!(body["alerts"].as_array().expect("array").len(), 0);

    let stored = models::alert::Entity::find_by_id(id)
        .one(&db)
        .await
        .expect("query")
        .expect("alert row");
    assert_eq!(stored.status, "expired");
}

#[tokio::test]
async fn clear_client_trims_the_submitted_name() {
    let (app, _db) = setup().await;

    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/alerts",
            None,
            json!({"clientName": "Jane Roe", "providerName": "Sam"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/alerts/clear-client",
            None,
            json!({"clientName": "  Jane Roe  "}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["cleared"], 1);

    let res = app.oneshot(get("/api/alerts")).await.expect("response");
    let body = body_json(res).await;
    assert_eq!(body["alerts"].as_array().expect("array").len(), 0);
}

#[tokio::test]
async fn database_failures_return_a_generic_message() {
    let (app, db) = setup().await;
    db.execute_unprepared("DROP TABLE alerts").await.expect("drop table");

    let res = app.oneshot(get("/api/alerts")).await.expect("response");
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
    assert_eq!(body["error"]["message"], "A database error occurred");
    assert_eq!(body["error"]["details"]["hint"], "a required table is missing");
}

#[tokio::test]
async fn intake_form_is_one_per_client_and_resubmission_replaces() {
    let (app, db) = setup().await;
    seed_staff_user(&db, "staff@example.org").await;
    let client = models::client::create(&db, "Jane Roe", "Participant").await.expect("client");

    let res = app
        .clone()
        .oneshot(get_as("/api/intake-forms", "staff@example.org"))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(get_as(
            &format!("/api/intake-forms?clientId={}", client.id),
            "staff@example.org",
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["form"], Value::Null);

    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/intake-forms",
            Some("staff@example.org"),
            json!({"clientId": client.id, "formData": {"name": "Jane Roe", "program": "CM"}}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/intake-forms",
            Some("staff@example.org"),
            json!({"clientId": client.id, "formData": {"name": "Jane Roe", "program": "Housing"}}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_as(
            &format!("/api/intake-forms?clientId={}", client.id),
            "staff@example.org",
        ))
        .await
        .expect("response");
    let body = body_json(res).await;
    assert_eq!(body["form"]["form_data"]["program"], "Housing");

    let rows = models::intake_form::Entity::find().all(&db).await.expect("rows");
    assert_eq!(rows.len(), 1);

    // Unknown client: nothing to attach the form to.
    let res = app
        .oneshot(req_json(
            "POST",
            "/api/intake-forms",
            Some("staff@example.org"),
            json!({"clientId": 9999, "formData": {"name": "Ghost"}}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn outreach_runs_round_trip() {
    let (app, _db) = setup().await;

    let res = app
        .clone()
        .oneshot(req_json(
            "POST",
            "/api/outreach/runs",
            None,
            json!({"runDate": "2026-08-27", "leadStaff": "Sam", "teamMembers": "Sam, Pat"}),
        ))
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let id = body["run"]["id"].as_i64().expect("run id");

    let res = app
        .clone()
        .oneshot(get("/api/outreach/runs"))
        .await
        .expect("response");
    let body = body_json(res).await;
    assert_eq!(body["runs"].as_array().expect("array").len(), 1);

    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/outreach/runs/{id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(res.status(), StatusCode::OK);
}
