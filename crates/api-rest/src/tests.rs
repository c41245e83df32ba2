//! Router tests driving the full stack against an in-memory database.

use super::*;
use axum::http::{header, Method, StatusCode};
use clinic_core::{db, ClinicHours, CoreConfig};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@clinic.org";
const PASSWORD: &str = "password123";

async fn app() -> Router {
    let pool = db::in_memory().await.expect("in-memory database");
    let cfg = CoreConfig::new("sqlite::memory:".into(), ClinicHours::default(), 30)
        .expect("CoreConfig::new should succeed");
    let clinic = Clinic::new(pool, Arc::new(cfg));
    clinic
        .employees
        .bootstrap_admin("Ada", "Admin", ADMIN_EMAIL, PASSWORD)
        .await
        .expect("bootstrap admin");
    let auth = AuthConfig::new("router-test-secret-0123456789", 60).expect("auth config");
    router(AppState::new(clinic, auth))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn role_id(app: &Router, token: &str, name: &str) -> i64 {
    let (_, roles) = send(app, Method::GET, "/roles", Some(token), None).await;
    roles
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == name)
        .and_then(|r| r["id"].as_i64())
        .unwrap()
}

/// Create an employee through the API and return its id.
async fn hire(app: &Router, admin: &str, email: &str, role: &str, specialty_id: Option<i64>) -> i64 {
    let role_id = role_id(app, admin, role).await;
    let (status, body) = send(
        app,
        Method::POST,
        "/employees",
        Some(admin),
        Some(json!({
            "first_name": "Sam",
            "last_name": role,
            "email": email,
            "role_id": role_id,
            "specialty_id": specialty_id,
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "hire failed: {body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn health_reports_an_unreachable_database() {
    let pool = db::in_memory().await.expect("in-memory database");
    let cfg = CoreConfig::new("sqlite::memory:".into(), ClinicHours::default(), 30)
        .expect("CoreConfig::new should succeed");
    let clinic = Clinic::new(pool.clone(), Arc::new(cfg));
    let auth = AuthConfig::new("router-test-secret-0123456789", 60).expect("auth config");
    let app = router(AppState::new(clinic, auth));

    pool.close().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ok"], false);
    assert_eq!(body["message"], "Database unavailable");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/patients", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorised");

    let (status, _) = send(&app, Method::GET, "/patients", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_and_me() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "not-the-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorised");

    let token = login(&app, ADMIN_EMAIL).await;
    let (status, me) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert_eq!(me["role"], "admin");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn malformed_body_is_a_json_error() {
    let app = app().await;
    let token = login(&app, ADMIN_EMAIL).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/patients",
        Some(&token),
        Some(json!({ "first_name": "Only a name" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
}

#[tokio::test]
async fn role_denials_are_forbidden_and_audited() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL).await;
    hire(&app, &admin, "front@clinic.org", "receptionist", None).await;
    let receptionist = login(&app, "front@clinic.org").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/specialties",
        Some(&receptionist),
        Some(json!({ "name": "Cardiology" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    let (status, _) = send(&app, Method::GET, "/audit-logs", Some(&receptionist), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, logs) = send(
        &app,
        Method::GET,
        "/audit-logs?action=authorisation.denied",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs["total"], 2);
    assert_eq!(logs["items"][0]["success"], false);
}

#[tokio::test]
async fn deactivated_employee_token_stops_working() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL).await;
    let id = hire(&app, &admin, "lab@clinic.org", "lab_technician", None).await;
    let lab = login(&app, "lab@clinic.org").await;

    let (status, _) = send(&app, Method::GET, "/exams", Some(&lab), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/employees/{id}/deactivate"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/exams", Some(&lab), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn appointment_to_prescription_workflow() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL).await;

    let (status, specialty) = send(
        &app,
        Method::POST,
        "/specialties",
        Some(&admin),
        Some(json!({ "name": "General practice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let doctor_id = hire(
        &app,
        &admin,
        "doc@clinic.org",
        "doctor",
        specialty["id"].as_i64(),
    )
    .await;
    hire(&app, &admin, "front@clinic.org", "receptionist", None).await;
    let doctor = login(&app, "doc@clinic.org").await;
    let front = login(&app, "front@clinic.org").await;

    let (status, patient) = send(
        &app,
        Method::POST,
        "/patients",
        Some(&front),
        Some(json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "national_id": "gh-1906",
            "birth_date": "1906-12-09",
            "gender": "female",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(patient["national_id"], "GH-1906");
    let patient_id = patient["id"].as_i64().unwrap();

    // 2099-06-01 is a Monday.
    let (status, appointment) = send(
        &app,
        Method::POST,
        "/appointments",
        Some(&front),
        Some(json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "starts_at": "2099-06-01T09:00:00",
            "reason": "check-up",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{appointment}");
    assert_eq!(appointment["status"], "scheduled");
    assert_eq!(appointment["ends_at"], "2099-06-01T09:30:00");
    let appointment_id = appointment["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/appointments",
        Some(&front),
        Some(json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "starts_at": "2099-06-01T09:15:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let (status, slots) = send(
        &app,
        Method::GET,
        &format!("/doctors/{doctor_id}/slots?date=2099-06-01"),
        Some(&front),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let slots = slots.as_array().unwrap();
    assert_eq!(slots[0]["starts_at"], "2099-06-01T08:00:00");
    assert!(slots.iter().all(|s| s["starts_at"] != "2099-06-01T09:00:00"));

    // Receptionists cannot run consultations.
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/appointments/{appointment_id}/consultation"),
        Some(&front),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, consultation) = send(
        &app,
        Method::POST,
        &format!("/appointments/{appointment_id}/consultation"),
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let consultation_id = consultation["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/consultations/{consultation_id}/finalise"),
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/consultations/{consultation_id}"),
        Some(&doctor),
        Some(json!({ "symptoms": "cough", "diagnosis": "common cold" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, finalised) = send(
        &app,
        Method::POST,
        &format!("/consultations/{consultation_id}/finalise"),
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finalised["status"], "finalised");

    let (_, appointment) = send(
        &app,
        Method::GET,
        &format!("/appointments/{appointment_id}"),
        Some(&front),
        None,
    )
    .await;
    assert_eq!(appointment["status"], "completed");

    let (status, prescription) = send(
        &app,
        Method::POST,
        &format!("/consultations/{consultation_id}/prescriptions"),
        Some(&doctor),
        Some(json!({
            "items": [{
                "medication": "Paracetamol",
                "dosage": "500mg",
                "frequency": "every 6 hours",
                "duration_days": 5
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(prescription["items"][0]["medication"], "Paracetamol");

    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/patients/{patient_id}/history"),
        Some(&doctor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["appointments"].as_array().unwrap().len(), 1);
    assert_eq!(history["prescriptions"].as_array().unwrap().len(), 1);

    let (status, summary) = send(
        &app,
        Method::GET,
        "/reports/appointments?from=2099-06-01&to=2099-06-30",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["completed"], 1);
    assert_eq!(summary["total"], 1);
}

#[tokio::test]
async fn appointment_csv_export() {
    let app = app().await;
    let admin = login(&app, ADMIN_EMAIL).await;

    let request = Request::builder()
        .uri("/reports/appointments.csv?from=2099-06-01&to=2099-06-30")
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("id,starts_at,ends_at,status"));
    assert_eq!(text.lines().count(), 1);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = app().await;
    let (status, doc) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/appointments").is_some());
    assert!(doc["components"]["securitySchemes"].get("bearer_auth").is_some());
}
