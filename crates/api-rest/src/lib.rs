//! # API REST
//!
//! REST API implementation for the clinic back end.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Bearer token authentication and per-endpoint role checks
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialisation, error bodies, CORS, request tracing)
//!
//! Uses `api-shared` for transport types and token handling, and `clinic-core` for everything
//! else.

#![warn(rust_2018_idioms)]

pub mod auth;
pub mod error;
pub mod handlers;

use api_shared::dto::*;
use api_shared::{AuthConfig, HealthRes};
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post, put};
use axum::Router;
use clinic_core::Clinic;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use handlers::{admin, appointments, clinical, patients, staff};

/// Application state shared across REST API handlers
///
/// Contains the clinic services and the token settings resolved at startup.
#[derive(Clone)]
pub struct AppState {
    pub clinic: Clinic,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(clinic: Clinic, auth: AuthConfig) -> Self {
        Self {
            clinic,
            auth: Arc::new(auth),
        }
    }
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Clinic API", description = "Clinic management back end"),
    paths(
        handlers::auth::health,
        handlers::auth::login,
        handlers::auth::me,
        staff::list_specialties,
        staff::get_specialty,
        staff::create_specialty,
        staff::update_specialty,
        staff::delete_specialty,
        staff::list_roles,
        staff::create_role,
        staff::update_role,
        staff::delete_role,
        staff::list_employees,
        staff::get_employee,
        staff::create_employee,
        staff::update_employee,
        staff::change_employee_role,
        staff::reset_employee_password,
        staff::deactivate_employee,
        staff::activate_employee,
        staff::list_doctors,
        patients::list_patients,
        patients::create_patient,
        patients::get_patient,
        patients::update_patient,
        patients::deactivate_patient,
        patients::patient_history,
        appointments::list_appointments,
        appointments::schedule_appointment,
        appointments::get_appointment,
        appointments::reschedule_appointment,
        appointments::cancel_appointment,
        appointments::available_slots,
        clinical::start_consultation,
        clinical::get_appointment_consultation,
        clinical::get_consultation,
        clinical::update_consultation,
        clinical::finalise_consultation,
        clinical::list_exam_types,
        clinical::create_exam_type,
        clinical::update_exam_type,
        clinical::order_exams,
        clinical::list_exams,
        clinical::get_exam,
        clinical::process_exam,
        clinical::cancel_exam,
        clinical::issue_prescription,
        clinical::list_consultation_prescriptions,
        clinical::get_prescription,
        admin::list_audit_logs,
        admin::appointment_report,
        admin::workload_report,
        admin::exam_report,
        admin::appointment_csv,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        LoginReq,
        LoginRes,
        SpecialtyReq,
        SpecialtyRes,
        RoleReq,
        RoleRes,
        CreateEmployeeReq,
        UpdateEmployeeReq,
        ChangeRoleReq,
        ResetPasswordReq,
        EmployeeRes,
        EmployeePage,
        CreatePatientReq,
        UpdatePatientReq,
        PatientRes,
        PatientPage,
        PatientHistoryRes,
        ScheduleAppointmentReq,
        RescheduleAppointmentReq,
        CancelAppointmentReq,
        AppointmentRes,
        AppointmentPage,
        TimeSlotRes,
        ConsultationNotesReq,
        ConsultationRes,
        ExamTypeReq,
        ExamTypeRes,
        OrderExamsReq,
        ProcessExamReq,
        ExamRes,
        ExamPage,
        PrescriptionItemReq,
        IssuePrescriptionReq,
        PrescriptionItemRes,
        PrescriptionRes,
        AuditLogRes,
        AuditLogPage,
        AppointmentSummaryRes,
        DoctorWorkloadRes,
        ExamTypeSummaryRes,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Build the REST router with all routes, Swagger UI, CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::auth::health))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/specialties",
            get(staff::list_specialties).post(staff::create_specialty),
        )
        .route(
            "/specialties/:id",
            get(staff::get_specialty)
                .put(staff::update_specialty)
                .delete(staff::delete_specialty),
        )
        .route("/roles", get(staff::list_roles).post(staff::create_role))
        .route(
            "/roles/:id",
            put(staff::update_role).delete(staff::delete_role),
        )
        .route(
            "/employees",
            get(staff::list_employees).post(staff::create_employee),
        )
        .route(
            "/employees/:id",
            get(staff::get_employee).put(staff::update_employee),
        )
        .route("/employees/:id/role", put(staff::change_employee_role))
        .route("/employees/:id/password", put(staff::reset_employee_password))
        .route("/employees/:id/deactivate", post(staff::deactivate_employee))
        .route("/employees/:id/activate", post(staff::activate_employee))
        .route("/doctors", get(staff::list_doctors))
        .route("/doctors/:id/slots", get(appointments::available_slots))
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/patients/:id",
            get(patients::get_patient).put(patients::update_patient),
        )
        .route("/patients/:id/deactivate", post(patients::deactivate_patient))
        .route("/patients/:id/history", get(patients::patient_history))
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::schedule_appointment),
        )
        .route("/appointments/:id", get(appointments::get_appointment))
        .route(
            "/appointments/:id/reschedule",
            put(appointments::reschedule_appointment),
        )
        .route("/appointments/:id/cancel", post(appointments::cancel_appointment))
        .route(
            "/appointments/:id/consultation",
            get(clinical::get_appointment_consultation).post(clinical::start_consultation),
        )
        .route(
            "/consultations/:id",
            get(clinical::get_consultation).put(clinical::update_consultation),
        )
        .route(
            "/consultations/:id/finalise",
            post(clinical::finalise_consultation),
        )
        .route("/consultations/:id/exams", post(clinical::order_exams))
        .route(
            "/consultations/:id/prescriptions",
            get(clinical::list_consultation_prescriptions).post(clinical::issue_prescription),
        )
        .route(
            "/exam-types",
            get(clinical::list_exam_types).post(clinical::create_exam_type),
        )
        .route("/exam-types/:id", put(clinical::update_exam_type))
        .route("/exams", get(clinical::list_exams))
        .route("/exams/:id", get(clinical::get_exam))
        .route("/exams/:id/process", post(clinical::process_exam))
        .route("/exams/:id/cancel", post(clinical::cancel_exam))
        .route("/prescriptions/:id", get(clinical::get_prescription))
        .route("/audit-logs", get(admin::list_audit_logs))
        .route("/reports/appointments", get(admin::appointment_report))
        .route("/reports/appointments.csv", get(admin::appointment_csv))
        .route("/reports/workload", get(admin::workload_report))
        .route("/reports/exams", get(admin::exam_report))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = uuid::Uuid::new_v4();
                tracing::info_span!(
                    "request",
                    %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests;
