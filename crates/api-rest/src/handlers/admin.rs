//! Audit trail and operational reports. Administrators only.

use crate::auth::CurrentEmployee;
use crate::error::{ApiResult, QueryParams};
use crate::AppState;
use api_shared::dto::{
    AppointmentSummaryRes, AuditLogPage, AuditLogRes, DoctorWorkloadRes, ErrorRes,
    ExamTypeSummaryRes, PageRes,
};
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_core::models::AuditFilter;
use clinic_core::models::SystemRole::Admin;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQuery {
    pub employee_id: Option<i64>,
    /// Action prefix, e.g. `appointment.` or `authorisation.denied`.
    pub action: Option<String>,
    pub success: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// First day, inclusive.
    pub from: NaiveDate,
    /// Last day, inclusive.
    pub to: NaiveDate,
    /// Restrict the appointment summary to one doctor.
    pub doctor_id: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/audit-logs",
    tag = "admin",
    params(AuditQuery),
    responses(
        (status = 200, description = "Audit entries, newest first", body = AuditLogPage),
        (status = 403, description = "Admin role required", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    QueryParams(query): QueryParams<AuditQuery>,
) -> ApiResult<Json<PageRes<AuditLogRes>>> {
    employee.require(&state, "audit.read", &[Admin]).await?;
    let filter = AuditFilter {
        employee_id: query.employee_id,
        action_prefix: query.action,
        success: query.success,
        from: query.from,
        to: query.to,
    };
    let page = state.clinic.page_request(query.page, query.page_size);
    let logs = state.clinic.audit.list(&filter, page).await?;
    Ok(Json(PageRes::from_page(logs)))
}

#[utoipa::path(
    get,
    path = "/reports/appointments",
    tag = "admin",
    params(ReportQuery),
    responses(
        (status = 200, description = "Appointment counts by status", body = AppointmentSummaryRes),
        (status = 400, description = "`from` is after `to`", body = ErrorRes),
        (status = 403, description = "Admin role required", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn appointment_report(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    QueryParams(query): QueryParams<ReportQuery>,
) -> ApiResult<Json<AppointmentSummaryRes>> {
    employee.require(&state, "report.appointments", &[Admin]).await?;
    let summary = state
        .clinic
        .reports
        .appointment_summary(query.from, query.to, query.doctor_id)
        .await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    get,
    path = "/reports/workload",
    tag = "admin",
    params(ReportQuery),
    responses(
        (status = 200, description = "Appointments per doctor", body = [DoctorWorkloadRes]),
        (status = 403, description = "Admin role required", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn workload_report(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    QueryParams(query): QueryParams<ReportQuery>,
) -> ApiResult<Json<Vec<DoctorWorkloadRes>>> {
    employee.require(&state, "report.workload", &[Admin]).await?;
    let rows = state.clinic.reports.doctor_workload(query.from, query.to).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/reports/exams",
    tag = "admin",
    params(ReportQuery),
    responses(
        (status = 200, description = "Exam counts per type and status", body = [ExamTypeSummaryRes]),
        (status = 403, description = "Admin role required", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn exam_report(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    QueryParams(query): QueryParams<ReportQuery>,
) -> ApiResult<Json<Vec<ExamTypeSummaryRes>>> {
    employee.require(&state, "report.exams", &[Admin]).await?;
    let rows = state.clinic.reports.exam_summary(query.from, query.to).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/reports/appointments.csv",
    tag = "admin",
    params(ReportQuery),
    responses(
        (status = 200, description = "Appointments in the range as CSV", content_type = "text/csv", body = String),
        (status = 403, description = "Admin role required", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Export the appointments in a date range as a CSV download.
#[axum::debug_handler]
pub async fn appointment_csv(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    QueryParams(query): QueryParams<ReportQuery>,
) -> ApiResult<impl IntoResponse> {
    employee.require(&state, "report.export", &[Admin]).await?;
    let csv = state
        .clinic
        .reports
        .appointments_csv(query.from, query.to)
        .await?;
    let filename = format!(
        "attachment; filename=\"appointments_{}_{}.csv\"",
        query.from, query.to
    );
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, filename),
        ],
        csv,
    ))
}
