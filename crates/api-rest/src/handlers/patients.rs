use crate::auth::CurrentEmployee;
use crate::error::{ApiResult, JsonBody, PathParam, QueryParams};
use crate::AppState;
use api_shared::dto::{
    CreatePatientReq, ErrorRes, PageRes, PatientHistoryRes, PatientPage, PatientRes,
    UpdatePatientReq,
};
use axum::{extract::State, http::StatusCode, Json};
use clinic_core::models::PatientFilter;
use clinic_core::models::SystemRole::{Admin, Doctor, Receptionist};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PatientQuery {
    /// Matched against first name, last name and national id.
    pub search: Option<String>,
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/patients",
    tag = "patients",
    params(PatientQuery),
    responses(
        (status = 200, description = "A page of patients", body = PatientPage),
        (status = 401, description = "Missing or invalid token", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Search patients
///
/// Retrieves a page of patients ordered by last name, first name.
///
/// # Returns
/// * `Ok(Json<PageRes<PatientRes>>)` - Matching patients and the total match count
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    QueryParams(query): QueryParams<PatientQuery>,
) -> ApiResult<Json<PageRes<PatientRes>>> {
    let filter = PatientFilter {
        search: query.search,
        active: query.active,
    };
    let page = state.clinic.page_request(query.page, query.page_size);
    let patients = state.clinic.patients.search(&filter, page).await?;
    Ok(Json(PageRes::from_page(patients)))
}

#[utoipa::path(
    post,
    path = "/patients",
    tag = "patients",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient registered", body = PatientRes),
        (status = 400, description = "Invalid patient data", body = ErrorRes),
        (status = 403, description = "Admin or receptionist role required", body = ErrorRes),
        (status = 409, description = "National id already registered", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Register a new patient
///
/// # Arguments
/// * `req` - Demographics of the patient. The national id is normalised to uppercase.
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - a required field is blank,
/// - the national id, email, phone or blood type is malformed, or
/// - the birth date lies in the future.
///
/// Returns `409 Conflict` if another patient already has the national id.
#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    JsonBody(req): JsonBody<CreatePatientReq>,
) -> ApiResult<(StatusCode, Json<PatientRes>)> {
    let actor = employee
        .require(&state, "patient.create", &[Admin, Receptionist])
        .await?;
    let patient = state.clinic.patients.create(actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    tag = "patients",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "The patient", body = PatientRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<PatientRes>> {
    Ok(Json(state.clinic.patients.get(id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    tag = "patients",
    params(("id" = i64, Path, description = "Patient id")),
    request_body = UpdatePatientReq,
    responses(
        (status = 200, description = "Patient updated", body = PatientRes),
        (status = 400, description = "Invalid patient data", body = ErrorRes),
        (status = 403, description = "Admin or receptionist role required", body = ErrorRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<UpdatePatientReq>,
) -> ApiResult<Json<PatientRes>> {
    let actor = employee
        .require(&state, "patient.update", &[Admin, Receptionist])
        .await?;
    let patient = state.clinic.patients.update(actor, id, req.into()).await?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/deactivate",
    tag = "patients",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient deactivated", body = PatientRes),
        (status = 403, description = "Admin or receptionist role required", body = ErrorRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Deactivate a patient. Records are kept; inactive patients cannot be booked.
#[axum::debug_handler]
pub async fn deactivate_patient(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<PatientRes>> {
    let actor = employee
        .require(&state, "patient.deactivate", &[Admin, Receptionist])
        .await?;
    let patient = state.clinic.patients.deactivate(actor, id).await?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/history",
    tag = "patients",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Everything recorded for the patient", body = PatientHistoryRes),
        (status = 403, description = "Admin, doctor or receptionist role required", body = ErrorRes),
        (status = 404, description = "No such patient", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn patient_history(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<PatientHistoryRes>> {
    employee
        .require(&state, "patient.history", &[Admin, Doctor, Receptionist])
        .await?;
    Ok(Json(state.clinic.patients.history(id).await?.into()))
}
