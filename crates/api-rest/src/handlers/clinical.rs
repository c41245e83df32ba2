//! Consultations and what doctors order from them: lab exams and prescriptions.

use crate::auth::CurrentEmployee;
use crate::error::{ApiResult, JsonBody, PathParam, QueryParams};
use crate::handlers::staff::ActiveQuery;
use crate::AppState;
use api_shared::dto::{
    ConsultationNotesReq, ConsultationRes, ErrorRes, ExamPage, ExamRes, ExamTypeReq,
    ExamTypeRes, IssuePrescriptionReq, OrderExamsReq, PageRes, PrescriptionRes, ProcessExamReq,
};
use axum::{extract::State, http::StatusCode, Json};
use clinic_core::models::SystemRole::{Admin, Doctor, LabTechnician};
use clinic_core::models::{ExamFilter, ExamStatus};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ExamQuery {
    #[param(value_type = Option<String>, example = "pending")]
    pub status: Option<ExamStatus>,
    pub patient_id: Option<i64>,
    pub consultation_id: Option<i64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

// Consultations

#[utoipa::path(
    post,
    path = "/appointments/{id}/consultation",
    tag = "consultations",
    params(("id" = i64, Path, description = "Appointment id")),
    responses(
        (status = 201, description = "Consultation opened, appointment in progress", body = ConsultationRes),
        (status = 403, description = "Only the appointment's doctor may start it", body = ErrorRes),
        (status = 404, description = "No such appointment", body = ErrorRes),
        (status = 409, description = "A consultation already exists", body = ErrorRes),
        (status = 422, description = "Appointment is not scheduled", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Start the consultation for an appointment
///
/// Opens the consultation and moves the appointment to `in_progress` in one transaction.
///
/// # Errors
/// Returns `403 Forbidden` if the caller is not a doctor or not the appointment's doctor.
/// Returns `422 Unprocessable Entity` if the appointment is not `scheduled`.
#[axum::debug_handler]
pub async fn start_consultation(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(appointment_id): PathParam<i64>,
) -> ApiResult<(StatusCode, Json<ConsultationRes>)> {
    let doctor = employee.require(&state, "consultation.start", &[Doctor]).await?;
    let consultation = state
        .clinic
        .consultations
        .start(doctor, appointment_id)
        .await?;
    Ok((StatusCode::CREATED, Json(consultation.into())))
}

#[utoipa::path(
    get,
    path = "/appointments/{id}/consultation",
    tag = "consultations",
    params(("id" = i64, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "The appointment's consultation", body = ConsultationRes),
        (status = 404, description = "No such appointment, or not started yet", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_appointment_consultation(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(appointment_id): PathParam<i64>,
) -> ApiResult<Json<ConsultationRes>> {
    employee
        .require(&state, "consultation.read", &[Admin, Doctor])
        .await?;
    let consultation = state
        .clinic
        .consultations
        .get_by_appointment(appointment_id)
        .await?;
    Ok(Json(consultation.into()))
}

#[utoipa::path(
    get,
    path = "/consultations/{id}",
    tag = "consultations",
    params(("id" = i64, Path, description = "Consultation id")),
    responses(
        (status = 200, description = "The consultation", body = ConsultationRes),
        (status = 403, description = "Admin or doctor role required", body = ErrorRes),
        (status = 404, description = "No such consultation", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_consultation(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<ConsultationRes>> {
    employee
        .require(&state, "consultation.read", &[Admin, Doctor])
        .await?;
    Ok(Json(state.clinic.consultations.get(id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/consultations/{id}",
    tag = "consultations",
    params(("id" = i64, Path, description = "Consultation id")),
    request_body = ConsultationNotesReq,
    responses(
        (status = 200, description = "Notes saved", body = ConsultationRes),
        (status = 403, description = "Only the consultation's doctor may edit it", body = ErrorRes),
        (status = 409, description = "Consultation already finalised", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn update_consultation(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<ConsultationNotesReq>,
) -> ApiResult<Json<ConsultationRes>> {
    let doctor = employee.require(&state, "consultation.update", &[Doctor]).await?;
    let consultation = state
        .clinic
        .consultations
        .update_notes(doctor, id, req.into())
        .await?;
    Ok(Json(consultation.into()))
}

#[utoipa::path(
    post,
    path = "/consultations/{id}/finalise",
    tag = "consultations",
    params(("id" = i64, Path, description = "Consultation id")),
    responses(
        (status = 200, description = "Consultation finalised, appointment completed", body = ConsultationRes),
        (status = 400, description = "No diagnosis recorded", body = ErrorRes),
        (status = 403, description = "Only the consultation's doctor may finalise it", body = ErrorRes),
        (status = 409, description = "Consultation already finalised", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Finalise a consultation and complete its appointment. A diagnosis must be recorded first.
#[axum::debug_handler]
pub async fn finalise_consultation(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<ConsultationRes>> {
    let doctor = employee
        .require(&state, "consultation.finalise", &[Doctor])
        .await?;
    let consultation = state.clinic.consultations.finalise(doctor, id).await?;
    Ok(Json(consultation.into()))
}

// Exam types

#[utoipa::path(
    get,
    path = "/exam-types",
    tag = "exams",
    params(ActiveQuery),
    responses((status = 200, description = "Exam catalogue", body = [ExamTypeRes])),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_exam_types(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    QueryParams(query): QueryParams<ActiveQuery>,
) -> ApiResult<Json<Vec<ExamTypeRes>>> {
    let types = state
        .clinic
        .exams
        .list_types(query.active_only.unwrap_or(false))
        .await?;
    Ok(Json(types.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/exam-types",
    tag = "exams",
    request_body = ExamTypeReq,
    responses(
        (status = 201, description = "Exam type created", body = ExamTypeRes),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 409, description = "Name already in use", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn create_exam_type(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    JsonBody(req): JsonBody<ExamTypeReq>,
) -> ApiResult<(StatusCode, Json<ExamTypeRes>)> {
    let actor = employee.require(&state, "exam_type.create", &[Admin]).await?;
    let exam_type = state
        .clinic
        .exams
        .create_type(actor, &req.name, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(exam_type.into())))
}

#[utoipa::path(
    put,
    path = "/exam-types/{id}",
    tag = "exams",
    params(("id" = i64, Path, description = "Exam type id")),
    request_body = ExamTypeReq,
    responses(
        (status = 200, description = "Exam type updated", body = ExamTypeRes),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 404, description = "No such exam type", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Rename or (de)activate an exam type. Inactive types cannot be ordered.
#[axum::debug_handler]
pub async fn update_exam_type(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<ExamTypeReq>,
) -> ApiResult<Json<ExamTypeRes>> {
    let actor = employee.require(&state, "exam_type.update", &[Admin]).await?;
    let exam_type = state
        .clinic
        .exams
        .update_type(actor, id, &req.name, req.description, req.active.unwrap_or(true))
        .await?;
    Ok(Json(exam_type.into()))
}

// Exams

#[utoipa::path(
    post,
    path = "/consultations/{id}/exams",
    tag = "exams",
    params(("id" = i64, Path, description = "Consultation id")),
    request_body = OrderExamsReq,
    responses(
        (status = 201, description = "Exams ordered", body = [ExamRes]),
        (status = 400, description = "Empty, duplicated or inactive exam types", body = ErrorRes),
        (status = 403, description = "Only the consultation's doctor may order exams", body = ErrorRes),
        (status = 409, description = "Consultation finalised, or exam already pending", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Order lab exams from an open consultation
///
/// All requested exams are created together or not at all.
///
/// # Errors
/// Returns `400 Bad Request` if the list is empty, repeats a type or names an unknown or
/// inactive type. Returns `409 Conflict` if the consultation is finalised or the patient already
/// has the same exam pending.
#[axum::debug_handler]
pub async fn order_exams(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(consultation_id): PathParam<i64>,
    JsonBody(req): JsonBody<OrderExamsReq>,
) -> ApiResult<(StatusCode, Json<Vec<ExamRes>>)> {
    let doctor = employee.require(&state, "exam.order", &[Doctor]).await?;
    let exams = state
        .clinic
        .exams
        .order(doctor, consultation_id, &req.exam_type_ids, req.notes)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(exams.into_iter().map(Into::into).collect()),
    ))
}

#[utoipa::path(
    get,
    path = "/exams",
    tag = "exams",
    params(ExamQuery),
    responses(
        (status = 200, description = "A page of exams", body = ExamPage),
        (status = 403, description = "Admin, doctor or lab technician role required", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    QueryParams(query): QueryParams<ExamQuery>,
) -> ApiResult<Json<PageRes<ExamRes>>> {
    employee
        .require(&state, "exam.read", &[Admin, Doctor, LabTechnician])
        .await?;
    let filter = ExamFilter {
        status: query.status,
        patient_id: query.patient_id,
        consultation_id: query.consultation_id,
    };
    let page = state.clinic.page_request(query.page, query.page_size);
    let exams = state.clinic.exams.list(&filter, page).await?;
    Ok(Json(PageRes::from_page(exams)))
}

#[utoipa::path(
    get,
    path = "/exams/{id}",
    tag = "exams",
    params(("id" = i64, Path, description = "Exam id")),
    responses(
        (status = 200, description = "The exam", body = ExamRes),
        (status = 403, description = "Admin, doctor or lab technician role required", body = ErrorRes),
        (status = 404, description = "No such exam", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<ExamRes>> {
    employee
        .require(&state, "exam.read", &[Admin, Doctor, LabTechnician])
        .await?;
    Ok(Json(state.clinic.exams.get(id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/exams/{id}/process",
    tag = "exams",
    params(("id" = i64, Path, description = "Exam id")),
    request_body = ProcessExamReq,
    responses(
        (status = 200, description = "Result recorded", body = ExamRes),
        (status = 400, description = "Empty result", body = ErrorRes),
        (status = 403, description = "Admin or lab technician role required", body = ErrorRes),
        (status = 422, description = "Exam is not pending", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn process_exam(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<ProcessExamReq>,
) -> ApiResult<Json<ExamRes>> {
    let actor = employee
        .require(&state, "exam.process", &[Admin, LabTechnician])
        .await?;
    let exam = state.clinic.exams.process(actor, id, &req.result).await?;
    Ok(Json(exam.into()))
}

#[utoipa::path(
    post,
    path = "/exams/{id}/cancel",
    tag = "exams",
    params(("id" = i64, Path, description = "Exam id")),
    responses(
        (status = 200, description = "Exam cancelled", body = ExamRes),
        (status = 403, description = "Only the ordering doctor or an admin may cancel", body = ErrorRes),
        (status = 422, description = "Exam is not pending", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn cancel_exam(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<ExamRes>> {
    let actor = employee
        .require(&state, "exam.cancel", &[Admin, Doctor])
        .await?;
    let exam = state.clinic.exams.cancel(actor, id).await?;
    Ok(Json(exam.into()))
}

// Prescriptions

#[utoipa::path(
    post,
    path = "/consultations/{id}/prescriptions",
    tag = "prescriptions",
    params(("id" = i64, Path, description = "Consultation id")),
    request_body = IssuePrescriptionReq,
    responses(
        (status = 201, description = "Prescription issued", body = PrescriptionRes),
        (status = 400, description = "No items, or an invalid item", body = ErrorRes),
        (status = 403, description = "Only the consultation's doctor may prescribe", body = ErrorRes),
        (status = 409, description = "Consultation is still open", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Issue a prescription for a finalised consultation
///
/// The prescription and all of its items are stored in one transaction.
#[axum::debug_handler]
pub async fn issue_prescription(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(consultation_id): PathParam<i64>,
    JsonBody(req): JsonBody<IssuePrescriptionReq>,
) -> ApiResult<(StatusCode, Json<PrescriptionRes>)> {
    let doctor = employee
        .require(&state, "prescription.issue", &[Doctor])
        .await?;
    let items = req.items.into_iter().map(Into::into).collect();
    let prescription = state
        .clinic
        .prescriptions
        .issue(doctor, consultation_id, req.notes, items)
        .await?;
    Ok((StatusCode::CREATED, Json(prescription.into())))
}

#[utoipa::path(
    get,
    path = "/consultations/{id}/prescriptions",
    tag = "prescriptions",
    params(("id" = i64, Path, description = "Consultation id")),
    responses(
        (status = 200, description = "Prescriptions issued from the consultation", body = [PrescriptionRes]),
        (status = 404, description = "No such consultation", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_consultation_prescriptions(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(consultation_id): PathParam<i64>,
) -> ApiResult<Json<Vec<PrescriptionRes>>> {
    employee
        .require(&state, "prescription.read", &[Admin, Doctor])
        .await?;
    let prescriptions = state
        .clinic
        .prescriptions
        .list_for_consultation(consultation_id)
        .await?;
    Ok(Json(prescriptions.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/prescriptions/{id}",
    tag = "prescriptions",
    params(("id" = i64, Path, description = "Prescription id")),
    responses(
        (status = 200, description = "The prescription and its items", body = PrescriptionRes),
        (status = 403, description = "Admin or doctor role required", body = ErrorRes),
        (status = 404, description = "No such prescription", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_prescription(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<PrescriptionRes>> {
    employee
        .require(&state, "prescription.read", &[Admin, Doctor])
        .await?;
    Ok(Json(state.clinic.prescriptions.get(id).await?.into()))
}
