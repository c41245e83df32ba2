use crate::auth::CurrentEmployee;
use crate::error::{ApiResult, JsonBody, PathParam, QueryParams};
use crate::AppState;
use api_shared::dto::{
    AppointmentPage, AppointmentRes, CancelAppointmentReq, ErrorRes, PageRes,
    RescheduleAppointmentReq, ScheduleAppointmentReq, TimeSlotRes,
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDate;
use clinic_core::models::SystemRole::{Admin, Receptionist};
use clinic_core::models::{AppointmentFilter, AppointmentStatus};
use clinic_core::services::ScheduleRequest;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AppointmentQuery {
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    #[param(value_type = Option<String>, example = "scheduled")]
    pub status: Option<AppointmentStatus>,
    /// First day, inclusive.
    pub from: Option<NaiveDate>,
    /// Last day, inclusive.
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SlotQuery {
    pub date: NaiveDate,
    /// Defaults to the clinic's configured appointment length.
    pub duration_minutes: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/appointments",
    tag = "appointments",
    params(AppointmentQuery),
    responses(
        (status = 200, description = "A page of appointments ordered by start time", body = AppointmentPage),
        (status = 400, description = "`from` is after `to`", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    QueryParams(query): QueryParams<AppointmentQuery>,
) -> ApiResult<Json<PageRes<AppointmentRes>>> {
    let filter = AppointmentFilter {
        doctor_id: query.doctor_id,
        patient_id: query.patient_id,
        status: query.status,
        from: query.from,
        to: query.to,
    };
    let page = state.clinic.page_request(query.page, query.page_size);
    let appointments = state.clinic.appointments.list(&filter, page).await?;
    Ok(Json(PageRes::from_page(appointments)))
}

#[utoipa::path(
    post,
    path = "/appointments",
    tag = "appointments",
    request_body = ScheduleAppointmentReq,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentRes),
        (status = 400, description = "Outside opening hours, in the past, or inactive patient/doctor", body = ErrorRes),
        (status = 403, description = "Admin or receptionist role required", body = ErrorRes),
        (status = 404, description = "No such patient or doctor", body = ErrorRes),
        (status = 409, description = "Doctor or patient already booked at that time", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Book an appointment
///
/// The slot must start in the future, fit inside the clinic's opening hours on a working day,
/// and overlap no other live appointment of the doctor. A patient can hold at most one live
/// appointment per day.
///
/// # Returns
/// * `Ok((StatusCode::CREATED, Json<AppointmentRes>))` - The booked appointment in `scheduled` status
///
/// # Errors
/// Returns `409 Conflict` if the doctor or the patient is already booked at that time.
#[axum::debug_handler]
pub async fn schedule_appointment(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    JsonBody(req): JsonBody<ScheduleAppointmentReq>,
) -> ApiResult<(StatusCode, Json<AppointmentRes>)> {
    let actor = employee
        .require(&state, "appointment.create", &[Admin, Receptionist])
        .await?;
    let request = ScheduleRequest {
        patient_id: req.patient_id,
        doctor_id: req.doctor_id,
        starts_at: req.starts_at,
        duration_minutes: req.duration_minutes,
        reason: req.reason,
    };
    let appointment = state.clinic.appointments.schedule(actor, request).await?;
    Ok((StatusCode::CREATED, Json(appointment.into())))
}

#[utoipa::path(
    get,
    path = "/appointments/{id}",
    tag = "appointments",
    params(("id" = i64, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "The appointment", body = AppointmentRes),
        (status = 404, description = "No such appointment", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<AppointmentRes>> {
    Ok(Json(state.clinic.appointments.get(id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}/reschedule",
    tag = "appointments",
    params(("id" = i64, Path, description = "Appointment id")),
    request_body = RescheduleAppointmentReq,
    responses(
        (status = 200, description = "Appointment moved", body = AppointmentRes),
        (status = 400, description = "New slot is invalid", body = ErrorRes),
        (status = 403, description = "Admin or receptionist role required", body = ErrorRes),
        (status = 409, description = "The new slot is taken", body = ErrorRes),
        (status = 422, description = "Appointment is no longer scheduled", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Move a scheduled appointment to a new start time.
#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<RescheduleAppointmentReq>,
) -> ApiResult<Json<AppointmentRes>> {
    let actor = employee
        .require(&state, "appointment.reschedule", &[Admin, Receptionist])
        .await?;
    let appointment = state
        .clinic
        .appointments
        .reschedule(actor, id, req.starts_at, req.duration_minutes)
        .await?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    post,
    path = "/appointments/{id}/cancel",
    tag = "appointments",
    params(("id" = i64, Path, description = "Appointment id")),
    request_body = CancelAppointmentReq,
    responses(
        (status = 200, description = "Appointment cancelled", body = AppointmentRes),
        (status = 400, description = "Missing cancellation reason", body = ErrorRes),
        (status = 403, description = "Admin or receptionist role required", body = ErrorRes),
        (status = 422, description = "Appointment already started, completed or cancelled", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<CancelAppointmentReq>,
) -> ApiResult<Json<AppointmentRes>> {
    let actor = employee
        .require(&state, "appointment.cancel", &[Admin, Receptionist])
        .await?;
    let appointment = state.clinic.appointments.cancel(actor, id, &req.reason).await?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    get,
    path = "/doctors/{id}/slots",
    tag = "appointments",
    params(("id" = i64, Path, description = "Doctor's employee id"), SlotQuery),
    responses(
        (status = 200, description = "Free slots on the day, in order", body = [TimeSlotRes]),
        (status = 400, description = "Not a doctor or invalid length", body = ErrorRes),
        (status = 404, description = "No such doctor", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Free slots for a doctor on one day
///
/// Slots are laid out from opening time in steps of the requested length, skipping existing
/// bookings and slots that have already started. Closed days return an empty list.
#[axum::debug_handler]
pub async fn available_slots(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    PathParam(doctor_id): PathParam<i64>,
    QueryParams(query): QueryParams<SlotQuery>,
) -> ApiResult<Json<Vec<TimeSlotRes>>> {
    let slots = state
        .clinic
        .appointments
        .available_slots(doctor_id, query.date, query.duration_minutes)
        .await?;
    Ok(Json(slots.into_iter().map(Into::into).collect()))
}
