//! Specialties, roles and employee administration.

use crate::auth::CurrentEmployee;
use crate::error::{ApiResult, JsonBody, PathParam, QueryParams};
use crate::AppState;
use api_shared::dto::{
    ChangeRoleReq, CreateEmployeeReq, EmployeePage, EmployeeRes, ErrorRes, PageRes,
    ResetPasswordReq, RoleReq, RoleRes, SpecialtyReq, SpecialtyRes, UpdateEmployeeReq,
};
use axum::{extract::State, http::StatusCode, Json};
use clinic_core::models::EmployeeFilter;
use clinic_core::models::SystemRole::Admin;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ActiveQuery {
    /// Only return active entries.
    pub active_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub role_id: Option<i64>,
    pub specialty_id: Option<i64>,
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DoctorQuery {
    pub specialty_id: Option<i64>,
}

// Specialties

#[utoipa::path(
    get,
    path = "/specialties",
    tag = "staff",
    params(ActiveQuery),
    responses((status = 200, description = "Medical specialties", body = [SpecialtyRes])),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_specialties(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    QueryParams(query): QueryParams<ActiveQuery>,
) -> ApiResult<Json<Vec<SpecialtyRes>>> {
    let specialties = state
        .clinic
        .specialties
        .list(query.active_only.unwrap_or(false))
        .await?;
    Ok(Json(specialties.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/specialties/{id}",
    tag = "staff",
    params(("id" = i64, Path, description = "Specialty id")),
    responses(
        (status = 200, description = "The specialty", body = SpecialtyRes),
        (status = 404, description = "No such specialty", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_specialty(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<SpecialtyRes>> {
    Ok(Json(state.clinic.specialties.get(id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/specialties",
    tag = "staff",
    request_body = SpecialtyReq,
    responses(
        (status = 201, description = "Specialty created", body = SpecialtyRes),
        (status = 400, description = "Invalid name", body = ErrorRes),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 409, description = "Name already in use", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn create_specialty(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    JsonBody(req): JsonBody<SpecialtyReq>,
) -> ApiResult<(StatusCode, Json<SpecialtyRes>)> {
    let actor = employee.require(&state, "specialty.create", &[Admin]).await?;
    let specialty = state
        .clinic
        .specialties
        .create(actor, &req.name, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(specialty.into())))
}

#[utoipa::path(
    put,
    path = "/specialties/{id}",
    tag = "staff",
    params(("id" = i64, Path, description = "Specialty id")),
    request_body = SpecialtyReq,
    responses(
        (status = 200, description = "Specialty updated", body = SpecialtyRes),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 404, description = "No such specialty", body = ErrorRes),
        (status = 409, description = "Name already in use", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn update_specialty(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<SpecialtyReq>,
) -> ApiResult<Json<SpecialtyRes>> {
    let actor = employee.require(&state, "specialty.update", &[Admin]).await?;
    let specialty = state
        .clinic
        .specialties
        .update(actor, id, &req.name, req.description, req.active.unwrap_or(true))
        .await?;
    Ok(Json(specialty.into()))
}

#[utoipa::path(
    delete,
    path = "/specialties/{id}",
    tag = "staff",
    params(("id" = i64, Path, description = "Specialty id")),
    responses(
        (status = 204, description = "Specialty deleted"),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 409, description = "Specialty still assigned to doctors", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Delete a specialty no doctor is assigned to.
///
/// Specialties in use can only be deactivated through `PUT /specialties/{id}`.
#[axum::debug_handler]
pub async fn delete_specialty(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<StatusCode> {
    let actor = employee.require(&state, "specialty.delete", &[Admin]).await?;
    state.clinic.specialties.delete(actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Roles

#[utoipa::path(
    get,
    path = "/roles",
    tag = "staff",
    responses((status = 200, description = "All roles", body = [RoleRes])),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_roles(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
) -> ApiResult<Json<Vec<RoleRes>>> {
    let roles = state.clinic.roles.list().await?;
    Ok(Json(roles.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/roles",
    tag = "staff",
    request_body = RoleReq,
    responses(
        (status = 201, description = "Role created", body = RoleRes),
        (status = 400, description = "Role name is not snake_case", body = ErrorRes),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 409, description = "Name already in use", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn create_role(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    JsonBody(req): JsonBody<RoleReq>,
) -> ApiResult<(StatusCode, Json<RoleRes>)> {
    let actor = employee.require(&state, "role.create", &[Admin]).await?;
    let role = state.clinic.roles.create(actor, &req.name, req.description).await?;
    Ok((StatusCode::CREATED, Json(role.into())))
}

#[utoipa::path(
    put,
    path = "/roles/{id}",
    tag = "staff",
    params(("id" = i64, Path, description = "Role id")),
    request_body = RoleReq,
    responses(
        (status = 200, description = "Role updated", body = RoleRes),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 404, description = "No such role", body = ErrorRes),
        (status = 409, description = "System roles cannot be renamed", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn update_role(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<RoleReq>,
) -> ApiResult<Json<RoleRes>> {
    let actor = employee.require(&state, "role.update", &[Admin]).await?;
    let role = state
        .clinic
        .roles
        .update(actor, id, &req.name, req.description)
        .await?;
    Ok(Json(role.into()))
}

#[utoipa::path(
    delete,
    path = "/roles/{id}",
    tag = "staff",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 409, description = "System role or role still assigned", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn delete_role(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<StatusCode> {
    let actor = employee.require(&state, "role.delete", &[Admin]).await?;
    state.clinic.roles.delete(actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Employees

#[utoipa::path(
    get,
    path = "/employees",
    tag = "staff",
    params(EmployeeQuery),
    responses((status = 200, description = "A page of employees", body = EmployeePage)),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_employees(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    QueryParams(query): QueryParams<EmployeeQuery>,
) -> ApiResult<Json<PageRes<EmployeeRes>>> {
    let filter = EmployeeFilter {
        role_id: query.role_id,
        specialty_id: query.specialty_id,
        active: query.active,
    };
    let page = state.clinic.page_request(query.page, query.page_size);
    let employees = state.clinic.employees.list(&filter, page).await?;
    Ok(Json(PageRes::from_page(employees)))
}

#[utoipa::path(
    get,
    path = "/employees/{id}",
    tag = "staff",
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "The employee", body = EmployeeRes),
        (status = 404, description = "No such employee", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_employee(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<EmployeeRes>> {
    Ok(Json(state.clinic.employees.get(id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/employees",
    tag = "staff",
    request_body = CreateEmployeeReq,
    responses(
        (status = 201, description = "Employee created", body = EmployeeRes),
        (status = 400, description = "Invalid employee data or doctor without specialty", body = ErrorRes),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 409, description = "Email already in use", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Create an employee account
///
/// The password is hashed before it is stored and never returned.
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - a name, email, phone or password fails validation,
/// - the role does not exist, or
/// - the role is `doctor` and no active specialty is given.
#[axum::debug_handler]
pub async fn create_employee(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    JsonBody(req): JsonBody<CreateEmployeeReq>,
) -> ApiResult<(StatusCode, Json<EmployeeRes>)> {
    let actor = employee.require(&state, "employee.create", &[Admin]).await?;
    let created = state.clinic.employees.create(actor, req.into()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    put,
    path = "/employees/{id}",
    tag = "staff",
    params(("id" = i64, Path, description = "Employee id")),
    request_body = UpdateEmployeeReq,
    responses(
        (status = 200, description = "Employee updated", body = EmployeeRes),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 404, description = "No such employee", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn update_employee(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<UpdateEmployeeReq>,
) -> ApiResult<Json<EmployeeRes>> {
    let actor = employee.require(&state, "employee.update", &[Admin]).await?;
    let updated = state.clinic.employees.update(actor, id, req.into()).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    put,
    path = "/employees/{id}/role",
    tag = "staff",
    params(("id" = i64, Path, description = "Employee id")),
    request_body = ChangeRoleReq,
    responses(
        (status = 200, description = "Role changed", body = EmployeeRes),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 409, description = "Would leave the clinic without an administrator", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn change_employee_role(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<ChangeRoleReq>,
) -> ApiResult<Json<EmployeeRes>> {
    let actor = employee.require(&state, "employee.change_role", &[Admin]).await?;
    let updated = state
        .clinic
        .employees
        .change_role(actor, id, req.role_id, req.specialty_id)
        .await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    put,
    path = "/employees/{id}/password",
    tag = "staff",
    params(("id" = i64, Path, description = "Employee id")),
    request_body = ResetPasswordReq,
    responses(
        (status = 204, description = "Password replaced"),
        (status = 400, description = "Password too short", body = ErrorRes),
        (status = 403, description = "Admin role required", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn reset_employee_password(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
    JsonBody(req): JsonBody<ResetPasswordReq>,
) -> ApiResult<StatusCode> {
    let actor = employee.require(&state, "employee.reset_password", &[Admin]).await?;
    state
        .clinic
        .employees
        .reset_password(actor, id, &req.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/employees/{id}/deactivate",
    tag = "staff",
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee deactivated", body = EmployeeRes),
        (status = 403, description = "Admin role required", body = ErrorRes),
        (status = 409, description = "Own account or last active administrator", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// Deactivate an employee account
///
/// Deactivated employees can no longer log in, and tokens they already hold stop working on
/// their next request.
#[axum::debug_handler]
pub async fn deactivate_employee(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<EmployeeRes>> {
    let actor = employee.require(&state, "employee.deactivate", &[Admin]).await?;
    let updated = state.clinic.employees.set_active(actor, id, false).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    post,
    path = "/employees/{id}/activate",
    tag = "staff",
    params(("id" = i64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee reactivated", body = EmployeeRes),
        (status = 403, description = "Admin role required", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn activate_employee(
    State(state): State<AppState>,
    employee: CurrentEmployee,
    PathParam(id): PathParam<i64>,
) -> ApiResult<Json<EmployeeRes>> {
    let actor = employee.require(&state, "employee.activate", &[Admin]).await?;
    let updated = state.clinic.employees.set_active(actor, id, true).await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    get,
    path = "/doctors",
    tag = "staff",
    params(DoctorQuery),
    responses((status = 200, description = "Active doctors", body = [EmployeeRes])),
    security(("bearer_auth" = []))
)]
/// Active doctors, optionally restricted to one specialty.
#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<AppState>,
    _employee: CurrentEmployee,
    QueryParams(query): QueryParams<DoctorQuery>,
) -> ApiResult<Json<Vec<EmployeeRes>>> {
    let doctors = state.clinic.employees.list_doctors(query.specialty_id).await?;
    Ok(Json(doctors.into_iter().map(Into::into).collect()))
}
