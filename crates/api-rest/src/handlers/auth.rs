use crate::auth::CurrentEmployee;
use crate::error::{ApiResult, JsonBody};
use crate::AppState;
use api_shared::auth::issue_token;
use api_shared::dto::{EmployeeRes, ErrorRes, LoginReq, LoginRes};
use api_shared::{HealthRes, HealthService};
use axum::http::StatusCode;
use axum::{extract::State, Json};

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service and database are up", body = HealthRes),
        (status = 503, description = "Database unreachable", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Returns the current health status of the clinic API. Used for monitoring and load balancer
/// health checks, so it requires no authentication.
///
/// # Returns
/// * `(StatusCode, Json<HealthRes>)` - 200 with `ok: true`, or 503 when the database does not answer
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthRes>) {
    let res = HealthService::report(state.clinic.ping().await);
    let status = if res.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(res))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Credentials accepted", body = LoginRes),
        (status = 401, description = "Unknown email, wrong password or inactive account", body = ErrorRes)
    )
)]
/// Exchange employee credentials for a bearer token
///
/// # Returns
/// * `Ok(Json<LoginRes>)` - Signed token, its expiry and the employee's profile
///
/// # Errors
/// Returns `401 Unauthorized` for any credential failure. The response does not say which check
/// failed; the audit trail does.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginReq>,
) -> ApiResult<Json<LoginRes>> {
    let employee = state.clinic.auth.login(&req.email, &req.password).await?;
    let issued = issue_token(&state.auth, &employee)?;
    Ok(Json(LoginRes {
        token: issued.token,
        token_type: "Bearer".into(),
        expires_at: issued.expires_at,
        employee: employee.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "The authenticated employee", body = EmployeeRes),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorRes)
    ),
    security(("bearer_auth" = []))
)]
/// The employee the bearer token belongs to.
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    employee: CurrentEmployee,
) -> ApiResult<Json<EmployeeRes>> {
    let current = state.clinic.auth.current(employee.actor().employee_id).await?;
    Ok(Json(current.into()))
}
