//! Mapping of service and authentication errors onto HTTP responses.
//!
//! Every error body has the shape `{ "code": "...", "message": "..." }`. Internal failures are
//! logged in full and reported to the client as a generic `internal` error.

use api_shared::dto::ErrorRes;
use api_shared::AuthError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{extract::FromRequest, extract::FromRequestParts, Json};
use clinic_core::ClinicError;

#[derive(Debug)]
pub enum ApiError {
    Clinic(ClinicError),
    Auth(AuthError),
    /// Malformed body, query string or path parameter.
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        ApiError::Clinic(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "invalid_input", message.clone()),
            ApiError::Auth(err) => match err {
                AuthError::MissingToken | AuthError::Expired | AuthError::InvalidToken => {
                    (StatusCode::UNAUTHORIZED, "unauthorised", err.to_string())
                }
                _ => internal(err),
            },
            ApiError::Clinic(err) => match err {
                ClinicError::InvalidInput(message) => {
                    (StatusCode::BAD_REQUEST, "invalid_input", message.clone())
                }
                ClinicError::Text(e) => (StatusCode::BAD_REQUEST, "invalid_input", e.to_string()),
                ClinicError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
                ClinicError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message.clone()),
                ClinicError::InvalidTransition { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_transition",
                    err.to_string(),
                ),
                ClinicError::Unauthorised => {
                    (StatusCode::UNAUTHORIZED, "unauthorised", err.to_string())
                }
                ClinicError::Forbidden(message) => {
                    (StatusCode::FORBIDDEN, "forbidden", message.clone())
                }
                ClinicError::Database(_)
                | ClinicError::Migration(_)
                | ClinicError::PasswordHash(_)
                | ClinicError::Csv(_) => internal(err),
            },
        }
    }
}

fn internal(err: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!("internal error: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        "internal server error".into(),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_client_error() {
            tracing::debug!(%status, code, "request rejected: {}", message);
        }
        (
            status,
            Json(ErrorRes {
                code: code.into(),
                message,
            }),
        )
            .into_response()
    }
}

/// `axum::Json` with rejections reported as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` with rejections reported as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// `axum::extract::Path` with rejections reported as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ClinicError) -> (StatusCode, &'static str) {
        let (status, code, _) = ApiError::from(err).parts();
        (status, code)
    }

    #[test]
    fn clinic_errors_map_to_statuses() {
        assert_eq!(
            status_of(ClinicError::invalid("bad")),
            (StatusCode::BAD_REQUEST, "invalid_input")
        );
        assert_eq!(
            status_of(ClinicError::not_found("patient", 1)),
            (StatusCode::NOT_FOUND, "not_found")
        );
        assert_eq!(
            status_of(ClinicError::Conflict("taken".into())),
            (StatusCode::CONFLICT, "conflict")
        );
        assert_eq!(
            status_of(ClinicError::InvalidTransition {
                entity: "appointment",
                from: "completed".into(),
                to: "cancelled".into(),
            }),
            (StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition")
        );
        assert_eq!(
            status_of(ClinicError::Unauthorised),
            (StatusCode::UNAUTHORIZED, "unauthorised")
        );
        assert_eq!(
            status_of(ClinicError::Forbidden("nope".into())),
            (StatusCode::FORBIDDEN, "forbidden")
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let (status, code, message) =
            ApiError::from(ClinicError::Database(sqlx_error())).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "internal");
        assert_eq!(message, "internal server error");
    }

    #[test]
    fn token_errors_are_unauthorised() {
        let (status, _, _) = ApiError::from(AuthError::Expired).parts();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _, _) = ApiError::from(AuthError::WeakSecret).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn sqlx_error() -> clinic_core::sqlx::Error {
        clinic_core::sqlx::Error::PoolTimedOut
    }
}
