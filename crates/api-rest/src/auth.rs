//! Request authentication and role checks.

use crate::error::ApiError;
use crate::AppState;
use api_shared::auth::{bearer_token, verify_token};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use clinic_core::models::{Actor, SystemRole};
use clinic_core::ClinicError;

/// The employee making the request, resolved from the bearer token.
///
/// The token only identifies the employee; the account is re-read on every request so a
/// deactivated employee or a changed role takes effect before the token expires.
pub struct CurrentEmployee(pub Actor);

#[async_trait]
impl FromRequestParts<AppState> for CurrentEmployee {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = bearer_token(header)?;
        let claims = verify_token(&state.auth, token)?;
        let actor = state.clinic.auth.authenticate(claims.sub).await?;
        Ok(CurrentEmployee(actor))
    }
}

impl CurrentEmployee {
    pub fn actor(&self) -> &Actor {
        &self.0
    }

    /// Allow the request only for the given roles.
    ///
    /// A refusal is written to the audit trail as `authorisation.denied` with `action`.
    pub async fn require(
        &self,
        state: &AppState,
        action: &str,
        roles: &[SystemRole],
    ) -> Result<&Actor, ApiError> {
        if self.0.has_any_role(roles) {
            return Ok(&self.0);
        }
        let allowed = roles
            .iter()
            .map(SystemRole::as_str)
            .collect::<Vec<_>>()
            .join(" or ");
        let reason = format!("requires role {allowed}");
        state.clinic.audit.record_denied(Some(&self.0), action, &reason).await;
        Err(ClinicError::Forbidden(reason).into())
    }
}
