//! Employee authentication.
//!
//! Token issuing is an API concern (`api-shared`); this service only checks credentials and
//! resolves the current state of an authenticated employee.

use crate::models::{Actor, AuditEntry, Employee};
use crate::{password, repositories, validation};
use crate::{ClinicError, ClinicResult};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
}

impl AuthService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Verify an email/password pair.
    ///
    /// Unknown email, wrong password and deactivated accounts are indistinguishable to the
    /// caller (`Unauthorised`); the audit trail records which one happened.
    pub async fn login(&self, email: &str, password: &str) -> ClinicResult<Employee> {
        let mut conn = self.pool.acquire().await?;

        let normalised = validation::email(email).unwrap_or_else(|_| email.trim().to_lowercase());
        let credentials = repositories::employees::find_credentials(&mut conn, &normalised).await?;

        let stored_hash = match &credentials {
            Some((employee, hash)) if employee.active => Some(hash.as_str()),
            _ => None,
        };
        let password_ok = password::verify(password, stored_hash).await;

        let failure = match &credentials {
            None => Some("unknown email"),
            Some((employee, _)) if !employee.active => Some("inactive account"),
            Some(_) if !password_ok => Some("wrong password"),
            Some(_) => None,
        };

        if let Some(reason) = failure {
            let employee_id = credentials.as_ref().map(|(e, _)| e.id);
            tracing::warn!(employee_id, "login failed: {}", reason);
            let mut entry = AuditEntry::new(None, "auth.login_failed")
                .details(format!("{normalised}: {reason}"))
                .failed();
            entry.employee_id = employee_id;
            repositories::audit::insert(&mut conn, &entry).await?;
            return Err(ClinicError::Unauthorised);
        }

        let (employee, _) = credentials.ok_or(ClinicError::Unauthorised)?;
        let actor = Actor::new(employee.id, employee.role_name.clone());
        repositories::audit::insert(
            &mut conn,
            &AuditEntry::new(Some(&actor), "auth.login").entity("employee", employee.id),
        )
        .await?;
        tracing::info!(employee_id = employee.id, "employee logged in");

        Ok(employee)
    }

    /// Resolve the actor for an authenticated employee id, rejecting removed or deactivated
    /// accounts. The role is read from the database so role changes apply immediately.
    pub async fn authenticate(&self, employee_id: i64) -> ClinicResult<Actor> {
        let employee = self.current(employee_id).await?;
        Ok(Actor::new(employee.id, employee.role_name))
    }

    pub async fn current(&self, employee_id: i64) -> ClinicResult<Employee> {
        let mut conn = self.pool.acquire().await?;
        match repositories::employees::find(&mut conn, employee_id).await? {
            Some(employee) if employee.active => Ok(employee),
            _ => Err(ClinicError::Unauthorised),
        }
    }
}
