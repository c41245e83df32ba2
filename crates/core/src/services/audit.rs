//! Compliance audit trail.
//!
//! Mutating services write their audit entry inside their own transaction through
//! [`crate::repositories::audit::insert`]. This service covers the entries that must survive a
//! rolled-back operation (authorisation denials, failed logins) and reading the trail.

use crate::models::{Actor, AuditEntry, AuditFilter, AuditLog, Page, PageRequest};
use crate::repositories;
use crate::{ClinicError, ClinicResult};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AuditService {
    pool: SqlitePool,
}

impl AuditService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write a standalone audit entry on its own connection.
    pub async fn record(&self, entry: AuditEntry) -> ClinicResult<()> {
        let mut conn = self.pool.acquire().await?;
        repositories::audit::insert(&mut conn, &entry).await
    }

    /// Record that `actor` was refused `action`.
    ///
    /// Failures to write are logged rather than returned: the caller is already reporting the
    /// denial and must not turn it into a server error.
    pub async fn record_denied(&self, actor: Option<&Actor>, action: &str, reason: &str) {
        tracing::warn!(
            employee_id = actor.map(|a| a.employee_id),
            action,
            "authorisation denied: {}",
            reason
        );
        let entry = AuditEntry::new(actor, "authorisation.denied")
            .details(format!("{action}: {reason}"))
            .failed();
        if let Err(e) = self.record(entry).await {
            tracing::error!("failed to write audit entry: {}", e);
        }
    }

    pub async fn list(&self, filter: &AuditFilter, page: PageRequest) -> ClinicResult<Page<AuditLog>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(ClinicError::invalid("'from' must not be after 'to'"));
            }
        }
        let mut conn = self.pool.acquire().await?;
        repositories::audit::list(&mut conn, filter, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::*;

    #[tokio::test]
    async fn denial_is_recorded_as_failure() {
        let clinic = clinic().await;
        let actor = Actor::new(12, "receptionist");
        clinic
            .audit
            .record_denied(Some(&actor), "employees.create", "admin role required")
            .await;

        let page = clinic
            .audit
            .list(
                &AuditFilter {
                    action_prefix: Some("authorisation.".into()),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        let entry = &page.items[0];
        assert_eq!(entry.employee_id, Some(12));
        assert!(!entry.success);
        assert_eq!(
            entry.details.as_deref(),
            Some("employees.create: admin role required")
        );
    }

    #[tokio::test]
    async fn list_filters_by_outcome_and_orders_newest_first() {
        let clinic = clinic().await;
        clinic
            .audit
            .record(AuditEntry::new(None, "auth.login").entity("employee", 1))
            .await
            .unwrap();
        clinic
            .audit
            .record(AuditEntry::new(None, "auth.login_failed").failed())
            .await
            .unwrap();
        clinic
            .audit
            .record(AuditEntry::new(None, "auth.login").entity("employee", 2))
            .await
            .unwrap();

        let successes = clinic
            .audit
            .list(
                &AuditFilter {
                    success: Some(true),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();

        assert_eq!(successes.total, 2);
        assert_eq!(successes.items[0].entity_id, Some(2));
        assert_eq!(successes.items[1].entity_id, Some(1));
    }
}
