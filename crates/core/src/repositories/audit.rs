use super::fetch_page;
use crate::models::{AuditEntry, AuditFilter, AuditLog, Page, PageRequest};
use crate::ClinicResult;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT: &str =
    "SELECT id, employee_id, action, entity, entity_id, details, success, occurred_at";

pub async fn insert(conn: &mut SqliteConnection, entry: &AuditEntry) -> ClinicResult<()> {
    sqlx::query(
        "INSERT INTO audit_logs (employee_id, action, entity, entity_id, details, success, \
         occurred_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.employee_id)
    .bind(&entry.action)
    .bind(entry.entity)
    .bind(entry.entity_id)
    .bind(&entry.details)
    .bind(entry.success)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn list(
    conn: &mut SqliteConnection,
    filter: &AuditFilter,
    page: PageRequest,
) -> ClinicResult<Page<AuditLog>> {
    fetch_page(
        conn,
        SELECT,
        "FROM audit_logs",
        |qb| push_filter(qb, filter),
        "occurred_at DESC, id DESC",
        page,
    )
    .await
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AuditFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(employee_id) = filter.employee_id {
        qb.push(" AND employee_id = ").push_bind(employee_id);
    }
    if let Some(prefix) = filter.action_prefix.as_deref().filter(|p| !p.is_empty()) {
        // substr comparison avoids LIKE wildcards hidden in the prefix.
        qb.push(" AND substr(action, 1, ")
            .push_bind(prefix.chars().count() as i64)
            .push(") = ")
            .push_bind(prefix.to_string());
    }
    if let Some(success) = filter.success {
        qb.push(" AND success = ").push_bind(success);
    }
    if let Some(from) = filter.from {
        qb.push(" AND occurred_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND occurred_at <= ").push_bind(to);
    }
}
