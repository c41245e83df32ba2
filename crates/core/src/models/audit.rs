use super::Actor;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub employee_id: Option<i64>,
    pub action: String,
    pub entity: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
    pub success: bool,
    pub occurred_at: DateTime<Utc>,
}

/// An audit record about to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    pub employee_id: Option<i64>,
    pub action: String,
    pub entity: Option<&'static str>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
    pub success: bool,
}

impl AuditEntry {
    pub fn new(actor: Option<&Actor>, action: impl Into<String>) -> Self {
        Self {
            employee_id: actor.map(|a| a.employee_id),
            action: action.into(),
            entity: None,
            entity_id: None,
            details: None,
            success: true,
        }
    }

    pub fn entity(mut self, entity: &'static str, id: i64) -> Self {
        self.entity = Some(entity);
        self.entity_id = Some(id);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct AuditFilter {
    pub employee_id: Option<i64>,
    /// Matches actions starting with this prefix, e.g. `appointment.`.
    pub action_prefix: Option<String>,
    pub success: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
