use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ConsultationStatus {
    Open,
    Finalised,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Open => "open",
            ConsultationStatus::Finalised => "finalised",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Consultation {
    pub id: i64,
    pub appointment_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub status: ConsultationStatus,
    pub started_at: DateTime<Utc>,
    pub finalised_at: Option<DateTime<Utc>>,
}

impl Consultation {
    pub fn is_open(&self) -> bool {
        self.status == ConsultationStatus::Open
    }
}

/// Clinical notes written during a consultation. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct ConsultationNotes {
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}
