use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ExamType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ExamStatus {
    Pending,
    Processed,
    Cancelled,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Pending => "pending",
            ExamStatus::Processed => "processed",
            ExamStatus::Cancelled => "cancelled",
        }
    }

    /// pending → processed | cancelled; both outcomes are final.
    pub fn can_transition_to(&self, next: ExamStatus) -> bool {
        matches!(
            (self, next),
            (ExamStatus::Pending, ExamStatus::Processed) | (ExamStatus::Pending, ExamStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Exam {
    pub id: i64,
    pub consultation_id: i64,
    pub patient_id: i64,
    pub exam_type_id: i64,
    pub exam_type_name: String,
    pub requested_by: i64,
    pub status: ExamStatus,
    pub notes: Option<String>,
    pub result: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct ExamFilter {
    pub status: Option<ExamStatus>,
    pub patient_id: Option<i64>,
    pub consultation_id: Option<i64>,
}
