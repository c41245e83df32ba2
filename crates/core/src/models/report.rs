use chrono::NaiveDate;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub scheduled: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub total: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DoctorWorkload {
    pub doctor_id: i64,
    pub doctor_name: String,
    pub scheduled: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub total: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ExamTypeSummary {
    pub exam_type_id: i64,
    pub exam_type_name: String,
    pub pending: i64,
    pub processed: i64,
    pub cancelled: i64,
}
