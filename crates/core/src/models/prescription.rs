use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Prescription {
    pub id: i64,
    pub consultation_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub notes: Option<String>,
    pub issued_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<PrescriptionItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct PrescriptionItem {
    pub id: i64,
    pub prescription_id: i64,
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i64,
    pub instructions: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewPrescriptionItem {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: u32,
    pub instructions: Option<String>,
}
