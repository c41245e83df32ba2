use crate::models::{Consultation, ConsultationNotes, ConsultationStatus};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use sqlx::SqliteConnection;

const SELECT: &str = "SELECT id, appointment_id, patient_id, doctor_id, symptoms, diagnosis, \
     treatment, notes, status, started_at, finalised_at FROM consultations";

pub async fn insert(
    conn: &mut SqliteConnection,
    appointment_id: i64,
    patient_id: i64,
    doctor_id: i64,
) -> ClinicResult<Consultation> {
    let id = sqlx::query(
        "INSERT INTO consultations (appointment_id, patient_id, doctor_id, status, started_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(appointment_id)
    .bind(patient_id)
    .bind(doctor_id)
    .bind(ConsultationStatus::Open)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    get(conn, id).await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<Consultation>> {
    let consultation = sqlx::query_as::<_, Consultation>(&format!("{SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(consultation)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Consultation> {
    find(conn, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("consultation", id))
}

pub async fn find_by_appointment(
    conn: &mut SqliteConnection,
    appointment_id: i64,
) -> ClinicResult<Option<Consultation>> {
    let consultation =
        sqlx::query_as::<_, Consultation>(&format!("{SELECT} WHERE appointment_id = ?"))
            .bind(appointment_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(consultation)
}

pub async fn list_for_patient(
    conn: &mut SqliteConnection,
    patient_id: i64,
) -> ClinicResult<Vec<Consultation>> {
    let consultations = sqlx::query_as::<_, Consultation>(&format!(
        "{SELECT} WHERE patient_id = ? ORDER BY started_at DESC"
    ))
    .bind(patient_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(consultations)
}

/// Overwrite the clinical notes of an open consultation; `None` fields keep their value.
pub async fn update_notes(
    conn: &mut SqliteConnection,
    id: i64,
    notes: &ConsultationNotes,
) -> ClinicResult<()> {
    let result = sqlx::query(
        "UPDATE consultations SET symptoms = COALESCE(?, symptoms), \
         diagnosis = COALESCE(?, diagnosis), treatment = COALESCE(?, treatment), \
         notes = COALESCE(?, notes) WHERE id = ? AND status = ?",
    )
    .bind(&notes.symptoms)
    .bind(&notes.diagnosis)
    .bind(&notes.treatment)
    .bind(&notes.notes)
    .bind(id)
    .bind(ConsultationStatus::Open)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::Conflict(format!(
            "consultation {id} is no longer open"
        )));
    }
    Ok(())
}

pub async fn finalise(conn: &mut SqliteConnection, id: i64) -> ClinicResult<()> {
    let result = sqlx::query(
        "UPDATE consultations SET status = ?, finalised_at = ? WHERE id = ? AND status = ?",
    )
    .bind(ConsultationStatus::Finalised)
    .bind(Utc::now())
    .bind(id)
    .bind(ConsultationStatus::Open)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::Conflict(format!(
            "consultation {id} is no longer open"
        )));
    }
    Ok(())
}
