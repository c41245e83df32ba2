use crate::models::{NewPrescriptionItem, Prescription, PrescriptionItem};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use sqlx::SqliteConnection;

const SELECT: &str =
    "SELECT id, consultation_id, patient_id, doctor_id, notes, issued_at FROM prescriptions";

/// Insert the prescription header row and return its id.
pub async fn insert_header(
    conn: &mut SqliteConnection,
    consultation_id: i64,
    patient_id: i64,
    doctor_id: i64,
    notes: Option<&str>,
) -> ClinicResult<i64> {
    let id = sqlx::query(
        "INSERT INTO prescriptions (consultation_id, patient_id, doctor_id, notes, issued_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(consultation_id)
    .bind(patient_id)
    .bind(doctor_id)
    .bind(notes)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn insert_item(
    conn: &mut SqliteConnection,
    prescription_id: i64,
    item: &NewPrescriptionItem,
) -> ClinicResult<()> {
    sqlx::query(
        "INSERT INTO prescription_items (prescription_id, medication, dosage, frequency, \
         duration_days, instructions) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(prescription_id)
    .bind(&item.medication)
    .bind(&item.dosage)
    .bind(&item.frequency)
    .bind(i64::from(item.duration_days))
    .bind(&item.instructions)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<Prescription>> {
    let header = sqlx::query_as::<_, Prescription>(&format!("{SELECT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match header {
        Some(mut prescription) => {
            prescription.items = items_of(conn, prescription.id).await?;
            Ok(Some(prescription))
        }
        None => Ok(None),
    }
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Prescription> {
    find(conn, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("prescription", id))
}

pub async fn list_for_patient(
    conn: &mut SqliteConnection,
    patient_id: i64,
) -> ClinicResult<Vec<Prescription>> {
    let headers = sqlx::query_as::<_, Prescription>(&format!(
        "{SELECT} WHERE patient_id = ? ORDER BY issued_at DESC, id DESC"
    ))
    .bind(patient_id)
    .fetch_all(&mut *conn)
    .await?;
    with_items(conn, headers).await
}

pub async fn list_for_consultation(
    conn: &mut SqliteConnection,
    consultation_id: i64,
) -> ClinicResult<Vec<Prescription>> {
    let headers = sqlx::query_as::<_, Prescription>(&format!(
        "{SELECT} WHERE consultation_id = ? ORDER BY issued_at DESC, id DESC"
    ))
    .bind(consultation_id)
    .fetch_all(&mut *conn)
    .await?;
    with_items(conn, headers).await
}

async fn items_of(
    conn: &mut SqliteConnection,
    prescription_id: i64,
) -> ClinicResult<Vec<PrescriptionItem>> {
    let items = sqlx::query_as::<_, PrescriptionItem>(
        "SELECT id, prescription_id, medication, dosage, frequency, duration_days, instructions \
         FROM prescription_items WHERE prescription_id = ? ORDER BY id",
    )
    .bind(prescription_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

async fn with_items(
    conn: &mut SqliteConnection,
    headers: Vec<Prescription>,
) -> ClinicResult<Vec<Prescription>> {
    let mut prescriptions = Vec::with_capacity(headers.len());
    for mut prescription in headers {
        prescription.items = items_of(conn, prescription.id).await?;
        prescriptions.push(prescription);
    }
    Ok(prescriptions)
}
