use super::fetch_page;
use crate::models::{Exam, ExamFilter, ExamStatus, Page, PageRequest};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT: &str = "SELECT x.id, x.consultation_id, x.patient_id, x.exam_type_id, \
     t.name AS exam_type_name, x.requested_by, x.status, x.notes, x.result, x.requested_at, \
     x.processed_at, x.processed_by";

const FROM: &str = "FROM exams x JOIN exam_types t ON t.id = x.exam_type_id";

pub async fn insert(
    conn: &mut SqliteConnection,
    consultation_id: i64,
    patient_id: i64,
    exam_type_id: i64,
    requested_by: i64,
    notes: Option<&str>,
) -> ClinicResult<Exam> {
    let id = sqlx::query(
        "INSERT INTO exams (consultation_id, patient_id, exam_type_id, requested_by, status, \
         notes, requested_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(consultation_id)
    .bind(patient_id)
    .bind(exam_type_id)
    .bind(requested_by)
    .bind(ExamStatus::Pending)
    .bind(notes)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    get(conn, id).await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<Exam>> {
    let exam = sqlx::query_as::<_, Exam>(&format!("{SELECT} {FROM} WHERE x.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(exam)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Exam> {
    find(conn, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("exam", id))
}

/// Pending exams of one type already ordered in a consultation.
pub async fn count_pending(
    conn: &mut SqliteConnection,
    consultation_id: i64,
    exam_type_id: i64,
) -> ClinicResult<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM exams WHERE consultation_id = ? AND exam_type_id = ? AND status = ?",
    )
    .bind(consultation_id)
    .bind(exam_type_id)
    .bind(ExamStatus::Pending)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

pub async fn mark_processed(
    conn: &mut SqliteConnection,
    id: i64,
    result: &str,
    processed_by: i64,
) -> ClinicResult<()> {
    let outcome = sqlx::query(
        "UPDATE exams SET status = ?, result = ?, processed_at = ?, processed_by = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(ExamStatus::Processed)
    .bind(result)
    .bind(Utc::now())
    .bind(processed_by)
    .bind(id)
    .bind(ExamStatus::Pending)
    .execute(&mut *conn)
    .await?;
    if outcome.rows_affected() == 0 {
        return Err(ClinicError::Conflict(format!("exam {id} is no longer pending")));
    }
    Ok(())
}

pub async fn mark_cancelled(conn: &mut SqliteConnection, id: i64) -> ClinicResult<()> {
    let outcome = sqlx::query("UPDATE exams SET status = ? WHERE id = ? AND status = ?")
        .bind(ExamStatus::Cancelled)
        .bind(id)
        .bind(ExamStatus::Pending)
        .execute(&mut *conn)
        .await?;
    if outcome.rows_affected() == 0 {
        return Err(ClinicError::Conflict(format!("exam {id} is no longer pending")));
    }
    Ok(())
}

pub async fn list(
    conn: &mut SqliteConnection,
    filter: &ExamFilter,
    page: PageRequest,
) -> ClinicResult<Page<Exam>> {
    // Pending work is served oldest first; history newest first.
    let order_by = if filter.status == Some(ExamStatus::Pending) {
        "x.requested_at ASC, x.id ASC"
    } else {
        "x.requested_at DESC, x.id DESC"
    };
    fetch_page(conn, SELECT, FROM, |qb| push_filter(qb, filter), order_by, page).await
}

pub async fn list_for_patient(conn: &mut SqliteConnection, patient_id: i64) -> ClinicResult<Vec<Exam>> {
    let exams = sqlx::query_as::<_, Exam>(&format!(
        "{SELECT} {FROM} WHERE x.patient_id = ? ORDER BY x.requested_at DESC, x.id DESC"
    ))
    .bind(patient_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(exams)
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ExamFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND x.status = ").push_bind(status);
    }
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND x.patient_id = ").push_bind(patient_id);
    }
    if let Some(consultation_id) = filter.consultation_id {
        qb.push(" AND x.consultation_id = ").push_bind(consultation_id);
    }
}
