use super::appointments::day_range;
use crate::models::{AppointmentStatus, DoctorWorkload, ExamStatus, ExamTypeSummary};
use crate::ClinicResult;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqliteConnection;

/// One appointment flattened for export.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct AppointmentExportRow {
    pub id: i64,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub patient_name: String,
    pub national_id: String,
    pub doctor_name: String,
    pub reason: Option<String>,
    pub cancellation_reason: Option<String>,
}

pub async fn appointment_status_counts(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    to: NaiveDate,
    doctor_id: Option<i64>,
) -> ClinicResult<Vec<(AppointmentStatus, i64)>> {
    let (start, end) = day_range(from, to);
    let counts = sqlx::query_as(
        "SELECT status, COUNT(*) FROM appointments \
         WHERE starts_at >= ?1 AND starts_at < ?2 AND (?3 IS NULL OR doctor_id = ?3) \
         GROUP BY status",
    )
    .bind(start)
    .bind(end)
    .bind(doctor_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(counts)
}

pub async fn doctor_workload(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> ClinicResult<Vec<DoctorWorkload>> {
    let (start, end) = day_range(from, to);
    let rows = sqlx::query_as::<_, DoctorWorkload>(
        "SELECT e.id AS doctor_id, e.first_name || ' ' || e.last_name AS doctor_name, \
         COALESCE(SUM(CASE WHEN a.status IN (?3, ?4) THEN 1 ELSE 0 END), 0) AS scheduled, \
         COALESCE(SUM(CASE WHEN a.status = ?5 THEN 1 ELSE 0 END), 0) AS completed, \
         COALESCE(SUM(CASE WHEN a.status = ?6 THEN 1 ELSE 0 END), 0) AS cancelled, \
         COUNT(a.id) AS total \
         FROM employees e \
         JOIN roles r ON r.id = e.role_id AND r.name = 'doctor' \
         LEFT JOIN appointments a ON a.doctor_id = e.id AND a.starts_at >= ?1 AND a.starts_at < ?2 \
         WHERE e.active = 1 \
         GROUP BY e.id, e.first_name, e.last_name \
         ORDER BY total DESC, doctor_name",
    )
    .bind(start)
    .bind(end)
    .bind(AppointmentStatus::Scheduled)
    .bind(AppointmentStatus::InProgress)
    .bind(AppointmentStatus::Completed)
    .bind(AppointmentStatus::Cancelled)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn exam_summary(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> ClinicResult<Vec<ExamTypeSummary>> {
    let (start, end) = day_range(from, to);
    // exams.requested_at is a UTC timestamp; compare on its date part.
    let rows = sqlx::query_as::<_, ExamTypeSummary>(
        "SELECT t.id AS exam_type_id, t.name AS exam_type_name, \
         COALESCE(SUM(CASE WHEN x.status = ?3 THEN 1 ELSE 0 END), 0) AS pending, \
         COALESCE(SUM(CASE WHEN x.status = ?4 THEN 1 ELSE 0 END), 0) AS processed, \
         COALESCE(SUM(CASE WHEN x.status = ?5 THEN 1 ELSE 0 END), 0) AS cancelled \
         FROM exam_types t \
         LEFT JOIN exams x ON x.exam_type_id = t.id \
           AND date(x.requested_at) >= date(?1) AND date(x.requested_at) < date(?2) \
         GROUP BY t.id, t.name \
         ORDER BY t.name",
    )
    .bind(start)
    .bind(end)
    .bind(ExamStatus::Pending)
    .bind(ExamStatus::Processed)
    .bind(ExamStatus::Cancelled)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn appointments_for_export(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> ClinicResult<Vec<AppointmentExportRow>> {
    let (start, end) = day_range(from, to);
    let rows = sqlx::query_as::<_, AppointmentExportRow>(
        "SELECT a.id, a.starts_at, a.ends_at, a.status, \
         p.first_name || ' ' || p.last_name AS patient_name, p.national_id, \
         d.first_name || ' ' || d.last_name AS doctor_name, a.reason, a.cancellation_reason \
         FROM appointments a \
         JOIN patients p ON p.id = a.patient_id \
         JOIN employees d ON d.id = a.doctor_id \
         WHERE a.starts_at >= ? AND a.starts_at < ? \
         ORDER BY a.starts_at, a.id",
    )
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
