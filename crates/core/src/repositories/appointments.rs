use super::fetch_page;
use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, Page, PageRequest};
use crate::{ClinicError, ClinicResult};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT: &str = "SELECT id, patient_id, doctor_id, starts_at, ends_at, reason, status, \
     cancellation_reason, created_by, created_at, updated_at";

pub struct InsertAppointment<'a> {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub reason: Option<&'a str>,
    pub created_by: Option<i64>,
}

pub async fn insert(
    conn: &mut SqliteConnection,
    new: InsertAppointment<'_>,
) -> ClinicResult<Appointment> {
    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO appointments (patient_id, doctor_id, starts_at, ends_at, reason, status, \
         created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(new.patient_id)
    .bind(new.doctor_id)
    .bind(new.starts_at)
    .bind(new.ends_at)
    .bind(new.reason)
    .bind(AppointmentStatus::Scheduled)
    .bind(new.created_by)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    get(conn, id).await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<Appointment>> {
    let appointment =
        sqlx::query_as::<_, Appointment>(&format!("{SELECT} FROM appointments WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(appointment)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Appointment> {
    find(conn, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("appointment", id))
}

/// Move an appointment from `from` to `to`.
///
/// The update is conditional on the current status so a concurrent transition makes this fail
/// with `Conflict` instead of being overwritten.
pub async fn transition(
    conn: &mut SqliteConnection,
    id: i64,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> ClinicResult<()> {
    let result =
        sqlx::query("UPDATE appointments SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(to)
            .bind(Utc::now())
            .bind(id)
            .bind(from)
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::Conflict(format!(
            "appointment {id} is no longer {from}"
        )));
    }
    Ok(())
}

pub async fn cancel(conn: &mut SqliteConnection, id: i64, reason: &str) -> ClinicResult<()> {
    let result = sqlx::query(
        "UPDATE appointments SET status = ?, cancellation_reason = ?, updated_at = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(AppointmentStatus::Cancelled)
    .bind(reason)
    .bind(Utc::now())
    .bind(id)
    .bind(AppointmentStatus::Scheduled)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::Conflict(format!(
            "appointment {id} is no longer scheduled"
        )));
    }
    Ok(())
}

pub async fn reschedule(
    conn: &mut SqliteConnection,
    id: i64,
    starts_at: NaiveDateTime,
    ends_at: NaiveDateTime,
) -> ClinicResult<()> {
    let result = sqlx::query(
        "UPDATE appointments SET starts_at = ?, ends_at = ?, updated_at = ? \
         WHERE id = ? AND status = ?",
    )
    .bind(starts_at)
    .bind(ends_at)
    .bind(Utc::now())
    .bind(id)
    .bind(AppointmentStatus::Scheduled)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::Conflict(format!(
            "appointment {id} is no longer scheduled"
        )));
    }
    Ok(())
}

/// Non-cancelled appointments of `doctor_id` overlapping `[starts_at, ends_at)`.
pub async fn count_doctor_overlaps(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    starts_at: NaiveDateTime,
    ends_at: NaiveDateTime,
    exclude_id: Option<i64>,
) -> ClinicResult<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments \
         WHERE doctor_id = ?1 AND status != ?2 AND starts_at < ?3 AND ends_at > ?4 \
         AND (?5 IS NULL OR id != ?5)",
    )
    .bind(doctor_id)
    .bind(AppointmentStatus::Cancelled)
    .bind(ends_at)
    .bind(starts_at)
    .bind(exclude_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

/// Non-cancelled appointments of `patient_id` starting on `day`.
pub async fn count_patient_on_day(
    conn: &mut SqliteConnection,
    patient_id: i64,
    day: NaiveDate,
    exclude_id: Option<i64>,
) -> ClinicResult<i64> {
    let (day_start, day_end) = day_range(day, day);
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments \
         WHERE patient_id = ?1 AND status != ?2 AND starts_at >= ?3 AND starts_at < ?4 \
         AND (?5 IS NULL OR id != ?5)",
    )
    .bind(patient_id)
    .bind(AppointmentStatus::Cancelled)
    .bind(day_start)
    .bind(day_end)
    .bind(exclude_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

/// Slot-holding appointments of a doctor on one day, ordered by start.
pub async fn booked_for_doctor_on(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    day: NaiveDate,
) -> ClinicResult<Vec<Appointment>> {
    let (day_start, day_end) = day_range(day, day);
    let appointments = sqlx::query_as::<_, Appointment>(&format!(
        "{SELECT} FROM appointments WHERE doctor_id = ? AND status != ? \
         AND starts_at >= ? AND starts_at < ? ORDER BY starts_at"
    ))
    .bind(doctor_id)
    .bind(AppointmentStatus::Cancelled)
    .bind(day_start)
    .bind(day_end)
    .fetch_all(&mut *conn)
    .await?;
    Ok(appointments)
}

pub async fn list_for_patient(
    conn: &mut SqliteConnection,
    patient_id: i64,
) -> ClinicResult<Vec<Appointment>> {
    let appointments = sqlx::query_as::<_, Appointment>(&format!(
        "{SELECT} FROM appointments WHERE patient_id = ? ORDER BY starts_at DESC"
    ))
    .bind(patient_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(appointments)
}

pub async fn list(
    conn: &mut SqliteConnection,
    filter: &AppointmentFilter,
    page: PageRequest,
) -> ClinicResult<Page<Appointment>> {
    fetch_page(
        conn,
        SELECT,
        "FROM appointments",
        |qb| push_filter(qb, filter),
        "starts_at, id",
        page,
    )
    .await
}

/// Half-open instant range covering the days `from..=to`.
pub(crate) fn day_range(from: NaiveDate, to: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = from.and_time(NaiveTime::MIN);
    let end = to
        .checked_add_days(Days::new(1))
        .unwrap_or(to)
        .and_time(NaiveTime::MIN);
    (start, end)
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AppointmentFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(doctor_id) = filter.doctor_id {
        qb.push(" AND doctor_id = ").push_bind(doctor_id);
    }
    if let Some(patient_id) = filter.patient_id {
        qb.push(" AND patient_id = ").push_bind(patient_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(from) = filter.from {
        qb.push(" AND starts_at >= ").push_bind(day_range(from, from).0);
    }
    if let Some(to) = filter.to {
        qb.push(" AND starts_at < ").push_bind(day_range(to, to).1);
    }
}
