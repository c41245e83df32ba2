//! Operational reports over a date range (inclusive on both ends).

use crate::models::{AppointmentStatus, AppointmentSummary, DoctorWorkload, ExamTypeSummary};
use crate::repositories;
use crate::{ClinicError, ClinicResult};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::io::Write;

const CSV_HEADER: [&str; 9] = [
    "id",
    "starts_at",
    "ends_at",
    "status",
    "patient",
    "national_id",
    "doctor",
    "reason",
    "cancellation_reason",
];

#[derive(Clone)]
pub struct ReportService {
    pool: SqlitePool,
}

impl ReportService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn appointment_summary(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        doctor_id: Option<i64>,
    ) -> ClinicResult<AppointmentSummary> {
        check_range(from, to)?;
        let mut conn = self.pool.acquire().await?;
        let counts =
            repositories::reports::appointment_status_counts(&mut conn, from, to, doctor_id).await?;

        let mut summary = AppointmentSummary {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        };
        for (status, count) in counts {
            match status {
                AppointmentStatus::Scheduled => summary.scheduled = count,
                AppointmentStatus::InProgress => summary.in_progress = count,
                AppointmentStatus::Completed => summary.completed = count,
                AppointmentStatus::Cancelled => summary.cancelled = count,
            }
            summary.total += count;
        }
        Ok(summary)
    }

    pub async fn doctor_workload(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ClinicResult<Vec<DoctorWorkload>> {
        check_range(from, to)?;
        let mut conn = self.pool.acquire().await?;
        repositories::reports::doctor_workload(&mut conn, from, to).await
    }

    pub async fn exam_summary(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ClinicResult<Vec<ExamTypeSummary>> {
        check_range(from, to)?;
        let mut conn = self.pool.acquire().await?;
        repositories::reports::exam_summary(&mut conn, from, to).await
    }

    /// Write every appointment in the range as CSV to `out`. Returns the number of data rows.
    pub async fn write_appointments_csv<W: Write>(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        out: W,
    ) -> ClinicResult<usize> {
        check_range(from, to)?;
        let rows = {
            let mut conn = self.pool.acquire().await?;
            repositories::reports::appointments_for_export(&mut conn, from, to).await?
        };

        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(CSV_HEADER)?;
        for row in &rows {
            writer.write_record([
                row.id.to_string(),
                row.starts_at.format("%Y-%m-%d %H:%M").to_string(),
                row.ends_at.format("%Y-%m-%d %H:%M").to_string(),
                row.status.to_string(),
                row.patient_name.clone(),
                row.national_id.clone(),
                row.doctor_name.clone(),
                row.reason.clone().unwrap_or_default(),
                row.cancellation_reason.clone().unwrap_or_default(),
            ])?;
        }
        writer
            .flush()
            .map_err(|e| ClinicError::Csv(csv::Error::from(e)))?;

        tracing::info!(%from, %to, rows = rows.len(), "exported appointments");
        Ok(rows.len())
    }

    /// The appointment export as an in-memory CSV document.
    pub async fn appointments_csv(&self, from: NaiveDate, to: NaiveDate) -> ClinicResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_appointments_csv(from, to, &mut buffer).await?;
        Ok(buffer)
    }
}

fn check_range(from: NaiveDate, to: NaiveDate) -> ClinicResult<()> {
    if from > to {
        return Err(ClinicError::invalid("'from' must not be after 'to'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SystemRole;
    use crate::services::test_support::*;
    use chrono::Utc;

    #[tokio::test]
    async fn summary_and_workload_count_by_status() {
        let clinic = clinic().await;
        let busy = employee(&clinic, "busy@clinic.org", SystemRole::Doctor).await;
        let idle = employee(&clinic, "idle@clinic.org", SystemRole::Doctor).await;
        let first = patient(&clinic, "AB-0001").await;
        let second = patient(&clinic, "AB-0002").await;

        appointment(&clinic, &busy, first.id, "2099-06-01 09:00").await;
        let cancelled = appointment(&clinic, &busy, second.id, "2099-06-01 10:00").await;
        clinic
            .appointments
            .cancel(&actor_for(&busy), cancelled.id, "rebooked")
            .await
            .unwrap();
        // Outside the range.
        appointment(&clinic, &busy, first.id, "2099-06-08 09:00").await;

        let from = date("2099-06-01");
        let to = date("2099-06-07");
        let summary = clinic.reports.appointment_summary(from, to, None).await.unwrap();
        assert_eq!(summary.scheduled, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.total, 2);

        let only_idle = clinic
            .reports
            .appointment_summary(from, to, Some(idle.id))
            .await
            .unwrap();
        assert_eq!(only_idle.total, 0);

        let workload = clinic.reports.doctor_workload(from, to).await.unwrap();
        assert_eq!(workload.len(), 2);
        assert_eq!(workload[0].doctor_id, busy.id);
        assert_eq!(workload[0].scheduled, 1);
        assert_eq!(workload[0].cancelled, 1);
        assert_eq!(workload[1].total, 0);
    }

    #[tokio::test]
    async fn exam_summary_lists_every_type() {
        let clinic = clinic().await;
        let admin = system_actor();
        clinic.exams.create_type(&admin, "Lipid panel", None).await.unwrap();
        clinic.exams.create_type(&admin, "Urinalysis", None).await.unwrap();

        let today = Utc::now().date_naive();
        let summary = clinic.reports.exam_summary(today, today).await.unwrap();
        assert_eq!(summary.len(), 2);
        assert!(summary.iter().all(|s| s.pending == 0 && s.processed == 0));
    }

    #[tokio::test]
    async fn csv_export_has_header_and_rows() {
        let clinic = clinic().await;
        let doctor = employee(&clinic, "doc@clinic.org", SystemRole::Doctor).await;
        let patient = patient(&clinic, "AB-1234").await;
        appointment(&clinic, &doctor, patient.id, "2099-06-01 09:00").await;

        let bytes = clinic
            .reports
            .appointments_csv(date("2099-06-01"), date("2099-06-01"))
            .await
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "id,starts_at,ends_at,status,patient,national_id,doctor,reason,cancellation_reason"
        );
        assert!(lines[1].contains("2099-06-01 09:00,2099-06-01 09:30,scheduled,Ada Lovelace,AB-1234"));
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let clinic = clinic().await;
        let err = clinic
            .reports
            .doctor_workload(date("2099-06-02"), date("2099-06-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }
}
