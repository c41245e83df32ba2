//! Appointment scheduling.
//!
//! Times are clinic-local and stored without an offset. Every booking is checked against the
//! clinic's opening hours, the doctor's other appointments and the patient's other appointments
//! on the same day. The conflict checks and the write share one transaction.

use crate::config::{clinic_now, CoreConfig};
use crate::constants::{MAX_APPOINTMENT_MINUTES, MIN_APPOINTMENT_MINUTES};
use crate::models::{
    Actor, Appointment, AppointmentFilter, AppointmentStatus, AuditEntry, Page, PageRequest,
    SystemRole, TimeSlot,
};
use crate::repositories::appointments::InsertAppointment;
use crate::{repositories, validation};
use crate::{ClinicError, ClinicResult};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;

/// A request to book a patient with a doctor.
#[derive(Clone, Debug)]
pub struct ScheduleRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub starts_at: NaiveDateTime,
    /// Falls back to the configured default length.
    pub duration_minutes: Option<u32>,
    pub reason: Option<String>,
}

#[derive(Clone)]
pub struct AppointmentService {
    pool: SqlitePool,
    cfg: Arc<CoreConfig>,
}

impl AppointmentService {
    pub fn new(pool: SqlitePool, cfg: Arc<CoreConfig>) -> Self {
        Self { pool, cfg }
    }

    pub async fn schedule(&self, actor: &Actor, request: ScheduleRequest) -> ClinicResult<Appointment> {
        let reason = validation::optional_text("reason", request.reason)?;
        let (starts_at, ends_at) = self.check_slot(request.starts_at, request.duration_minutes)?;

        let mut tx = self.pool.begin().await?;
        ensure_active_patient(&mut tx, request.patient_id).await?;
        ensure_active_doctor(&mut tx, request.doctor_id).await?;
        ensure_free(&mut tx, request.doctor_id, request.patient_id, starts_at, ends_at, None).await?;

        let appointment = repositories::appointments::insert(
            &mut tx,
            InsertAppointment {
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                starts_at,
                ends_at,
                reason: reason.as_deref(),
                created_by: Some(actor.employee_id),
            },
        )
        .await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "appointment.create")
                .entity("appointment", appointment.id)
                .details(format!("doctor {} at {}", appointment.doctor_id, appointment.starts_at)),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            appointment_id = appointment.id,
            doctor_id = appointment.doctor_id,
            patient_id = appointment.patient_id,
            "scheduled appointment at {}",
            appointment.starts_at
        );
        Ok(appointment)
    }

    /// Move a scheduled appointment. The length is kept unless a new one is given.
    pub async fn reschedule(
        &self,
        actor: &Actor,
        id: i64,
        starts_at: NaiveDateTime,
        duration_minutes: Option<u32>,
    ) -> ClinicResult<Appointment> {
        let mut tx = self.pool.begin().await?;
        let existing = repositories::appointments::get(&mut tx, id).await?;
        if existing.status != AppointmentStatus::Scheduled {
            return Err(ClinicError::InvalidTransition {
                entity: "appointment",
                from: existing.status.to_string(),
                to: "rescheduled".into(),
            });
        }

        let minutes = match duration_minutes {
            Some(m) => m,
            None => u32::try_from(existing.duration_minutes())
                .map_err(|_| ClinicError::invalid("stored appointment length is invalid"))?,
        };
        let (starts_at, ends_at) = self.check_slot(starts_at, Some(minutes))?;
        ensure_free(
            &mut tx,
            existing.doctor_id,
            existing.patient_id,
            starts_at,
            ends_at,
            Some(id),
        )
        .await?;

        repositories::appointments::reschedule(&mut tx, id, starts_at, ends_at).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "appointment.reschedule")
                .entity("appointment", id)
                .details(format!("{} -> {}", existing.starts_at, starts_at)),
        )
        .await?;
        let appointment = repositories::appointments::get(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(appointment_id = id, "rescheduled appointment to {}", starts_at);
        Ok(appointment)
    }

    pub async fn cancel(&self, actor: &Actor, id: i64, reason: &str) -> ClinicResult<Appointment> {
        let reason = validation::required_text("reason", reason)?;

        let mut tx = self.pool.begin().await?;
        let existing = repositories::appointments::get(&mut tx, id).await?;
        if !existing.status.can_transition_to(AppointmentStatus::Cancelled) {
            return Err(ClinicError::InvalidTransition {
                entity: "appointment",
                from: existing.status.to_string(),
                to: AppointmentStatus::Cancelled.to_string(),
            });
        }
        repositories::appointments::cancel(&mut tx, id, &reason).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "appointment.cancel")
                .entity("appointment", id)
                .details(&reason),
        )
        .await?;
        let appointment = repositories::appointments::get(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(appointment_id = id, "cancelled appointment");
        Ok(appointment)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Appointment> {
        let mut conn = self.pool.acquire().await?;
        repositories::appointments::get(&mut conn, id).await
    }

    pub async fn list(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> ClinicResult<Page<Appointment>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(ClinicError::invalid("'from' must not be after 'to'"));
            }
        }
        let mut conn = self.pool.acquire().await?;
        repositories::appointments::list(&mut conn, filter, page).await
    }

    /// Free slots of `duration_minutes` for a doctor on `date`, in order.
    ///
    /// Candidates start at opening time and advance by the slot length; a candidate that
    /// collides with a booking restarts at the end of that booking. Slots that have already
    /// started are left out.
    pub async fn available_slots(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        duration_minutes: Option<u32>,
    ) -> ClinicResult<Vec<TimeSlot>> {
        let minutes = self.duration(duration_minutes)?;
        let mut conn = self.pool.acquire().await?;
        ensure_active_doctor(&mut conn, doctor_id).await?;

        let Some((open, close)) = self.cfg.clinic_hours().day_bounds(date) else {
            return Ok(Vec::new());
        };
        let booked = repositories::appointments::booked_for_doctor_on(&mut conn, doctor_id, date).await?;
        let now = clinic_now();
        let length = Duration::minutes(i64::from(minutes));

        let mut slots = Vec::new();
        let mut cursor = open;
        while cursor + length <= close {
            let end = cursor + length;
            match booked
                .iter()
                .find(|b| b.starts_at < end && b.ends_at > cursor)
            {
                Some(clash) => cursor = clash.ends_at.max(cursor + Duration::minutes(1)),
                None => {
                    if cursor > now {
                        slots.push(TimeSlot {
                            starts_at: cursor,
                            ends_at: end,
                        });
                    }
                    cursor = end;
                }
            }
        }
        Ok(slots)
    }

    fn duration(&self, duration_minutes: Option<u32>) -> ClinicResult<u32> {
        let minutes = duration_minutes.unwrap_or(self.cfg.appointment_minutes());
        if !(MIN_APPOINTMENT_MINUTES..=MAX_APPOINTMENT_MINUTES).contains(&minutes) {
            return Err(ClinicError::invalid(format!(
                "duration must be between {MIN_APPOINTMENT_MINUTES} and {MAX_APPOINTMENT_MINUTES} minutes"
            )));
        }
        Ok(minutes)
    }

    /// Checks that need no database: length, whole minutes, future start, opening hours.
    fn check_slot(
        &self,
        starts_at: NaiveDateTime,
        duration_minutes: Option<u32>,
    ) -> ClinicResult<(NaiveDateTime, NaiveDateTime)> {
        let minutes = self.duration(duration_minutes)?;
        if starts_at.second() != 0 || starts_at.nanosecond() != 0 {
            return Err(ClinicError::invalid("appointment times must be whole minutes"));
        }
        if starts_at <= clinic_now() {
            return Err(ClinicError::invalid("appointment must start in the future"));
        }

        let ends_at = starts_at + Duration::minutes(i64::from(minutes));
        let hours = self.cfg.clinic_hours();
        if !hours.contains(starts_at, ends_at) {
            return Err(ClinicError::invalid(format!(
                "appointment {starts_at} - {ends_at} is outside clinic hours ({} - {} on working days)",
                hours.opens_at().format("%H:%M"),
                hours.closes_at().format("%H:%M")
            )));
        }
        Ok((starts_at, ends_at))
    }
}

async fn ensure_active_patient(conn: &mut SqliteConnection, patient_id: i64) -> ClinicResult<()> {
    let patient = repositories::patients::get(conn, patient_id).await?;
    if !patient.active {
        return Err(ClinicError::invalid(format!("patient {patient_id} is inactive")));
    }
    Ok(())
}

async fn ensure_active_doctor(conn: &mut SqliteConnection, doctor_id: i64) -> ClinicResult<()> {
    let doctor = repositories::employees::find(conn, doctor_id)
        .await?
        .ok_or_else(|| ClinicError::not_found("doctor", doctor_id))?;
    if doctor.role_name != SystemRole::Doctor.as_str() {
        return Err(ClinicError::invalid(format!("employee {doctor_id} is not a doctor")));
    }
    if !doctor.active {
        return Err(ClinicError::invalid(format!("doctor {doctor_id} is inactive")));
    }
    Ok(())
}

async fn ensure_free(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    patient_id: i64,
    starts_at: NaiveDateTime,
    ends_at: NaiveDateTime,
    exclude_id: Option<i64>,
) -> ClinicResult<()> {
    let overlaps = repositories::appointments::count_doctor_overlaps(
        conn, doctor_id, starts_at, ends_at, exclude_id,
    )
    .await?;
    if overlaps > 0 {
        tracing::warn!(doctor_id, "double booking refused at {}", starts_at);
        return Err(ClinicError::Conflict(format!(
            "doctor {doctor_id} already has an appointment between {starts_at} and {ends_at}"
        )));
    }

    let same_day = repositories::appointments::count_patient_on_day(
        conn,
        patient_id,
        starts_at.date(),
        exclude_id,
    )
    .await?;
    if same_day > 0 {
        return Err(ClinicError::Conflict(format!(
            "patient {patient_id} already has an appointment on {}",
            starts_at.date()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Employee;
    use crate::services::test_support::*;
    use crate::services::Clinic;

    struct Fixture {
        clinic: Clinic,
        desk: Actor,
        doctor: Employee,
        patient_id: i64,
    }

    async fn fixture() -> Fixture {
        let clinic = clinic().await;
        let receptionist = employee(&clinic, "desk@clinic.org", SystemRole::Receptionist).await;
        let doctor = employee(&clinic, "doc@clinic.org", SystemRole::Doctor).await;
        let patient_id = patient(&clinic, "AB-1234").await.id;
        Fixture {
            clinic,
            desk: actor_for(&receptionist),
            doctor,
            patient_id,
        }
    }

    fn request(f: &Fixture, start: &str, minutes: Option<u32>) -> ScheduleRequest {
        ScheduleRequest {
            patient_id: f.patient_id,
            doctor_id: f.doctor.id,
            starts_at: at(start),
            duration_minutes: minutes,
            reason: Some("Check-up".into()),
        }
    }

    #[tokio::test]
    async fn schedule_uses_default_length() {
        let f = fixture().await;
        let appointment = f
            .clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 09:00", None))
            .await
            .unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert_eq!(appointment.ends_at, at("2099-06-01 09:30"));
        assert_eq!(appointment.created_by, Some(f.desk.employee_id));
    }

    #[tokio::test]
    async fn rejects_out_of_hours_past_and_odd_lengths() {
        let f = fixture().await;
        let cases = [
            request(&f, "2099-06-01 07:30", None),
            request(&f, "2099-06-01 17:45", None),
            request(&f, "2099-06-06 10:00", None),
            request(&f, "2001-06-04 10:00", None),
            request(&f, "2099-06-01 10:00", Some(5)),
            request(&f, "2099-06-01 10:00", Some(300)),
        ];
        for case in cases {
            let err = f.clinic.appointments.schedule(&f.desk, case).await.unwrap_err();
            assert!(matches!(err, ClinicError::InvalidInput(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn prevents_double_booking_the_doctor() {
        let f = fixture().await;
        f.clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 09:00", Some(60)))
            .await
            .unwrap();

        let other_patient = patient(&f.clinic, "CD-5678").await;
        let mut clash = request(&f, "2099-06-01 09:30", None);
        clash.patient_id = other_patient.id;
        let err = f.clinic.appointments.schedule(&f.desk, clash).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));

        // Back-to-back is fine.
        let mut adjacent = request(&f, "2099-06-01 10:00", None);
        adjacent.patient_id = other_patient.id;
        f.clinic.appointments.schedule(&f.desk, adjacent).await.unwrap();
    }

    #[tokio::test]
    async fn one_appointment_per_patient_per_day() {
        let f = fixture().await;
        f.clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 09:00", None))
            .await
            .unwrap();

        let second_doctor = employee(&f.clinic, "doc2@clinic.org", SystemRole::Doctor).await;
        let mut same_day = request(&f, "2099-06-01 15:00", None);
        same_day.doctor_id = second_doctor.id;
        let err = f.clinic.appointments.schedule(&f.desk, same_day).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancelled_appointments_free_the_slot() {
        let f = fixture().await;
        let first = f
            .clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 09:00", None))
            .await
            .unwrap();

        assert!(matches!(
            f.clinic.appointments.cancel(&f.desk, first.id, "  ").await.unwrap_err(),
            ClinicError::InvalidInput(_)
        ));
        let cancelled = f
            .clinic
            .appointments
            .cancel(&f.desk, first.id, "patient unwell")
            .await
            .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("patient unwell"));

        f.clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 09:00", None))
            .await
            .unwrap();

        let err = f
            .clinic
            .appointments
            .cancel(&f.desk, first.id, "again")
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn schedule_requires_a_doctor_and_active_patient() {
        let f = fixture().await;
        let mut to_receptionist = request(&f, "2099-06-01 09:00", None);
        to_receptionist.doctor_id = f.desk.employee_id;
        assert!(matches!(
            f.clinic.appointments.schedule(&f.desk, to_receptionist).await.unwrap_err(),
            ClinicError::InvalidInput(_)
        ));

        f.clinic
            .patients
            .deactivate(&system_actor(), f.patient_id)
            .await
            .unwrap();
        assert!(matches!(
            f.clinic
                .appointments
                .schedule(&f.desk, request(&f, "2099-06-01 09:00", None))
                .await
                .unwrap_err(),
            ClinicError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn reschedule_ignores_its_own_slot() {
        let f = fixture().await;
        let appointment = f
            .clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 09:00", Some(60)))
            .await
            .unwrap();

        // Overlaps its old self only.
        let moved = f
            .clinic
            .appointments
            .reschedule(&f.desk, appointment.id, at("2099-06-01 09:30"), None)
            .await
            .unwrap();
        assert_eq!(moved.starts_at, at("2099-06-01 09:30"));
        assert_eq!(moved.ends_at, at("2099-06-01 10:30"));

        let err = f
            .clinic
            .appointments
            .reschedule(&f.desk, appointment.id, at("2099-06-01 19:00"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn reschedule_refuses_the_doctors_other_bookings() {
        let f = fixture().await;
        let other_patient = patient(&f.clinic, "CD-5678").await;
        let mut booked = request(&f, "2099-06-01 11:00", Some(60));
        booked.patient_id = other_patient.id;
        f.clinic.appointments.schedule(&f.desk, booked).await.unwrap();

        let mine = f
            .clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 09:00", None))
            .await
            .unwrap();
        let err = f
            .clinic
            .appointments
            .reschedule(&f.desk, mine.id, at("2099-06-01 11:30"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)), "{err}");

        let unchanged = f.clinic.appointments.get(mine.id).await.unwrap();
        assert_eq!(unchanged.starts_at, at("2099-06-01 09:00"));

        f.clinic
            .appointments
            .reschedule(&f.desk, mine.id, at("2099-06-01 12:00"), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reschedule_keeps_one_appointment_per_patient_per_day() {
        let f = fixture().await;
        let second_doctor = employee(&f.clinic, "doc2@clinic.org", SystemRole::Doctor).await;
        let mut tuesday = request(&f, "2099-06-02 14:00", None);
        tuesday.doctor_id = second_doctor.id;
        f.clinic.appointments.schedule(&f.desk, tuesday).await.unwrap();

        let monday = f
            .clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 09:00", None))
            .await
            .unwrap();
        let err = f
            .clinic
            .appointments
            .reschedule(&f.desk, monday.id, at("2099-06-02 09:00"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)), "{err}");
    }

    #[tokio::test]
    async fn only_scheduled_appointments_can_be_rescheduled() {
        let f = fixture().await;
        let cancelled = f
            .clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 09:00", None))
            .await
            .unwrap();
        f.clinic
            .appointments
            .cancel(&f.desk, cancelled.id, "patient unwell")
            .await
            .unwrap();
        let err = f
            .clinic
            .appointments
            .reschedule(&f.desk, cancelled.id, at("2099-06-03 09:00"), None)
            .await
            .unwrap_err();
        assert!(
            matches!(&err, ClinicError::InvalidTransition { from, .. } if from == "cancelled"),
            "{err}"
        );

        let started = f
            .clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-02 09:00", None))
            .await
            .unwrap();
        f.clinic
            .consultations
            .start(&actor_for(&f.doctor), started.id)
            .await
            .unwrap();
        let err = f
            .clinic
            .appointments
            .reschedule(&f.desk, started.id, at("2099-06-04 09:00"), None)
            .await
            .unwrap_err();
        assert!(
            matches!(&err, ClinicError::InvalidTransition { from, .. } if from == "in_progress"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn available_slots_skip_bookings() {
        let f = fixture().await;
        f.clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 08:45", Some(30)))
            .await
            .unwrap();

        let slots = f
            .clinic
            .appointments
            .available_slots(f.doctor.id, date("2099-06-01"), Some(60))
            .await
            .unwrap();
        let starts: Vec<_> = slots.iter().map(|s| s.starts_at).collect();
        assert_eq!(starts[0], at("2099-06-01 09:15"));
        assert_eq!(starts.last().copied(), Some(at("2099-06-01 16:15")));
        assert!(slots.iter().all(|s| s.ends_at <= at("2099-06-01 18:00")));

        let weekend = f
            .clinic
            .appointments
            .available_slots(f.doctor.id, date("2099-06-06"), None)
            .await
            .unwrap();
        assert!(weekend.is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_doctor_and_range() {
        let f = fixture().await;
        f.clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-01 09:00", None))
            .await
            .unwrap();
        f.clinic
            .appointments
            .schedule(&f.desk, request(&f, "2099-06-02 09:00", None))
            .await
            .unwrap();

        let page = f
            .clinic
            .appointments
            .list(
                &AppointmentFilter {
                    doctor_id: Some(f.doctor.id),
                    from: Some(date("2099-06-02")),
                    to: Some(date("2099-06-02")),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].starts_at, at("2099-06-02 09:00"));

        let err = f
            .clinic
            .appointments
            .list(
                &AppointmentFilter {
                    from: Some(date("2099-06-03")),
                    to: Some(date("2099-06-02")),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }
}
