//! Consultations: the clinical record of an appointment.
//!
//! Starting a consultation moves its appointment to `in_progress`; finalising moves it to
//! `completed`. Both sides change in one transaction. Only the doctor the appointment is booked
//! with may act on it, and refusals are written to the audit trail.

use super::{audit_denial, AuditService};
use crate::models::{
    Actor, AppointmentStatus, AuditEntry, Consultation, ConsultationNotes,
};
use crate::{repositories, validation};
use crate::{ClinicError, ClinicResult};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct ConsultationService {
    pool: SqlitePool,
    audit: AuditService,
}

impl ConsultationService {
    pub fn new(pool: SqlitePool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    pub async fn start(&self, doctor: &Actor, appointment_id: i64) -> ClinicResult<Consultation> {
        let result = self.start_in_tx(doctor, appointment_id).await;
        audit_denial(&self.audit, doctor, "consultation.start", result).await
    }

    async fn start_in_tx(&self, doctor: &Actor, appointment_id: i64) -> ClinicResult<Consultation> {
        let mut tx = self.pool.begin().await?;
        let appointment = repositories::appointments::get(&mut tx, appointment_id).await?;
        if appointment.doctor_id != doctor.employee_id {
            return Err(ClinicError::Forbidden(format!(
                "appointment {appointment_id} is booked with another doctor"
            )));
        }
        if !appointment.status.can_transition_to(AppointmentStatus::InProgress) {
            return Err(ClinicError::InvalidTransition {
                entity: "appointment",
                from: appointment.status.to_string(),
                to: AppointmentStatus::InProgress.to_string(),
            });
        }

        repositories::appointments::transition(
            &mut tx,
            appointment_id,
            AppointmentStatus::Scheduled,
            AppointmentStatus::InProgress,
        )
        .await?;
        let consultation = repositories::consultations::insert(
            &mut tx,
            appointment_id,
            appointment.patient_id,
            appointment.doctor_id,
        )
        .await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(doctor), "consultation.start")
                .entity("consultation", consultation.id)
                .details(format!("appointment {appointment_id}")),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            consultation_id = consultation.id,
            appointment_id,
            "consultation started"
        );
        Ok(consultation)
    }

    pub async fn update_notes(
        &self,
        doctor: &Actor,
        id: i64,
        notes: ConsultationNotes,
    ) -> ClinicResult<Consultation> {
        let notes = ConsultationNotes {
            symptoms: validation::optional_text("symptoms", notes.symptoms)?,
            diagnosis: validation::optional_text("diagnosis", notes.diagnosis)?,
            treatment: validation::optional_text("treatment", notes.treatment)?,
            notes: validation::optional_text("notes", notes.notes)?,
        };
        let result = self.update_notes_in_tx(doctor, id, &notes).await;
        audit_denial(&self.audit, doctor, "consultation.update", result).await
    }

    async fn update_notes_in_tx(
        &self,
        doctor: &Actor,
        id: i64,
        notes: &ConsultationNotes,
    ) -> ClinicResult<Consultation> {
        let mut tx = self.pool.begin().await?;
        let consultation = repositories::consultations::get(&mut tx, id).await?;
        ensure_own_and_open(doctor, &consultation)?;

        repositories::consultations::update_notes(&mut tx, id, notes).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(doctor), "consultation.update").entity("consultation", id),
        )
        .await?;
        let consultation = repositories::consultations::get(&mut tx, id).await?;
        tx.commit().await?;
        Ok(consultation)
    }

    /// Close the consultation and complete its appointment. A diagnosis must be on record.
    pub async fn finalise(&self, doctor: &Actor, id: i64) -> ClinicResult<Consultation> {
        let result = self.finalise_in_tx(doctor, id).await;
        audit_denial(&self.audit, doctor, "consultation.finalise", result).await
    }

    async fn finalise_in_tx(&self, doctor: &Actor, id: i64) -> ClinicResult<Consultation> {
        let mut tx = self.pool.begin().await?;
        let consultation = repositories::consultations::get(&mut tx, id).await?;
        ensure_own_and_open(doctor, &consultation)?;
        if consultation.diagnosis.is_none() {
            return Err(ClinicError::invalid(
                "a diagnosis is required to finalise a consultation",
            ));
        }

        repositories::consultations::finalise(&mut tx, id).await?;
        repositories::appointments::transition(
            &mut tx,
            consultation.appointment_id,
            AppointmentStatus::InProgress,
            AppointmentStatus::Completed,
        )
        .await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(doctor), "consultation.finalise").entity("consultation", id),
        )
        .await?;
        let consultation = repositories::consultations::get(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(consultation_id = id, "consultation finalised");
        Ok(consultation)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Consultation> {
        let mut conn = self.pool.acquire().await?;
        repositories::consultations::get(&mut conn, id).await
    }

    pub async fn get_by_appointment(&self, appointment_id: i64) -> ClinicResult<Consultation> {
        let mut conn = self.pool.acquire().await?;
        repositories::appointments::get(&mut conn, appointment_id).await?;
        repositories::consultations::find_by_appointment(&mut conn, appointment_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("consultation for appointment", appointment_id))
    }

    pub async fn list_for_patient(&self, patient_id: i64) -> ClinicResult<Vec<Consultation>> {
        let mut conn = self.pool.acquire().await?;
        repositories::patients::get(&mut conn, patient_id).await?;
        repositories::consultations::list_for_patient(&mut conn, patient_id).await
    }
}

fn ensure_own_and_open(doctor: &Actor, consultation: &Consultation) -> ClinicResult<()> {
    if consultation.doctor_id != doctor.employee_id {
        return Err(ClinicError::Forbidden(format!(
            "consultation {} belongs to another doctor",
            consultation.id
        )));
    }
    if !consultation.is_open() {
        return Err(ClinicError::Conflict(format!(
            "consultation {} is already {}",
            consultation.id,
            consultation.status.as_str()
        )));
    }
    Ok(())
}
