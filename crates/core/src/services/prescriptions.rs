//! Prescriptions issued at the end of a consultation.

use super::{audit_denial, AuditService};
use crate::constants::MAX_PRESCRIPTION_DAYS;
use crate::models::{Actor, AuditEntry, NewPrescriptionItem, Prescription};
use crate::{repositories, validation};
use crate::{ClinicError, ClinicResult};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct PrescriptionService {
    pool: SqlitePool,
    audit: AuditService,
}

impl PrescriptionService {
    pub fn new(pool: SqlitePool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    /// Issue a prescription for a finalised consultation of `doctor`.
    ///
    /// The header and every item are written in one transaction; if any item fails, nothing
    /// is stored.
    pub async fn issue(
        &self,
        doctor: &Actor,
        consultation_id: i64,
        notes: Option<String>,
        items: Vec<NewPrescriptionItem>,
    ) -> ClinicResult<Prescription> {
        if items.is_empty() {
            return Err(ClinicError::invalid("a prescription needs at least one item"));
        }
        let items = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| validate_item(i, item))
            .collect::<ClinicResult<Vec<_>>>()?;
        let notes = validation::optional_text("notes", notes)?;

        let result = self
            .issue_in_tx(doctor, consultation_id, notes.as_deref(), &items)
            .await;
        audit_denial(&self.audit, doctor, "prescription.issue", result).await
    }

    async fn issue_in_tx(
        &self,
        doctor: &Actor,
        consultation_id: i64,
        notes: Option<&str>,
        items: &[NewPrescriptionItem],
    ) -> ClinicResult<Prescription> {
        let mut tx = self.pool.begin().await?;
        let consultation = repositories::consultations::get(&mut tx, consultation_id).await?;
        if consultation.doctor_id != doctor.employee_id {
            return Err(ClinicError::Forbidden(format!(
                "consultation {consultation_id} belongs to another doctor"
            )));
        }
        if consultation.is_open() {
            return Err(ClinicError::Conflict(format!(
                "consultation {consultation_id} must be finalised before prescribing"
            )));
        }

        let id = repositories::prescriptions::insert_header(
            &mut tx,
            consultation_id,
            consultation.patient_id,
            doctor.employee_id,
            notes,
        )
        .await?;
        for item in items {
            repositories::prescriptions::insert_item(&mut tx, id, item).await?;
        }
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(doctor), "prescription.issue")
                .entity("prescription", id)
                .details(format!("{} item(s)", items.len())),
        )
        .await?;
        let prescription = repositories::prescriptions::get(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(prescription_id = id, consultation_id, "prescription issued");
        Ok(prescription)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Prescription> {
        let mut conn = self.pool.acquire().await?;
        repositories::prescriptions::get(&mut conn, id).await
    }

    pub async fn list_for_patient(&self, patient_id: i64) -> ClinicResult<Vec<Prescription>> {
        let mut conn = self.pool.acquire().await?;
        repositories::patients::get(&mut conn, patient_id).await?;
        repositories::prescriptions::list_for_patient(&mut conn, patient_id).await
    }

    pub async fn list_for_consultation(
        &self,
        consultation_id: i64,
    ) -> ClinicResult<Vec<Prescription>> {
        let mut conn = self.pool.acquire().await?;
        repositories::consultations::get(&mut conn, consultation_id).await?;
        repositories::prescriptions::list_for_consultation(&mut conn, consultation_id).await
    }
}

fn validate_item(index: usize, item: NewPrescriptionItem) -> ClinicResult<NewPrescriptionItem> {
    let field = |name: &str| format!("items[{index}].{name}");
    if !(1..=MAX_PRESCRIPTION_DAYS).contains(&item.duration_days) {
        return Err(ClinicError::invalid(format!(
            "{} must be between 1 and {MAX_PRESCRIPTION_DAYS}",
            field("duration_days")
        )));
    }
    Ok(NewPrescriptionItem {
        medication: validation::required_text(&field("medication"), &item.medication)?,
        dosage: validation::required_text(&field("dosage"), &item.dosage)?,
        frequency: validation::required_text(&field("frequency"), &item.frequency)?,
        duration_days: item.duration_days,
        instructions: validation::optional_text(&field("instructions"), item.instructions)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Consultation, ConsultationNotes, Employee, SystemRole};
    use crate::services::test_support::*;
    use crate::services::Clinic;

    fn item(medication: &str, days: u32) -> NewPrescriptionItem {
        NewPrescriptionItem {
            medication: medication.into(),
            dosage: "500 mg".into(),
            frequency: "twice daily".into(),
            duration_days: days,
            instructions: Some("after food".into()),
        }
    }

    async fn consultation(clinic: &Clinic, doctor: &Employee, finalise: bool) -> Consultation {
        let patient = patient(clinic, "AB-1234").await;
        let booked = appointment(clinic, doctor, patient.id, "2099-06-01 10:00").await;
        let me = actor_for(doctor);
        let consultation = clinic.consultations.start(&me, booked.id).await.unwrap();
        if !finalise {
            return consultation;
        }
        clinic
            .consultations
            .update_notes(
                &me,
                consultation.id,
                ConsultationNotes {
                    diagnosis: Some("bacterial sinusitis".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        clinic.consultations.finalise(&me, consultation.id).await.unwrap()
    }

    #[tokio::test]
    async fn issue_stores_header_and_items() {
        let clinic = clinic().await;
        let doctor = employee(&clinic, "doc@clinic.org", SystemRole::Doctor).await;
        let consultation = consultation(&clinic, &doctor, true).await;

        let prescription = clinic
            .prescriptions
            .issue(
                &actor_for(&doctor),
                consultation.id,
                Some("review in a week".into()),
                vec![item("Amoxicillin", 7), item("Paracetamol", 3)],
            )
            .await
            .unwrap();
        assert_eq!(prescription.items.len(), 2);
        assert_eq!(prescription.items[0].medication, "Amoxicillin");
        assert_eq!(prescription.patient_id, consultation.patient_id);

        let fetched = clinic.prescriptions.get(prescription.id).await.unwrap();
        assert_eq!(fetched, prescription);
        assert_eq!(
            clinic
                .prescriptions
                .list_for_patient(consultation.patient_id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn item_rules() {
        let clinic = clinic().await;
        let doctor = employee(&clinic, "doc@clinic.org", SystemRole::Doctor).await;
        let consultation = consultation(&clinic, &doctor, true).await;
        let me = actor_for(&doctor);

        for items in [
            vec![],
            vec![item("Amoxicillin", 0)],
            vec![item("Amoxicillin", 366)],
            vec![item("  ", 7)],
        ] {
            let err = clinic
                .prescriptions
                .issue(&me, consultation.id, None, items)
                .await
                .unwrap_err();
            assert!(matches!(err, ClinicError::InvalidInput(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn requires_finalised_own_consultation() {
        let clinic = clinic().await;
        let doctor = employee(&clinic, "doc@clinic.org", SystemRole::Doctor).await;
        let open = consultation(&clinic, &doctor, false).await;

        let err = clinic
            .prescriptions
            .issue(&actor_for(&doctor), open.id, None, vec![item("Ibuprofen", 5)])
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));

        let other = employee(&clinic, "other@clinic.org", SystemRole::Doctor).await;
        let err = clinic
            .prescriptions
            .issue(&actor_for(&other), open.id, None, vec![item("Ibuprofen", 5)])
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Forbidden(_)));
    }

    #[tokio::test]
    async fn failing_item_rolls_back_the_prescription() {
        let (clinic, pool) = clinic_with_pool().await;
        let doctor = employee(&clinic, "doc@clinic.org", SystemRole::Doctor).await;
        let consultation = consultation(&clinic, &doctor, true).await;

        sqlx::query(
            "CREATE TRIGGER reject_item BEFORE INSERT ON prescription_items \
             WHEN NEW.medication = 'Withdrawn' BEGIN SELECT RAISE(ABORT, 'withdrawn drug'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = clinic
            .prescriptions
            .issue(
                &actor_for(&doctor),
                consultation.id,
                None,
                vec![item("Amoxicillin", 7), item("Withdrawn", 7)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Database(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prescriptions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(clinic
            .prescriptions
            .list_for_consultation(consultation.id)
            .await
            .unwrap()
            .is_empty());
    }
}
