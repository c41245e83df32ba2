//! Patient records.

use crate::models::{
    Actor, AuditEntry, NewPatient, Page, PageRequest, Patient, PatientFilter, PatientHistory,
    UpdatePatient,
};
use crate::{repositories, validation};
use crate::ClinicResult;
use crate::config::clinic_today;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct PatientService {
    pool: SqlitePool,
}

impl PatientService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a patient. The national id must not already be on file.
    pub async fn create(&self, actor: &Actor, new: NewPatient) -> ClinicResult<Patient> {
        let new = NewPatient {
            first_name: validation::name("first_name", &new.first_name)?,
            last_name: validation::name("last_name", &new.last_name)?,
            national_id: validation::national_id(&new.national_id)?,
            birth_date: validation::birth_date(new.birth_date, clinic_today())?,
            gender: new.gender,
            phone: validation::optional_phone(new.phone)?,
            email: validation::optional_email(new.email)?,
            address: validation::optional_text("address", new.address)?,
            blood_type: validation::optional_blood_type(new.blood_type)?,
            allergies: validation::optional_text("allergies", new.allergies)?,
        };

        let mut tx = self.pool.begin().await?;
        let patient = repositories::patients::insert(&mut tx, &new).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "patient.create").entity("patient", patient.id),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(patient_id = patient.id, "registered patient");
        Ok(patient)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Patient> {
        let mut conn = self.pool.acquire().await?;
        repositories::patients::get(&mut conn, id).await
    }

    pub async fn search(
        &self,
        filter: &PatientFilter,
        page: PageRequest,
    ) -> ClinicResult<Page<Patient>> {
        let filter = PatientFilter {
            search: filter
                .search
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            active: filter.active,
        };
        let mut conn = self.pool.acquire().await?;
        repositories::patients::search(&mut conn, &filter, page).await
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: i64,
        update: UpdatePatient,
    ) -> ClinicResult<Patient> {
        let update = UpdatePatient {
            first_name: validation::name("first_name", &update.first_name)?,
            last_name: validation::name("last_name", &update.last_name)?,
            birth_date: validation::birth_date(update.birth_date, clinic_today())?,
            gender: update.gender,
            phone: validation::optional_phone(update.phone)?,
            email: validation::optional_email(update.email)?,
            address: validation::optional_text("address", update.address)?,
            blood_type: validation::optional_blood_type(update.blood_type)?,
            allergies: validation::optional_text("allergies", update.allergies)?,
        };

        let mut tx = self.pool.begin().await?;
        let patient = repositories::patients::update(&mut tx, id, &update).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "patient.update").entity("patient", id),
        )
        .await?;
        tx.commit().await?;
        Ok(patient)
    }

    /// Soft-delete a patient. Their records stay readable; new appointments are refused.
    pub async fn deactivate(&self, actor: &Actor, id: i64) -> ClinicResult<Patient> {
        let mut tx = self.pool.begin().await?;
        repositories::patients::set_active(&mut tx, id, false).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "patient.deactivate").entity("patient", id),
        )
        .await?;
        let patient = repositories::patients::get(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(patient_id = id, "deactivated patient");
        Ok(patient)
    }

    pub async fn history(&self, id: i64) -> ClinicResult<PatientHistory> {
        let mut conn = self.pool.acquire().await?;
        let patient = repositories::patients::get(&mut conn, id).await?;
        let appointments = repositories::appointments::list_for_patient(&mut conn, id).await?;
        let consultations = repositories::consultations::list_for_patient(&mut conn, id).await?;
        let exams = repositories::exams::list_for_patient(&mut conn, id).await?;
        let prescriptions = repositories::prescriptions::list_for_patient(&mut conn, id).await?;

        Ok(PatientHistory {
            patient,
            appointments,
            consultations,
            exams,
            prescriptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use crate::services::test_support::*;
    use crate::ClinicError;

    #[tokio::test]
    async fn create_normalises_fields() {
        let clinic = clinic().await;
        let patient = patient(&clinic, "ab-1234").await;
        assert_eq!(patient.national_id, "AB-1234");
        assert_eq!(patient.blood_type.as_deref(), Some("O+"));
        assert!(patient.active);
    }

    #[tokio::test]
    async fn national_id_is_unique() {
        let clinic = clinic().await;
        patient(&clinic, "AB-1234").await;
        let err = clinic
            .patients
            .create(&system_actor(), new_patient("ab-1234"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }

    #[tokio::test]
    async fn rejects_future_birth_date_and_bad_email() {
        let clinic = clinic().await;
        let mut new = new_patient("ZZ-0001");
        new.birth_date = date("2999-01-01");
        assert!(matches!(
            clinic.patients.create(&system_actor(), new).await.unwrap_err(),
            ClinicError::InvalidInput(_)
        ));

        let mut new = new_patient("ZZ-0002");
        new.email = Some("not-an-email".into());
        assert!(matches!(
            clinic.patients.create(&system_actor(), new).await.unwrap_err(),
            ClinicError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn birth_date_is_checked_against_the_clinic_calendar() {
        let clinic = clinic().await;
        let mut born_today = new_patient("ZZ-0003");
        born_today.birth_date = clinic_today();
        assert!(clinic.patients.create(&system_actor(), born_today).await.is_ok());

        let mut tomorrow = new_patient("ZZ-0004");
        tomorrow.birth_date = clinic_today().succ_opt().unwrap();
        assert!(matches!(
            clinic.patients.create(&system_actor(), tomorrow).await.unwrap_err(),
            ClinicError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn search_wildcards_match_literally() {
        let clinic = clinic().await;
        patient(&clinic, "AB-1111").await;
        let mut odd = new_patient("CD-2222");
        odd.last_name = "100%_Smith".into();
        clinic.patients.create(&system_actor(), odd).await.unwrap();

        let search = |term: &str| PatientFilter {
            search: Some(term.into()),
            ..Default::default()
        };
        for (term, expected) in [("%", 1), ("_", 1), ("%_S", 1), ("0_S", 0), ("\\", 0)] {
            let found = clinic
                .patients
                .search(&search(term), PageRequest::default())
                .await
                .unwrap();
            assert_eq!(found.total, expected, "search for {term:?}");
        }
    }

    #[tokio::test]
    async fn search_matches_names_and_national_id() {
        let clinic = clinic().await;
        patient(&clinic, "AB-1111").await;
        let mut other = new_patient("CD-2222");
        other.first_name = "Charles".into();
        other.last_name = "Babbage".into();
        clinic.patients.create(&system_actor(), other).await.unwrap();

        let by_name = clinic
            .patients
            .search(
                &PatientFilter {
                    search: Some("babb".into()),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(by_name.total, 1);
        assert_eq!(by_name.items[0].last_name, "Babbage");

        let by_id = clinic
            .patients
            .search(
                &PatientFilter {
                    search: Some("ab-11".into()),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(by_id.total, 1);

        let all = clinic
            .patients
            .search(&PatientFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        // Ordered by last name.
        assert_eq!(all.items[0].last_name, "Babbage");
    }

    #[tokio::test]
    async fn update_and_deactivate() {
        let clinic = clinic().await;
        let created = patient(&clinic, "AB-1234").await;

        let updated = clinic
            .patients
            .update(
                &system_actor(),
                created.id,
                UpdatePatient {
                    first_name: "Augusta".into(),
                    last_name: "King".into(),
                    birth_date: created.birth_date,
                    gender: Gender::Female,
                    phone: None,
                    email: None,
                    address: Some("12 St James's Square".into()),
                    blood_type: None,
                    allergies: Some("penicillin".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name(), "Augusta King");
        assert_eq!(updated.national_id, "AB-1234");

        let deactivated = clinic.patients.deactivate(&system_actor(), created.id).await.unwrap();
        assert!(!deactivated.active);

        let active_only = clinic
            .patients
            .search(
                &PatientFilter {
                    active: Some(true),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(active_only.total, 0);
    }

    #[tokio::test]
    async fn unknown_patient_is_not_found() {
        let clinic = clinic().await;
        assert!(matches!(
            clinic.patients.history(404).await.unwrap_err(),
            ClinicError::NotFound { entity: "patient", id: 404 }
        ));
    }
}
