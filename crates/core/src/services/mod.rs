//! Application services: validation and business rules on top of the repositories.
//!
//! Services own a pool handle and the startup configuration. Every mutating operation runs in
//! one database transaction together with its audit entry, so a failure at any step leaves no
//! partial writes behind.

pub mod appointments;
pub mod audit;
pub mod auth;
pub mod consultations;
pub mod employees;
pub mod exams;
pub mod patients;
pub mod prescriptions;
pub mod reports;
pub mod roles;
pub mod specialties;

pub use appointments::{AppointmentService, ScheduleRequest};
pub use audit::AuditService;
pub use auth::AuthService;
pub use consultations::ConsultationService;
pub use employees::EmployeeService;
pub use exams::ExamService;
pub use patients::PatientService;
pub use prescriptions::PrescriptionService;
pub use reports::ReportService;
pub use roles::RoleService;
pub use specialties::SpecialtyService;

use crate::config::CoreConfig;
use crate::models::{Actor, PageRequest};
use crate::{ClinicError, ClinicResult};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Every clinic service, sharing one pool and configuration.
#[derive(Clone)]
pub struct Clinic {
    cfg: Arc<CoreConfig>,
    pool: SqlitePool,
    pub appointments: AppointmentService,
    pub audit: AuditService,
    pub auth: AuthService,
    pub consultations: ConsultationService,
    pub employees: EmployeeService,
    pub exams: ExamService,
    pub patients: PatientService,
    pub prescriptions: PrescriptionService,
    pub reports: ReportService,
    pub roles: RoleService,
    pub specialties: SpecialtyService,
}

impl Clinic {
    pub fn new(pool: SqlitePool, cfg: Arc<CoreConfig>) -> Self {
        let audit = AuditService::new(pool.clone());
        Self {
            appointments: AppointmentService::new(pool.clone(), cfg.clone()),
            auth: AuthService::new(pool.clone()),
            consultations: ConsultationService::new(pool.clone(), audit.clone()),
            employees: EmployeeService::new(pool.clone()),
            exams: ExamService::new(pool.clone(), audit.clone()),
            patients: PatientService::new(pool.clone()),
            prescriptions: PrescriptionService::new(pool.clone(), audit.clone()),
            reports: ReportService::new(pool.clone()),
            roles: RoleService::new(pool.clone()),
            specialties: SpecialtyService::new(pool.clone()),
            audit,
            cfg,
            pool,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Normalise client paging parameters against the configured maximum.
    pub fn page_request(&self, page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        PageRequest::new(page, page_size, self.cfg.max_page_size())
    }

    /// Round-trip a trivial query to confirm the store is reachable.
    pub async fn ping(&self) -> ClinicResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Record an authorisation-denied audit entry when `result` is `Forbidden`, then pass it on.
pub(crate) async fn audit_denial<T>(
    audit: &AuditService,
    actor: &Actor,
    action: &str,
    result: ClinicResult<T>,
) -> ClinicResult<T> {
    if let Err(ClinicError::Forbidden(reason)) = &result {
        audit.record_denied(Some(actor), action, reason).await;
    }
    result
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the service tests.

    use super::{Clinic, ScheduleRequest};
    use crate::config::{ClinicHours, CoreConfig};
    use crate::models::{
        Actor, Appointment, Employee, Gender, NewEmployee, NewPatient, Patient, SystemRole,
    };
    use crate::db;
    use chrono::{NaiveDate, NaiveDateTime};
    use sqlx::SqlitePool;
    use std::sync::Arc;

    pub async fn clinic() -> Clinic {
        clinic_with_pool().await.0
    }

    /// A clinic plus a handle on its pool, for tests that need to tamper with rows directly.
    pub async fn clinic_with_pool() -> (Clinic, SqlitePool) {
        let pool = db::in_memory().await.expect("in-memory database");
        let cfg = CoreConfig::new("sqlite::memory:".into(), ClinicHours::default(), 30)
            .expect("CoreConfig::new should succeed");
        (Clinic::new(pool.clone(), Arc::new(cfg)), pool)
    }

    pub fn at(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M").expect("valid datetime")
    }

    pub fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    pub fn system_actor() -> Actor {
        Actor::new(0, SystemRole::Admin.as_str())
    }

    pub fn actor_for(employee: &Employee) -> Actor {
        Actor::new(employee.id, employee.role_name.clone())
    }

    pub async fn role_id(clinic: &Clinic, role: SystemRole) -> i64 {
        clinic
            .roles
            .find_by_name(role.as_str())
            .await
            .expect("query")
            .expect("system role seeded")
            .id
    }

    pub async fn specialty(clinic: &Clinic, name: &str) -> i64 {
        clinic
            .specialties
            .create(&system_actor(), name, None)
            .await
            .expect("specialty created")
            .id
    }

    pub async fn employee(clinic: &Clinic, email: &str, role: SystemRole) -> Employee {
        let specialty_id = if role == SystemRole::Doctor {
            Some(specialty(clinic, &format!("Specialty for {email}")).await)
        } else {
            None
        };
        clinic
            .employees
            .create(
                &system_actor(),
                NewEmployee {
                    first_name: "Test".into(),
                    last_name: email.split('@').next().unwrap_or("Employee").into(),
                    email: email.into(),
                    phone: None,
                    role_id: role_id(clinic, role).await,
                    specialty_id,
                    license_number: None,
                    password: "password123".into(),
                },
            )
            .await
            .expect("employee created")
    }

    pub fn new_patient(national_id: &str) -> NewPatient {
        NewPatient {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            national_id: national_id.into(),
            birth_date: date("1985-12-10"),
            gender: Gender::Female,
            phone: Some("+44 20 7946 0018".into()),
            email: Some("ada@example.org".into()),
            address: None,
            blood_type: Some("o+".into()),
            allergies: None,
        }
    }

    pub async fn patient(clinic: &Clinic, national_id: &str) -> Patient {
        clinic
            .patients
            .create(&system_actor(), new_patient(national_id))
            .await
            .expect("patient created")
    }

    /// Book `patient_id` with `doctor` at `start` for the default length.
    pub async fn appointment(
        clinic: &Clinic,
        doctor: &Employee,
        patient_id: i64,
        start: &str,
    ) -> Appointment {
        clinic
            .appointments
            .schedule(
                &actor_for(doctor),
                ScheduleRequest {
                    patient_id,
                    doctor_id: doctor.id,
                    starts_at: at(start),
                    duration_minutes: None,
                    reason: None,
                },
            )
            .await
            .expect("appointment scheduled")
    }
}
