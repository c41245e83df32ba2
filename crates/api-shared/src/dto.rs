//! Transport types for the clinic APIs.
//!
//! Requests convert into the `clinic-core` input types and core rows convert into responses, so
//! handlers never expose persistence details such as password hashes. Status enums keep their
//! core serde representation (snake_case strings) and are documented as strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clinic_core::models::{
    Appointment, AppointmentStatus, AppointmentSummary, AuditLog, Consultation,
    ConsultationNotes, ConsultationStatus, DoctorWorkload, Employee, Exam, ExamStatus, ExamType,
    ExamTypeSummary, Gender, NewEmployee, NewPatient, NewPrescriptionItem, Page, Patient,
    PatientHistory, Prescription, PrescriptionItem, Role, Specialty, TimeSlot, UpdateEmployee,
    UpdatePatient,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    /// Machine readable error kind, e.g. `not_found` or `conflict`.
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[aliases(
    EmployeePage = PageRes<EmployeeRes>,
    PatientPage = PageRes<PatientRes>,
    AppointmentPage = PageRes<AppointmentRes>,
    ExamPage = PageRes<ExamRes>,
    AuditLogPage = PageRes<AuditLogRes>
)]
pub struct PageRes<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PageRes<T> {
    pub fn from_page<U: Into<T>>(page: Page<U>) -> Self {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

// Authentication

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub employee: EmployeeRes,
}

// Specialties and roles

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SpecialtyReq {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to `true`.
    pub active: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SpecialtyRes {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

impl From<Specialty> for SpecialtyRes {
    fn from(s: Specialty) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description,
            active: s.active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleReq {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleRes {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
}

impl From<Role> for RoleRes {
    fn from(r: Role) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            is_system: r.is_system,
        }
    }
}

// Employees

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateEmployeeReq {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role_id: i64,
    /// Required when the role is `doctor`, ignored otherwise.
    pub specialty_id: Option<i64>,
    pub license_number: Option<String>,
    pub password: String,
}

impl From<CreateEmployeeReq> for NewEmployee {
    fn from(r: CreateEmployeeReq) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            phone: r.phone,
            role_id: r.role_id,
            specialty_id: r.specialty_id,
            license_number: r.license_number,
            password: r.password,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateEmployeeReq {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialty_id: Option<i64>,
    pub license_number: Option<String>,
}

impl From<UpdateEmployeeReq> for UpdateEmployee {
    fn from(r: UpdateEmployeeReq) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            phone: r.phone,
            specialty_id: r.specialty_id,
            license_number: r.license_number,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangeRoleReq {
    pub role_id: i64,
    pub specialty_id: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordReq {
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EmployeeRes {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role_id: i64,
    pub role: String,
    pub specialty_id: Option<i64>,
    pub license_number: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Employee> for EmployeeRes {
    fn from(e: Employee) -> Self {
        Self {
            full_name: e.full_name(),
            id: e.id,
            first_name: e.first_name,
            last_name: e.last_name,
            email: e.email,
            phone: e.phone,
            role_id: e.role_id,
            role: e.role_name,
            specialty_id: e.specialty_id,
            license_number: e.license_number,
            active: e.active,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

// Patients

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub birth_date: NaiveDate,
    #[schema(value_type = String, example = "female")]
    pub gender: Gender,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[schema(example = "O+")]
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
}

impl From<CreatePatientReq> for NewPatient {
    fn from(r: CreatePatientReq) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            national_id: r.national_id,
            birth_date: r.birth_date,
            gender: r.gender,
            phone: r.phone,
            email: r.email,
            address: r.address,
            blood_type: r.blood_type,
            allergies: r.allergies,
        }
    }
}

/// Replacement values for a patient. The national id cannot be changed.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePatientReq {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    #[schema(value_type = String, example = "female")]
    pub gender: Gender,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
}

impl From<UpdatePatientReq> for UpdatePatient {
    fn from(r: UpdatePatientReq) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            birth_date: r.birth_date,
            gender: r.gender,
            phone: r.phone,
            email: r.email,
            address: r.address,
            blood_type: r.blood_type,
            allergies: r.allergies,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub birth_date: NaiveDate,
    #[schema(value_type = String)]
    pub gender: Gender,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Patient> for PatientRes {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            first_name: p.first_name,
            last_name: p.last_name,
            national_id: p.national_id,
            birth_date: p.birth_date,
            gender: p.gender,
            phone: p.phone,
            email: p.email,
            address: p.address,
            blood_type: p.blood_type,
            allergies: p.allergies,
            active: p.active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientHistoryRes {
    pub patient: PatientRes,
    pub appointments: Vec<AppointmentRes>,
    pub consultations: Vec<ConsultationRes>,
    pub exams: Vec<ExamRes>,
    pub prescriptions: Vec<PrescriptionRes>,
}

impl From<PatientHistory> for PatientHistoryRes {
    fn from(h: PatientHistory) -> Self {
        Self {
            patient: h.patient.into(),
            appointments: h.appointments.into_iter().map(Into::into).collect(),
            consultations: h.consultations.into_iter().map(Into::into).collect(),
            exams: h.exams.into_iter().map(Into::into).collect(),
            prescriptions: h.prescriptions.into_iter().map(Into::into).collect(),
        }
    }
}

// Appointments

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ScheduleAppointmentReq {
    pub patient_id: i64,
    pub doctor_id: i64,
    /// Clinic-local start time, e.g. `2099-06-01T09:00:00`.
    pub starts_at: NaiveDateTime,
    /// Defaults to the clinic's configured appointment length.
    pub duration_minutes: Option<u32>,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RescheduleAppointmentReq {
    pub starts_at: NaiveDateTime,
    /// Defaults to the appointment's current length.
    pub duration_minutes: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelAppointmentReq {
    pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentRes {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub duration_minutes: i64,
    pub reason: Option<String>,
    #[schema(value_type = String, example = "scheduled")]
    pub status: AppointmentStatus,
    pub cancellation_reason: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentRes {
    fn from(a: Appointment) -> Self {
        Self {
            duration_minutes: a.duration_minutes(),
            id: a.id,
            patient_id: a.patient_id,
            doctor_id: a.doctor_id,
            starts_at: a.starts_at,
            ends_at: a.ends_at,
            reason: a.reason,
            status: a.status,
            cancellation_reason: a.cancellation_reason,
            created_by: a.created_by,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TimeSlotRes {
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
}

impl From<TimeSlot> for TimeSlotRes {
    fn from(s: TimeSlot) -> Self {
        Self {
            starts_at: s.starts_at,
            ends_at: s.ends_at,
        }
    }
}

// Consultations

/// Notes to merge into an open consultation. Omitted fields are left unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ConsultationNotesReq {
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

impl From<ConsultationNotesReq> for ConsultationNotes {
    fn from(r: ConsultationNotesReq) -> Self {
        Self {
            symptoms: r.symptoms,
            diagnosis: r.diagnosis,
            treatment: r.treatment,
            notes: r.notes,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConsultationRes {
    pub id: i64,
    pub appointment_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    #[schema(value_type = String, example = "open")]
    pub status: ConsultationStatus,
    pub started_at: DateTime<Utc>,
    pub finalised_at: Option<DateTime<Utc>>,
}

impl From<Consultation> for ConsultationRes {
    fn from(c: Consultation) -> Self {
        Self {
            id: c.id,
            appointment_id: c.appointment_id,
            patient_id: c.patient_id,
            doctor_id: c.doctor_id,
            symptoms: c.symptoms,
            diagnosis: c.diagnosis,
            treatment: c.treatment,
            notes: c.notes,
            status: c.status,
            started_at: c.started_at,
            finalised_at: c.finalised_at,
        }
    }
}

// Exams

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExamTypeReq {
    pub name: String,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExamTypeRes {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

impl From<ExamType> for ExamTypeRes {
    fn from(t: ExamType) -> Self {
        Self {
            id: t.id,
            name: t.name,
            description: t.description,
            active: t.active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderExamsReq {
    pub exam_type_ids: Vec<i64>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessExamReq {
    pub result: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExamRes {
    pub id: i64,
    pub consultation_id: i64,
    pub patient_id: i64,
    pub exam_type_id: i64,
    pub exam_type_name: String,
    pub requested_by: i64,
    #[schema(value_type = String, example = "pending")]
    pub status: ExamStatus,
    pub notes: Option<String>,
    pub result: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<i64>,
}

impl From<Exam> for ExamRes {
    fn from(e: Exam) -> Self {
        Self {
            id: e.id,
            consultation_id: e.consultation_id,
            patient_id: e.patient_id,
            exam_type_id: e.exam_type_id,
            exam_type_name: e.exam_type_name,
            requested_by: e.requested_by,
            status: e.status,
            notes: e.notes,
            result: e.result,
            requested_at: e.requested_at,
            processed_at: e.processed_at,
            processed_by: e.processed_by,
        }
    }
}

// Prescriptions

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionItemReq {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: u32,
    pub instructions: Option<String>,
}

impl From<PrescriptionItemReq> for NewPrescriptionItem {
    fn from(r: PrescriptionItemReq) -> Self {
        Self {
            medication: r.medication,
            dosage: r.dosage,
            frequency: r.frequency,
            duration_days: r.duration_days,
            instructions: r.instructions,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct IssuePrescriptionReq {
    pub notes: Option<String>,
    pub items: Vec<PrescriptionItemReq>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionItemRes {
    pub id: i64,
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i64,
    pub instructions: Option<String>,
}

impl From<PrescriptionItem> for PrescriptionItemRes {
    fn from(i: PrescriptionItem) -> Self {
        Self {
            id: i.id,
            medication: i.medication,
            dosage: i.dosage,
            frequency: i.frequency,
            duration_days: i.duration_days,
            instructions: i.instructions,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionRes {
    pub id: i64,
    pub consultation_id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub notes: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub items: Vec<PrescriptionItemRes>,
}

impl From<Prescription> for PrescriptionRes {
    fn from(p: Prescription) -> Self {
        Self {
            id: p.id,
            consultation_id: p.consultation_id,
            patient_id: p.patient_id,
            doctor_id: p.doctor_id,
            notes: p.notes,
            issued_at: p.issued_at,
            items: p.items.into_iter().map(Into::into).collect(),
        }
    }
}

// Audit and reports

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditLogRes {
    pub id: i64,
    pub employee_id: Option<i64>,
    pub action: String,
    pub entity: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
    pub success: bool,
    pub occurred_at: DateTime<Utc>,
}

impl From<AuditLog> for AuditLogRes {
    fn from(a: AuditLog) -> Self {
        Self {
            id: a.id,
            employee_id: a.employee_id,
            action: a.action,
            entity: a.entity,
            entity_id: a.entity_id,
            details: a.details,
            success: a.success,
            occurred_at: a.occurred_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentSummaryRes {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub scheduled: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub total: i64,
}

impl From<AppointmentSummary> for AppointmentSummaryRes {
    fn from(s: AppointmentSummary) -> Self {
        Self {
            from: s.from,
            to: s.to,
            scheduled: s.scheduled,
            in_progress: s.in_progress,
            completed: s.completed,
            cancelled: s.cancelled,
            total: s.total,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DoctorWorkloadRes {
    pub doctor_id: i64,
    pub doctor_name: String,
    pub scheduled: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub total: i64,
}

impl From<DoctorWorkload> for DoctorWorkloadRes {
    fn from(w: DoctorWorkload) -> Self {
        Self {
            doctor_id: w.doctor_id,
            doctor_name: w.doctor_name,
            scheduled: w.scheduled,
            completed: w.completed,
            cancelled: w.cancelled,
            total: w.total,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExamTypeSummaryRes {
    pub exam_type_id: i64,
    pub exam_type_name: String,
    pub pending: i64,
    pub processed: i64,
    pub cancelled: i64,
}

impl From<ExamTypeSummary> for ExamTypeSummaryRes {
    fn from(s: ExamTypeSummary) -> Self {
        Self {
            exam_type_id: s.exam_type_id,
            exam_type_name: s.exam_type_name,
            pending: s.pending,
            processed: s.processed,
            cancelled: s.cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::models::PageRequest;

    #[test]
    fn appointment_status_serialises_snake_case() {
        let now = Utc::now();
        let starts_at = NaiveDate::from_ymd_opt(2099, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let res = AppointmentRes::from(Appointment {
            id: 1,
            patient_id: 2,
            doctor_id: 3,
            starts_at,
            ends_at: starts_at + chrono::Duration::minutes(45),
            reason: None,
            status: AppointmentStatus::InProgress,
            cancellation_reason: None,
            created_by: Some(4),
            created_at: now,
            updated_at: now,
        });

        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["duration_minutes"], 45);
        assert_eq!(json["starts_at"], "2099-06-01T09:00:00");
    }

    #[test]
    fn create_patient_request_rejects_unknown_gender() {
        let body = r#"{
            "first_name": "Ada", "last_name": "Lovelace", "national_id": "AB-1234",
            "birth_date": "1990-12-10", "gender": "robot"
        }"#;
        assert!(serde_json::from_str::<CreatePatientReq>(body).is_err());

        let ok = body.replace("robot", "female");
        let req: CreatePatientReq = serde_json::from_str(&ok).unwrap();
        assert_eq!(NewPatient::from(req).gender, Gender::Female);
    }

    #[test]
    fn page_conversion_keeps_paging_fields() {
        let page = Page::new(
            vec![Role {
                id: 1,
                name: "admin".into(),
                description: None,
                is_system: true,
            }],
            41,
            PageRequest { page: 3, page_size: 20 },
        );
        let res: PageRes<RoleRes> = PageRes::from_page(page);
        assert_eq!(res.total, 41);
        assert_eq!(res.page, 3);
        assert_eq!(res.items[0].name, "admin");
    }
}
