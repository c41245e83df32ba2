//! Domain models persisted in the clinic database.
//!
//! Row types derive `sqlx::FromRow` and are read straight out of repository queries. Status
//! enums are stored as snake_case text.

pub mod appointment;
pub mod audit;
pub mod consultation;
pub mod employee;
pub mod exam;
pub mod patient;
pub mod prescription;
pub mod report;
pub mod role;
pub mod specialty;

pub use appointment::{Appointment, AppointmentFilter, AppointmentStatus, TimeSlot};
pub use audit::{AuditEntry, AuditFilter, AuditLog};
pub use consultation::{Consultation, ConsultationNotes, ConsultationStatus};
pub use employee::{Employee, EmployeeFilter, NewEmployee, UpdateEmployee};
pub use exam::{Exam, ExamFilter, ExamStatus, ExamType};
pub use patient::{Gender, NewPatient, Patient, PatientFilter, PatientHistory, UpdatePatient};
pub use prescription::{NewPrescriptionItem, Prescription, PrescriptionItem};
pub use report::{AppointmentSummary, DoctorWorkload, ExamTypeSummary};
pub use role::{Role, SystemRole};
pub use specialty::Specialty;

use crate::constants::DEFAULT_PAGE_SIZE;
use serde::Serialize;

/// A normalised page request. Pages are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, page_size: Option<u32>, max_page_size: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, max_page_size.max(1)),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// The authenticated employee performing an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub employee_id: i64,
    pub role: String,
}

impl Actor {
    pub fn new(employee_id: i64, role: impl Into<String>) -> Self {
        Self {
            employee_id,
            role: role.into(),
        }
    }

    pub fn has_role(&self, role: SystemRole) -> bool {
        self.role == role.as_str()
    }

    pub fn has_any_role(&self, roles: &[SystemRole]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(SystemRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_values() {
        let req = PageRequest::new(Some(0), Some(1_000), 100);
        assert_eq!(req, PageRequest { page: 1, page_size: 100 });
        assert_eq!(req.offset(), 0);

        let req = PageRequest::new(Some(3), Some(25), 100);
        assert_eq!(req.offset(), 50);
        assert_eq!(req.limit(), 25);
    }

    #[test]
    fn actor_role_checks() {
        let actor = Actor::new(7, "doctor");
        assert!(actor.has_role(SystemRole::Doctor));
        assert!(actor.has_any_role(&[SystemRole::Admin, SystemRole::Doctor]));
        assert!(!actor.is_admin());
    }
}
