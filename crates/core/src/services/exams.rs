//! Exam catalogue and lab exam orders.

use super::{audit_denial, AuditService};
use crate::models::{
    Actor, AuditEntry, Exam, ExamFilter, ExamStatus, ExamType, Page, PageRequest, SystemRole,
};
use crate::{repositories, validation};
use crate::{ClinicError, ClinicResult};
use sqlx::SqlitePool;
use std::collections::HashSet;

#[derive(Clone)]
pub struct ExamService {
    pool: SqlitePool,
    audit: AuditService,
}

impl ExamService {
    pub fn new(pool: SqlitePool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    pub async fn create_type(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<String>,
    ) -> ClinicResult<ExamType> {
        let name = validation::name("name", name)?;
        let description = validation::optional_text("description", description)?;

        let mut tx = self.pool.begin().await?;
        let exam_type = repositories::exam_types::insert(&mut tx, &name, description.as_deref()).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "exam_type.create")
                .entity("exam_type", exam_type.id)
                .details(&exam_type.name),
        )
        .await?;
        tx.commit().await?;
        Ok(exam_type)
    }

    pub async fn get_type(&self, id: i64) -> ClinicResult<ExamType> {
        let mut conn = self.pool.acquire().await?;
        repositories::exam_types::get(&mut conn, id).await
    }

    pub async fn list_types(&self, only_active: bool) -> ClinicResult<Vec<ExamType>> {
        let mut conn = self.pool.acquire().await?;
        repositories::exam_types::list(&mut conn, only_active).await
    }

    /// Rename, re-describe or (de)activate an exam type. Deactivated types cannot be ordered
    /// but existing exams keep referring to them.
    pub async fn update_type(
        &self,
        actor: &Actor,
        id: i64,
        name: &str,
        description: Option<String>,
        active: bool,
    ) -> ClinicResult<ExamType> {
        let name = validation::name("name", name)?;
        let description = validation::optional_text("description", description)?;

        let mut tx = self.pool.begin().await?;
        let exam_type =
            repositories::exam_types::update(&mut tx, id, &name, description.as_deref(), active)
                .await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "exam_type.update").entity("exam_type", id),
        )
        .await?;
        tx.commit().await?;
        Ok(exam_type)
    }

    pub async fn deactivate_type(&self, actor: &Actor, id: i64) -> ClinicResult<ExamType> {
        let current = self.get_type(id).await?;
        self.update_type(actor, id, &current.name, current.description, false)
            .await
    }

    /// Order one exam per type for an open consultation of `doctor`.
    pub async fn order(
        &self,
        doctor: &Actor,
        consultation_id: i64,
        exam_type_ids: &[i64],
        notes: Option<String>,
    ) -> ClinicResult<Vec<Exam>> {
        if exam_type_ids.is_empty() {
            return Err(ClinicError::invalid("at least one exam type is required"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = exam_type_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ClinicError::invalid(format!(
                "exam type {dup} is listed more than once"
            )));
        }
        let notes = validation::optional_text("notes", notes)?;

        let result = self
            .order_in_tx(doctor, consultation_id, exam_type_ids, notes.as_deref())
            .await;
        audit_denial(&self.audit, doctor, "exam.order", result).await
    }

    async fn order_in_tx(
        &self,
        doctor: &Actor,
        consultation_id: i64,
        exam_type_ids: &[i64],
        notes: Option<&str>,
    ) -> ClinicResult<Vec<Exam>> {
        let mut tx = self.pool.begin().await?;
        let consultation = repositories::consultations::get(&mut tx, consultation_id).await?;
        if consultation.doctor_id != doctor.employee_id {
            return Err(ClinicError::Forbidden(format!(
                "consultation {consultation_id} belongs to another doctor"
            )));
        }
        if !consultation.is_open() {
            return Err(ClinicError::Conflict(format!(
                "exams can only be ordered while consultation {consultation_id} is open"
            )));
        }

        let mut exams = Vec::with_capacity(exam_type_ids.len());
        for &exam_type_id in exam_type_ids {
            match repositories::exam_types::find(&mut tx, exam_type_id).await? {
                Some(t) if t.active => {}
                Some(t) => {
                    return Err(ClinicError::invalid(format!("exam type '{}' is inactive", t.name)))
                }
                None => {
                    return Err(ClinicError::invalid(format!(
                        "exam type {exam_type_id} does not exist"
                    )))
                }
            }
            if repositories::exams::count_pending(&mut tx, consultation_id, exam_type_id).await? > 0 {
                return Err(ClinicError::Conflict(format!(
                    "exam type {exam_type_id} is already pending for consultation {consultation_id}"
                )));
            }

            let exam = repositories::exams::insert(
                &mut tx,
                consultation_id,
                consultation.patient_id,
                exam_type_id,
                doctor.employee_id,
                notes,
            )
            .await?;
            repositories::audit::insert(
                &mut tx,
                &AuditEntry::new(Some(doctor), "exam.order")
                    .entity("exam", exam.id)
                    .details(&exam.exam_type_name),
            )
            .await?;
            exams.push(exam);
        }
        tx.commit().await?;

        tracing::info!(consultation_id, count = exams.len(), "exams ordered");
        Ok(exams)
    }

    /// Record the result of a pending exam.
    pub async fn process(&self, actor: &Actor, exam_id: i64, result: &str) -> ClinicResult<Exam> {
        let outcome = self.process_in_tx(actor, exam_id, result).await;
        audit_denial(&self.audit, actor, "exam.process", outcome).await
    }

    async fn process_in_tx(&self, actor: &Actor, exam_id: i64, result: &str) -> ClinicResult<Exam> {
        if !actor.has_any_role(&[SystemRole::LabTechnician, SystemRole::Admin]) {
            return Err(ClinicError::Forbidden(
                "only lab technicians can process exams".into(),
            ));
        }
        let result = validation::required_text("result", result)?;

        let mut tx = self.pool.begin().await?;
        let exam = repositories::exams::get(&mut tx, exam_id).await?;
        ensure_transition(&exam, ExamStatus::Processed)?;
        repositories::exams::mark_processed(&mut tx, exam_id, &result, actor.employee_id).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "exam.process").entity("exam", exam_id),
        )
        .await?;
        let exam = repositories::exams::get(&mut tx, exam_id).await?;
        tx.commit().await?;

        tracing::info!(exam_id, "exam processed");
        Ok(exam)
    }

    /// Cancel a pending exam. Allowed for the ordering doctor and administrators.
    pub async fn cancel(&self, actor: &Actor, exam_id: i64) -> ClinicResult<Exam> {
        let outcome = self.cancel_in_tx(actor, exam_id).await;
        audit_denial(&self.audit, actor, "exam.cancel", outcome).await
    }

    async fn cancel_in_tx(&self, actor: &Actor, exam_id: i64) -> ClinicResult<Exam> {
        let mut tx = self.pool.begin().await?;
        let exam = repositories::exams::get(&mut tx, exam_id).await?;
        if exam.requested_by != actor.employee_id && !actor.is_admin() {
            return Err(ClinicError::Forbidden(format!(
                "exam {exam_id} was ordered by another doctor"
            )));
        }
        ensure_transition(&exam, ExamStatus::Cancelled)?;
        repositories::exams::mark_cancelled(&mut tx, exam_id).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "exam.cancel").entity("exam", exam_id),
        )
        .await?;
        let exam = repositories::exams::get(&mut tx, exam_id).await?;
        tx.commit().await?;
        Ok(exam)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Exam> {
        let mut conn = self.pool.acquire().await?;
        repositories::exams::get(&mut conn, id).await
    }

    pub async fn list(&self, filter: &ExamFilter, page: PageRequest) -> ClinicResult<Page<Exam>> {
        let mut conn = self.pool.acquire().await?;
        repositories::exams::list(&mut conn, filter, page).await
    }

    /// The lab worklist: pending exams, oldest first.
    pub async fn list_pending(&self, page: PageRequest) -> ClinicResult<Page<Exam>> {
        self.list(
            &ExamFilter {
                status: Some(ExamStatus::Pending),
                ..Default::default()
            },
            page,
        )
        .await
    }
}

fn ensure_transition(exam: &Exam, next: ExamStatus) -> ClinicResult<()> {
    if !exam.status.can_transition_to(next) {
        return Err(ClinicError::InvalidTransition {
            entity: "exam",
            from: exam.status.to_string(),
            to: next.to_string(),
        });
    }
    Ok(())
}
