//! Employee administration.

use crate::models::{
    Actor, AuditEntry, Employee, EmployeeFilter, NewEmployee, Page, PageRequest, SystemRole,
    UpdateEmployee,
};
use crate::repositories::employees::InsertEmployee;
use crate::{password, repositories, validation};
use crate::{ClinicError, ClinicResult};
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Clone)]
pub struct EmployeeService {
    pool: SqlitePool,
}

impl EmployeeService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, actor: &Actor, new: NewEmployee) -> ClinicResult<Employee> {
        let first_name = validation::name("first_name", &new.first_name)?;
        let last_name = validation::name("last_name", &new.last_name)?;
        let email = validation::email(&new.email)?;
        let phone = validation::optional_phone(new.phone)?;
        let license_number = validation::optional_text("license_number", new.license_number)?;
        validation::password(&new.password)?;
        let password_hash = password::hash(&new.password).await?;

        let mut tx = self.pool.begin().await?;
        let specialty_id = resolve_specialty(&mut tx, new.role_id, new.specialty_id).await?;
        let employee = repositories::employees::insert(
            &mut tx,
            InsertEmployee {
                first_name: &first_name,
                last_name: &last_name,
                email: &email,
                phone: phone.as_deref(),
                role_id: new.role_id,
                specialty_id,
                license_number: license_number.as_deref(),
                password_hash: &password_hash,
            },
        )
        .await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "employee.create")
                .entity("employee", employee.id)
                .details(&employee.role_name),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            employee_id = employee.id,
            role = %employee.role_name,
            "created employee"
        );
        Ok(employee)
    }

    /// Create the first administrator. Refused once any active admin exists.
    pub async fn bootstrap_admin(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> ClinicResult<Employee> {
        let first_name = validation::name("first_name", first_name)?;
        let last_name = validation::name("last_name", last_name)?;
        let email = validation::email(email)?;
        validation::password(password)?;
        let password_hash = password::hash(password).await?;

        let mut tx = self.pool.begin().await?;
        if repositories::employees::count_active_with_role_name(&mut tx, SystemRole::Admin.as_str())
            .await?
            > 0
        {
            return Err(ClinicError::Conflict(
                "an active administrator already exists".into(),
            ));
        }
        let role = repositories::roles::find_by_name(&mut tx, SystemRole::Admin.as_str())
            .await?
            .ok_or_else(|| ClinicError::Conflict("admin role missing; run migrations".into()))?;
        let employee = repositories::employees::insert(
            &mut tx,
            InsertEmployee {
                first_name: &first_name,
                last_name: &last_name,
                email: &email,
                phone: None,
                role_id: role.id,
                specialty_id: None,
                license_number: None,
                password_hash: &password_hash,
            },
        )
        .await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(None, "employee.bootstrap_admin").entity("employee", employee.id),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(employee_id = employee.id, "bootstrapped administrator");
        Ok(employee)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Employee> {
        let mut conn = self.pool.acquire().await?;
        repositories::employees::get(&mut conn, id).await
    }

    pub async fn list(
        &self,
        filter: &EmployeeFilter,
        page: PageRequest,
    ) -> ClinicResult<Page<Employee>> {
        let mut conn = self.pool.acquire().await?;
        repositories::employees::list(&mut conn, filter, page).await
    }

    pub async fn list_doctors(&self, specialty_id: Option<i64>) -> ClinicResult<Vec<Employee>> {
        let mut conn = self.pool.acquire().await?;
        repositories::employees::list_doctors(&mut conn, specialty_id).await
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: i64,
        update: UpdateEmployee,
    ) -> ClinicResult<Employee> {
        let first_name = validation::name("first_name", &update.first_name)?;
        let last_name = validation::name("last_name", &update.last_name)?;
        let email = validation::email(&update.email)?;
        let phone = validation::optional_phone(update.phone)?;
        let license_number = validation::optional_text("license_number", update.license_number)?;

        let mut tx = self.pool.begin().await?;
        let existing = repositories::employees::get(&mut tx, id).await?;
        let specialty_id = resolve_specialty(&mut tx, existing.role_id, update.specialty_id).await?;
        let employee = repositories::employees::update(
            &mut tx,
            id,
            &UpdateEmployee {
                first_name,
                last_name,
                email,
                phone,
                specialty_id,
                license_number,
            },
        )
        .await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "employee.update").entity("employee", id),
        )
        .await?;
        tx.commit().await?;
        Ok(employee)
    }

    /// Assign a different role. Doctors must be given a specialty.
    pub async fn change_role(
        &self,
        actor: &Actor,
        id: i64,
        role_id: i64,
        specialty_id: Option<i64>,
    ) -> ClinicResult<Employee> {
        let mut tx = self.pool.begin().await?;
        let existing = repositories::employees::get(&mut tx, id).await?;
        let specialty_id = resolve_specialty(&mut tx, role_id, specialty_id).await?;

        let new_role = repositories::roles::get(&mut tx, role_id).await?;
        let losing_admin = existing.role_name == SystemRole::Admin.as_str()
            && new_role.name != SystemRole::Admin.as_str();
        if losing_admin {
            if actor.employee_id == id {
                return Err(ClinicError::Conflict(
                    "administrators cannot remove their own admin role".into(),
                ));
            }
            ensure_other_admin(&mut tx, &existing).await?;
        }

        repositories::employees::set_role(&mut tx, id, role_id, specialty_id).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "employee.change_role")
                .entity("employee", id)
                .details(format!("{} -> {}", existing.role_name, new_role.name)),
        )
        .await?;
        let employee = repositories::employees::get(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            employee_id = id,
            "role changed from {} to {}",
            existing.role_name,
            employee.role_name
        );
        Ok(employee)
    }

    pub async fn reset_password(&self, actor: &Actor, id: i64, new_password: &str) -> ClinicResult<()> {
        validation::password(new_password)?;
        let password_hash = password::hash(new_password).await?;

        let mut tx = self.pool.begin().await?;
        repositories::employees::set_password_hash(&mut tx, id, &password_hash).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "employee.reset_password").entity("employee", id),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Activate or deactivate an account. Nobody can deactivate themselves, and the last active
    /// administrator cannot be deactivated.
    pub async fn set_active(&self, actor: &Actor, id: i64, active: bool) -> ClinicResult<Employee> {
        if !active && actor.employee_id == id {
            return Err(ClinicError::Conflict(
                "employees cannot deactivate their own account".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let existing = repositories::employees::get(&mut tx, id).await?;
        if !active && existing.active && existing.role_name == SystemRole::Admin.as_str() {
            ensure_other_admin(&mut tx, &existing).await?;
        }
        repositories::employees::set_active(&mut tx, id, active).await?;
        let action = if active { "employee.activate" } else { "employee.deactivate" };
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), action).entity("employee", id),
        )
        .await?;
        let employee = repositories::employees::get(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(employee_id = id, active, "employee status changed");
        Ok(employee)
    }
}

/// Check the specialty rule for `role_id` and return the specialty to store.
///
/// Doctors need an existing, active specialty. Other roles never keep one.
async fn resolve_specialty(
    conn: &mut SqliteConnection,
    role_id: i64,
    specialty_id: Option<i64>,
) -> ClinicResult<Option<i64>> {
    let role = repositories::roles::find(conn, role_id)
        .await?
        .ok_or_else(|| ClinicError::invalid(format!("role {role_id} does not exist")))?;
    if role.name != SystemRole::Doctor.as_str() {
        return Ok(None);
    }

    let specialty_id =
        specialty_id.ok_or_else(|| ClinicError::invalid("doctors must have a specialty"))?;
    match repositories::specialties::find(conn, specialty_id).await? {
        Some(s) if s.active => Ok(Some(s.id)),
        Some(s) => Err(ClinicError::invalid(format!("specialty '{}' is inactive", s.name))),
        None => Err(ClinicError::invalid(format!(
            "specialty {specialty_id} does not exist"
        ))),
    }
}

async fn ensure_other_admin(conn: &mut SqliteConnection, admin: &Employee) -> ClinicResult<()> {
    let admins =
        repositories::employees::count_active_with_role_name(conn, SystemRole::Admin.as_str())
            .await?;
    let others = if admin.active { admins - 1 } else { admins };
    if others < 1 {
        return Err(ClinicError::Conflict(
            "the last active administrator cannot be removed".into(),
        ));
    }
    Ok(())
}
