use crate::models::{Actor, AuditEntry, Role};
use crate::{repositories, validation};
use crate::{ClinicError, ClinicResult};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct RoleService {
    pool: SqlitePool,
}

impl RoleService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<String>,
    ) -> ClinicResult<Role> {
        let name = validation::role_name(name)?;
        let description = validation::optional_text("description", description)?;

        let mut tx = self.pool.begin().await?;
        let role = repositories::roles::insert(&mut tx, &name, description.as_deref()).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "role.create")
                .entity("role", role.id)
                .details(&role.name),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(role_id = role.id, "created role {}", role.name);
        Ok(role)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Role> {
        let mut conn = self.pool.acquire().await?;
        repositories::roles::get(&mut conn, id).await
    }

    pub async fn find_by_name(&self, name: &str) -> ClinicResult<Option<Role>> {
        let mut conn = self.pool.acquire().await?;
        repositories::roles::find_by_name(&mut conn, name).await
    }

    pub async fn list(&self) -> ClinicResult<Vec<Role>> {
        let mut conn = self.pool.acquire().await?;
        repositories::roles::list(&mut conn).await
    }

    /// Rename or re-describe a role. System roles keep their name.
    pub async fn update(
        &self,
        actor: &Actor,
        id: i64,
        name: &str,
        description: Option<String>,
    ) -> ClinicResult<Role> {
        let name = validation::role_name(name)?;
        let description = validation::optional_text("description", description)?;

        let mut tx = self.pool.begin().await?;
        let existing = repositories::roles::get(&mut tx, id).await?;
        if existing.is_system && existing.name != name {
            return Err(ClinicError::Conflict(format!(
                "system role '{}' cannot be renamed",
                existing.name
            )));
        }
        let role = repositories::roles::update(&mut tx, id, &name, description.as_deref()).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "role.update").entity("role", id),
        )
        .await?;
        tx.commit().await?;
        Ok(role)
    }

    pub async fn delete(&self, actor: &Actor, id: i64) -> ClinicResult<()> {
        let mut tx = self.pool.begin().await?;
        let existing = repositories::roles::get(&mut tx, id).await?;
        if existing.is_system {
            return Err(ClinicError::Conflict(format!(
                "system role '{}' cannot be deleted",
                existing.name
            )));
        }
        if repositories::employees::count_with_role(&mut tx, id).await? > 0 {
            return Err(ClinicError::Conflict(format!(
                "role '{}' is assigned to employees",
                existing.name
            )));
        }
        repositories::roles::delete(&mut tx, id).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "role.delete")
                .entity("role", id)
                .details(&existing.name),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(role_id = id, "deleted role {}", existing.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SystemRole;
    use crate::services::test_support::*;

    #[tokio::test]
    async fn custom_role_lifecycle() {
        let clinic = clinic().await;
        let admin = system_actor();

        let role = clinic
            .roles
            .create(&admin, "nurse", Some("Ward nurse".into()))
            .await
            .unwrap();
        assert!(!role.is_system);

        let renamed = clinic.roles.update(&admin, role.id, "senior_nurse", None).await.unwrap();
        assert_eq!(renamed.name, "senior_nurse");
        assert_eq!(renamed.description, None);

        clinic.roles.delete(&admin, role.id).await.unwrap();
        assert!(matches!(
            clinic.roles.get(role.id).await.unwrap_err(),
            ClinicError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn duplicate_role_name_conflicts() {
        let clinic = clinic().await;
        let err = clinic
            .roles
            .create(&system_actor(), "doctor", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }

    #[tokio::test]
    async fn system_roles_are_protected() {
        let clinic = clinic().await;
        let doctor_role = role_id(&clinic, SystemRole::Doctor).await;

        let err = clinic
            .roles
            .update(&system_actor(), doctor_role, "physician", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));

        // Updating only the description is allowed.
        let role = clinic
            .roles
            .update(&system_actor(), doctor_role, "doctor", Some("Physicians".into()))
            .await
            .unwrap();
        assert_eq!(role.description.as_deref(), Some("Physicians"));

        let err = clinic.roles.delete(&system_actor(), doctor_role).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }

    #[tokio::test]
    async fn assigned_role_cannot_be_deleted() {
        let clinic = clinic().await;
        let admin = system_actor();
        let role = clinic.roles.create(&admin, "billing", None).await.unwrap();
        let employee = employee(&clinic, "desk@clinic.org", SystemRole::Receptionist).await;
        clinic
            .employees
            .change_role(&admin, employee.id, role.id, None)
            .await
            .unwrap();

        let err = clinic.roles.delete(&admin, role.id).await.unwrap_err();
        assert!(matches!(err, ClinicError::Conflict(_)));
    }
}
