use crate::models::{Actor, AuditEntry, Specialty};
use crate::{repositories, validation};
use crate::{ClinicError, ClinicResult};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct SpecialtyService {
    pool: SqlitePool,
}

impl SpecialtyService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<String>,
    ) -> ClinicResult<Specialty> {
        let name = validation::name("name", name)?;
        let description = validation::optional_text("description", description)?;

        let mut tx = self.pool.begin().await?;
        let specialty =
            repositories::specialties::insert(&mut tx, &name, description.as_deref()).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "specialty.create")
                .entity("specialty", specialty.id)
                .details(&specialty.name),
        )
        .await?;
        tx.commit().await?;
        Ok(specialty)
    }

    pub async fn get(&self, id: i64) -> ClinicResult<Specialty> {
        let mut conn = self.pool.acquire().await?;
        repositories::specialties::get(&mut conn, id).await
    }

    pub async fn list(&self, only_active: bool) -> ClinicResult<Vec<Specialty>> {
        let mut conn = self.pool.acquire().await?;
        repositories::specialties::list(&mut conn, only_active).await
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: i64,
        name: &str,
        description: Option<String>,
        active: bool,
    ) -> ClinicResult<Specialty> {
        let name = validation::name("name", name)?;
        let description = validation::optional_text("description", description)?;

        let mut tx = self.pool.begin().await?;
        let specialty =
            repositories::specialties::update(&mut tx, id, &name, description.as_deref(), active)
                .await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "specialty.update").entity("specialty", id),
        )
        .await?;
        tx.commit().await?;
        Ok(specialty)
    }

    /// Delete a specialty no employee refers to. Referenced specialties can be deactivated
    /// through [`SpecialtyService::update`] instead.
    pub async fn delete(&self, actor: &Actor, id: i64) -> ClinicResult<()> {
        let mut tx = self.pool.begin().await?;
        let specialty = repositories::specialties::get(&mut tx, id).await?;
        if repositories::employees::count_with_specialty(&mut tx, id).await? > 0 {
            return Err(ClinicError::Conflict(format!(
                "specialty '{}' is assigned to employees",
                specialty.name
            )));
        }
        repositories::specialties::delete(&mut tx, id).await?;
        repositories::audit::insert(
            &mut tx,
            &AuditEntry::new(Some(actor), "specialty.delete")
                .entity("specialty", id)
                .details(&specialty.name),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
