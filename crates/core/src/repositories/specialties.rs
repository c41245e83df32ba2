use crate::models::Specialty;
use crate::{ClinicError, ClinicResult};
use sqlx::SqliteConnection;

pub async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
) -> ClinicResult<Specialty> {
    let id = sqlx::query("INSERT INTO specialties (name, description, active) VALUES (?, ?, 1)")
        .bind(name)
        .bind(description)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    get(conn, id).await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<Specialty>> {
    let specialty = sqlx::query_as::<_, Specialty>(
        "SELECT id, name, description, active FROM specialties WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(specialty)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Specialty> {
    find(conn, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("specialty", id))
}

pub async fn list(conn: &mut SqliteConnection, only_active: bool) -> ClinicResult<Vec<Specialty>> {
    let specialties = sqlx::query_as::<_, Specialty>(
        "SELECT id, name, description, active FROM specialties \
         WHERE (? = 0 OR active = 1) ORDER BY name",
    )
    .bind(only_active)
    .fetch_all(&mut *conn)
    .await?;
    Ok(specialties)
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    name: &str,
    description: Option<&str>,
    active: bool,
) -> ClinicResult<Specialty> {
    let result =
        sqlx::query("UPDATE specialties SET name = ?, description = ?, active = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(active)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("specialty", id));
    }
    get(conn, id).await
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> ClinicResult<()> {
    let result = sqlx::query("DELETE FROM specialties WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("specialty", id));
    }
    Ok(())
}
