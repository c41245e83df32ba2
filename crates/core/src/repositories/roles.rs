use crate::models::Role;
use crate::{ClinicError, ClinicResult};
use sqlx::SqliteConnection;

pub async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
) -> ClinicResult<Role> {
    let id = sqlx::query("INSERT INTO roles (name, description, is_system) VALUES (?, ?, 0)")
        .bind(name)
        .bind(description)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    get(conn, id).await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, description, is_system FROM roles WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(role)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Role> {
    find(conn, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("role", id))
}

pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> ClinicResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>(
        "SELECT id, name, description, is_system FROM roles WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(role)
}

pub async fn list(conn: &mut SqliteConnection) -> ClinicResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>(
        "SELECT id, name, description, is_system FROM roles ORDER BY is_system DESC, name",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(roles)
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    name: &str,
    description: Option<&str>,
) -> ClinicResult<Role> {
    let result = sqlx::query("UPDATE roles SET name = ?, description = ? WHERE id = ?")
        .bind(name)
        .bind(description)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("role", id));
    }
    get(conn, id).await
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> ClinicResult<()> {
    let result = sqlx::query("DELETE FROM roles WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("role", id));
    }
    Ok(())
}
