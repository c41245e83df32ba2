use crate::models::ExamType;
use crate::{ClinicError, ClinicResult};
use sqlx::SqliteConnection;

pub async fn insert(
    conn: &mut SqliteConnection,
    name: &str,
    description: Option<&str>,
) -> ClinicResult<ExamType> {
    let id = sqlx::query("INSERT INTO exam_types (name, description, active) VALUES (?, ?, 1)")
        .bind(name)
        .bind(description)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
    get(conn, id).await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<ExamType>> {
    let exam_type = sqlx::query_as::<_, ExamType>(
        "SELECT id, name, description, active FROM exam_types WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(exam_type)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> ClinicResult<ExamType> {
    find(conn, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("exam type", id))
}

pub async fn list(conn: &mut SqliteConnection, only_active: bool) -> ClinicResult<Vec<ExamType>> {
    let exam_types = sqlx::query_as::<_, ExamType>(
        "SELECT id, name, description, active FROM exam_types \
         WHERE (? = 0 OR active = 1) ORDER BY name",
    )
    .bind(only_active)
    .fetch_all(&mut *conn)
    .await?;
    Ok(exam_types)
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    name: &str,
    description: Option<&str>,
    active: bool,
) -> ClinicResult<ExamType> {
    let result =
        sqlx::query("UPDATE exam_types SET name = ?, description = ?, active = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(active)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("exam type", id));
    }
    get(conn, id).await
}
