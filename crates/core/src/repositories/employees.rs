use super::fetch_page;
use crate::models::{Employee, EmployeeFilter, Page, PageRequest, UpdateEmployee};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT: &str = "SELECT e.id, e.first_name, e.last_name, e.email, e.phone, e.role_id, \
     r.name AS role_name, e.specialty_id, e.license_number, e.active, e.created_at, e.updated_at";

const FROM: &str = "FROM employees e JOIN roles r ON r.id = e.role_id";

/// Values for a new employee row. The password must already be hashed.
pub struct InsertEmployee<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub role_id: i64,
    pub specialty_id: Option<i64>,
    pub license_number: Option<&'a str>,
    pub password_hash: &'a str,
}

pub async fn insert(conn: &mut SqliteConnection, new: InsertEmployee<'_>) -> ClinicResult<Employee> {
    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO employees (first_name, last_name, email, phone, role_id, specialty_id, \
         license_number, password_hash, active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(new.first_name)
    .bind(new.last_name)
    .bind(new.email)
    .bind(new.phone)
    .bind(new.role_id)
    .bind(new.specialty_id)
    .bind(new.license_number)
    .bind(new.password_hash)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    get(conn, id).await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<Employee>> {
    let employee = sqlx::query_as::<_, Employee>(&format!("{SELECT} {FROM} WHERE e.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(employee)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Employee> {
    find(conn, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("employee", id))
}

/// Look up an employee and their password hash by (normalised) email.
pub async fn find_credentials(
    conn: &mut SqliteConnection,
    email: &str,
) -> ClinicResult<Option<(Employee, String)>> {
    let row: Option<(i64, String)> =
        sqlx::query_as("SELECT id, password_hash FROM employees WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;

    match row {
        Some((id, hash)) => Ok(Some((get(conn, id).await?, hash))),
        None => Ok(None),
    }
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    update: &UpdateEmployee,
) -> ClinicResult<Employee> {
    let result = sqlx::query(
        "UPDATE employees SET first_name = ?, last_name = ?, email = ?, phone = ?, \
         specialty_id = ?, license_number = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.email)
    .bind(&update.phone)
    .bind(update.specialty_id)
    .bind(&update.license_number)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("employee", id));
    }
    get(conn, id).await
}

pub async fn set_role(
    conn: &mut SqliteConnection,
    id: i64,
    role_id: i64,
    specialty_id: Option<i64>,
) -> ClinicResult<()> {
    let result = sqlx::query(
        "UPDATE employees SET role_id = ?, specialty_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(role_id)
    .bind(specialty_id)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("employee", id));
    }
    Ok(())
}

pub async fn set_password_hash(
    conn: &mut SqliteConnection,
    id: i64,
    password_hash: &str,
) -> ClinicResult<()> {
    let result = sqlx::query("UPDATE employees SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("employee", id));
    }
    Ok(())
}

pub async fn set_active(conn: &mut SqliteConnection, id: i64, active: bool) -> ClinicResult<()> {
    let result = sqlx::query("UPDATE employees SET active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("employee", id));
    }
    Ok(())
}

pub async fn count_with_role(conn: &mut SqliteConnection, role_id: i64) -> ClinicResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE role_id = ?")
        .bind(role_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn count_with_specialty(
    conn: &mut SqliteConnection,
    specialty_id: i64,
) -> ClinicResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE specialty_id = ?")
        .bind(specialty_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Number of active employees holding the named role.
pub async fn count_active_with_role_name(
    conn: &mut SqliteConnection,
    role_name: &str,
) -> ClinicResult<i64> {
    let count = sqlx::query_scalar(&format!("SELECT COUNT(*) {FROM} WHERE r.name = ? AND e.active = 1"))
        .bind(role_name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn list(
    conn: &mut SqliteConnection,
    filter: &EmployeeFilter,
    page: PageRequest,
) -> ClinicResult<Page<Employee>> {
    fetch_page(
        conn,
        SELECT,
        FROM,
        |qb| push_filter(qb, filter),
        "e.last_name, e.first_name, e.id",
        page,
    )
    .await
}

/// Active employees with the `doctor` role, optionally restricted to one specialty.
pub async fn list_doctors(
    conn: &mut SqliteConnection,
    specialty_id: Option<i64>,
) -> ClinicResult<Vec<Employee>> {
    let doctors = sqlx::query_as::<_, Employee>(&format!(
        "{SELECT} {FROM} WHERE r.name = 'doctor' AND e.active = 1 \
         AND (?1 IS NULL OR e.specialty_id = ?1) ORDER BY e.last_name, e.first_name"
    ))
    .bind(specialty_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(doctors)
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &EmployeeFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(role_id) = filter.role_id {
        qb.push(" AND e.role_id = ").push_bind(role_id);
    }
    if let Some(specialty_id) = filter.specialty_id {
        qb.push(" AND e.specialty_id = ").push_bind(specialty_id);
    }
    if let Some(active) = filter.active {
        qb.push(" AND e.active = ").push_bind(active);
    }
}
