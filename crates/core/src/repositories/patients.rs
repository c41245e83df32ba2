use super::fetch_page;
use crate::models::{NewPatient, Page, PageRequest, Patient, PatientFilter, UpdatePatient};
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT: &str = "SELECT id, first_name, last_name, national_id, birth_date, gender, phone, \
     email, address, blood_type, allergies, active, created_at, updated_at";

pub async fn insert(conn: &mut SqliteConnection, new: &NewPatient) -> ClinicResult<Patient> {
    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO patients (first_name, last_name, national_id, birth_date, gender, phone, \
         email, address, blood_type, allergies, active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.national_id)
    .bind(new.birth_date)
    .bind(new.gender)
    .bind(&new.phone)
    .bind(&new.email)
    .bind(&new.address)
    .bind(&new.blood_type)
    .bind(&new.allergies)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    get(conn, id).await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Option<Patient>> {
    let patient = sqlx::query_as::<_, Patient>(&format!("{SELECT} FROM patients WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(patient)
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> ClinicResult<Patient> {
    find(conn, id)
        .await?
        .ok_or_else(|| ClinicError::not_found("patient", id))
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    update: &UpdatePatient,
) -> ClinicResult<Patient> {
    let result = sqlx::query(
        "UPDATE patients SET first_name = ?, last_name = ?, birth_date = ?, gender = ?, \
         phone = ?, email = ?, address = ?, blood_type = ?, allergies = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(update.birth_date)
    .bind(update.gender)
    .bind(&update.phone)
    .bind(&update.email)
    .bind(&update.address)
    .bind(&update.blood_type)
    .bind(&update.allergies)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("patient", id));
    }
    get(conn, id).await
}

pub async fn set_active(conn: &mut SqliteConnection, id: i64, active: bool) -> ClinicResult<()> {
    let result = sqlx::query("UPDATE patients SET active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ClinicError::not_found("patient", id));
    }
    Ok(())
}

pub async fn search(
    conn: &mut SqliteConnection,
    filter: &PatientFilter,
    page: PageRequest,
) -> ClinicResult<Page<Patient>> {
    fetch_page(
        conn,
        SELECT,
        "FROM patients",
        |qb| push_filter(qb, filter),
        "last_name, first_name, id",
        page,
    )
    .await
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PatientFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (first_name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR last_name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR national_id LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(active) = filter.active {
        qb.push(" AND active = ").push_bind(active);
    }
}

/// Make `%`, `_` and the escape character itself match literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
