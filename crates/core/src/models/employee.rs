use chrono::{DateTime, Utc};
use serde::Serialize;

/// An employee as read from the database, joined with its role name.
///
/// The password hash is deliberately not part of this type; see
/// [`crate::repositories::employees::find_credentials`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role_id: i64,
    pub role_name: String,
    pub specialty_id: Option<i64>,
    pub license_number: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role_id: i64,
    pub specialty_id: Option<i64>,
    pub license_number: Option<String>,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct UpdateEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialty_id: Option<i64>,
    pub license_number: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct EmployeeFilter {
    pub role_id: Option<i64>,
    pub specialty_id: Option<i64>,
    pub active: Option<bool>,
}
