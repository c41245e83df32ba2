use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Specialty {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}
