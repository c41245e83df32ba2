use clinic_types::TextError;

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },
    #[error("authentication required")]
    Unauthorised,
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("failed to apply migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("failed to hash password: {0}")]
    PasswordHash(String),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),
}

impl ClinicError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<sqlx::Error> for ClinicError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ClinicError::Conflict(format!("duplicate value: {}", db.message()))
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                ClinicError::Conflict(format!("referenced record missing or in use: {}", db.message()))
            }
            _ => ClinicError::Database(err),
        }
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_entity() {
        let err = ClinicError::not_found("patient", 42);
        assert_eq!(err.to_string(), "patient 42 not found");
    }

    #[test]
    fn text_errors_convert() {
        let err: ClinicError = TextError::Empty.into();
        assert!(matches!(err, ClinicError::Text(TextError::Empty)));
    }
}
