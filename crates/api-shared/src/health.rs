use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Builds the liveness report returned by `GET /health`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HealthService;

impl HealthService {
    /// Report on the service given the outcome of a database round trip.
    ///
    /// The failure detail is logged rather than returned; the endpoint is unauthenticated.
    pub fn report<E: std::fmt::Display>(database: Result<(), E>) -> HealthRes {
        match database {
            Ok(()) => HealthRes {
                ok: true,
                message: "Clinic API is alive".into(),
            },
            Err(e) => {
                tracing::warn!("health check: database unreachable: {}", e);
                HealthRes {
                    ok: false,
                    message: "Database unavailable".into(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_when_database_answers() {
        let res = HealthService::report::<String>(Ok(()));
        assert!(res.ok);
        assert_eq!(res.message, "Clinic API is alive");
    }

    #[test]
    fn failure_detail_is_not_exposed() {
        let res = HealthService::report(Err("disk I/O error at /var/lib/clinic.db"));
        assert!(!res.ok);
        assert!(!res.message.contains("/var/lib"));
    }
}
