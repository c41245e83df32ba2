//! Bearer token authentication shared by the clinic APIs.
//!
//! Employees exchange their credentials for an HS256-signed JWT at login. Every protected
//! request presents it as `Authorization: Bearer <token>`; the API verifies the signature and
//! expiry here, then re-reads the employee from the database so deactivation and role changes
//! apply immediately.

use chrono::{DateTime, Duration, TimeZone, Utc};
use clinic_core::models::Employee;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Default token lifetime when `JWT_TTL_MINUTES` is not set.
pub const DEFAULT_TTL_MINUTES: i64 = 480;

/// Longest accepted token lifetime: 30 days.
pub const MAX_TTL_MINUTES: i64 = 30 * 24 * 60;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("JWT_SECRET is not set")]
    MissingSecret,
    #[error("JWT_SECRET must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,
    #[error("invalid token lifetime: {0}")]
    InvalidTtl(String),
    #[error("missing bearer token")]
    MissingToken,
    #[error("token has expired")]
    Expired,
    #[error("invalid token")]
    InvalidToken,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Token settings resolved once at startup.
#[derive(Clone)]
pub struct AuthConfig {
    secret: Vec<u8>,
    ttl: Duration,
}

impl AuthConfig {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_minutes: i64) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::WeakSecret);
        }
        let ttl = Some(ttl_minutes)
            .filter(|m| (1..=MAX_TTL_MINUTES).contains(m))
            .and_then(Duration::try_minutes)
            .ok_or_else(|| {
                AuthError::InvalidTtl(format!(
                    "{ttl_minutes} (expected 1..={MAX_TTL_MINUTES} minutes)"
                ))
            })?;
        Ok(Self { secret, ttl })
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl.num_minutes()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Resolve the signing secret. There is no default: a missing secret is a startup error.
pub fn jwt_secret_from_env_value(value: Option<String>) -> Result<String, AuthError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingSecret)
}

pub fn jwt_ttl_from_env_value(value: Option<String>) -> Result<i64, AuthError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(DEFAULT_TTL_MINUTES),
        Some(v) => v
            .parse::<i64>()
            .ok()
            .filter(|m| (1..=MAX_TTL_MINUTES).contains(m))
            .ok_or(AuthError::InvalidTtl(v)),
    }
}

/// JWT claims carried by an employee token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Employee id.
    pub sub: i64,
    pub role: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed token and its expiry.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Sign a token for `employee`, valid from now for the configured lifetime.
pub fn issue_token(config: &AuthConfig, employee: &Employee) -> Result<IssuedToken, AuthError> {
    issue_token_at(config, employee, Utc::now())
}

fn issue_token_at(
    config: &AuthConfig,
    employee: &Employee,
    now: DateTime<Utc>,
) -> Result<IssuedToken, AuthError> {
    let expires_at = now
        .checked_add_signed(config.ttl)
        .ok_or_else(|| AuthError::InvalidTtl("token expiry out of range".into()))?;
    let claims = Claims {
        sub: employee.id,
        role: employee.role_name.clone(),
        name: employee.full_name(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&config.secret),
    )
    .map_err(AuthError::Signing)?;

    Ok(IssuedToken {
        token,
        expires_at: Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at),
    })
}

/// Check a token's signature and expiry and return its claims.
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(&config.secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => {
                tracing::debug!("rejected token: {}", e);
                AuthError::InvalidToken
            }
        })
}

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef-test-secret";

    fn config() -> AuthConfig {
        AuthConfig::new(SECRET, 60).unwrap()
    }

    fn employee() -> Employee {
        Employee {
            id: 7,
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: "grace@clinic.org".into(),
            phone: None,
            role_id: 2,
            role_name: "doctor".into(),
            specialty_id: Some(1),
            license_number: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let cfg = config();
        let issued = issue_token(&cfg, &employee()).unwrap();
        let claims = verify_token(&cfg, &issued.token).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, "doctor");
        assert_eq!(claims.name, "Grace Hopper");
        assert_eq!(claims.exp - claims.iat, 3_600);
        assert_eq!(issued.expires_at.timestamp(), claims.exp);
    }

    #[test]
    fn expired_token_is_rejected() {
        let cfg = config();
        let issued =
            issue_token_at(&cfg, &employee(), Utc::now() - Duration::minutes(120)).unwrap();
        assert!(matches!(
            verify_token(&cfg, &issued.token),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let other = AuthConfig::new("another-secret-of-16+", 60).unwrap();
        let issued = issue_token(&other, &employee()).unwrap();
        assert!(matches!(
            verify_token(&config(), &issued.token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            verify_token(&config(), "not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn secrets_must_be_long_enough() {
        assert!(matches!(AuthConfig::new("", 60), Err(AuthError::MissingSecret)));
        assert!(matches!(AuthConfig::new("short", 60), Err(AuthError::WeakSecret)));
        assert!(matches!(AuthConfig::new(SECRET, 0), Err(AuthError::InvalidTtl(_))));
    }

    #[test]
    fn oversized_lifetimes_are_rejected_not_panicking() {
        for minutes in [MAX_TTL_MINUTES + 1, 1_000_000_000_000, 200_000_000_000_000, i64::MAX] {
            assert!(
                matches!(AuthConfig::new(SECRET, minutes), Err(AuthError::InvalidTtl(_))),
                "{minutes} should be rejected"
            );
        }
        let longest = AuthConfig::new(SECRET, MAX_TTL_MINUTES).unwrap();
        let issued = issue_token(&longest, &employee()).unwrap();
        assert!(verify_token(&longest, &issued.token).is_ok());
        assert!(jwt_ttl_from_env_value(Some("1000000000000".into())).is_err());
    }

    #[test]
    fn expiry_overflow_is_an_error() {
        let issued = issue_token_at(&config(), &employee(), DateTime::<Utc>::MAX_UTC);
        assert!(matches!(issued, Err(AuthError::InvalidTtl(_))));
    }

    #[test]
    fn env_values_parse_with_defaults() {
        assert!(matches!(
            jwt_secret_from_env_value(Some("   ".into())),
            Err(AuthError::MissingSecret)
        ));
        assert_eq!(jwt_secret_from_env_value(Some(" s3cret ".into())).unwrap(), "s3cret");
        assert_eq!(jwt_ttl_from_env_value(None).unwrap(), DEFAULT_TTL_MINUTES);
        assert_eq!(jwt_ttl_from_env_value(Some("15".into())).unwrap(), 15);
        assert!(jwt_ttl_from_env_value(Some("-5".into())).is_err());
        assert!(jwt_ttl_from_env_value(Some("soon".into())).is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert!(matches!(bearer_token(None), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(Some("Basic xyz")), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(Some("Bearer  ")), Err(AuthError::MissingToken)));
    }
}
