//! Constants used throughout the clinic core crate.
//!
//! Defaults for runtime configuration and the bounds applied by validation live here so
//! that the API, CLI and services agree on them.

/// Default database location when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://clinic.db";

/// Default opening time of the clinic (local time).
pub const DEFAULT_OPENS_AT: &str = "08:00";

/// Default closing time of the clinic (local time).
pub const DEFAULT_CLOSES_AT: &str = "18:00";

/// Default working days of the clinic.
pub const DEFAULT_WORKING_DAYS: &str = "mon,tue,wed,thu,fri";

/// Default appointment length in minutes.
pub const DEFAULT_APPOINTMENT_MINUTES: u32 = 30;

/// Shortest bookable appointment.
pub const MIN_APPOINTMENT_MINUTES: u32 = 10;

/// Longest bookable appointment.
pub const MAX_APPOINTMENT_MINUTES: u32 = 240;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound for any requested page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Minimum length for employee passwords.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum prescription duration in days.
pub const MAX_PRESCRIPTION_DAYS: u32 = 365;

/// Accepted blood type notations.
pub const BLOOD_TYPES: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

/// Maximum length of free-text clinical fields.
pub const MAX_NOTE_LEN: usize = 4_000;

/// Maximum length of names and short labels.
pub const MAX_NAME_LEN: usize = 100;
