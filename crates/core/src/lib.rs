//! # Clinic Core
//!
//! Core business logic for the clinic management back end.
//!
//! This crate contains the domain and its persistence:
//! - Domain models and validation of incoming values
//! - SQLite schema migrations and repositories (plain SQL via `sqlx`)
//! - Services enforcing scheduling, workflow and authorisation rules, with audit logging
//! - CSV export of operational reports
//!
//! **No API concerns**: token handling, HTTP routing and transport types belong in `api-shared`
//! and `api-rest`.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod password;
pub mod repositories;
pub mod services;
pub mod validation;

pub use clinic_types;
pub use config::{ClinicHours, CoreConfig};
pub use error::{ClinicError, ClinicResult};
pub use services::Clinic;
pub use sqlx;
