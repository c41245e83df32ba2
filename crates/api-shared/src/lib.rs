//! # API Shared
//!
//! Shared utilities and definitions for the clinic APIs.
//!
//! Contains:
//! - Transport types (`dto` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Authentication utilities (JWT issuing and validation)
//!
//! Used by `api-rest` and the workspace binaries.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{AuthConfig, AuthError, Claims, IssuedToken};
pub use health::{HealthRes, HealthService};
