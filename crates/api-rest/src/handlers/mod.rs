//! HTTP handlers, grouped by resource.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod clinical;
pub mod patients;
pub mod staff;
