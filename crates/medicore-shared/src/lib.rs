//! # medicore-shared
//!
//! Domain types shared by every MediCore crate: directory users and their
//! permissions, appointments and the static catalog, signed session tokens,
//! password hashing and the error taxonomy surfaced to the portal.

pub mod appointment;
pub mod catalog;
pub mod constants;
pub mod error;
pub mod password;
pub mod signing;
pub mod token;
pub mod types;
pub mod user;

pub use error::{AuthError, MedicoreError, SessionDecodeError};
pub use types::{AppointmentId, CallId, UserId};
