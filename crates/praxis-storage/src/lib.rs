//! # praxis-storage
//!
//! Storage abstraction layer for the Praxis clinic server.
//!
//! This crate defines the traits and types that all storage backends must
//! implement. It does not contain any implementations; those are provided by
//! separate crates (`praxis-db-memory` today).
//!
//! ## Overview
//!
//! One trait per logical table group:
//! - [`PatientStore`] — patient records
//! - [`ClinicianStore`] — psychologist profiles
//! - [`SessionStore`] — clinical session notes with versioned updates
//! - [`TransferStore`] — the atomic ownership-change unit and its history
//! - [`AuditStore`] — the append-only audit trail
//!
//! [`ClinicStore`] bundles all five so the server can hold a single
//! [`DynStore`] trait object.

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{
    AuditStore, ClinicStore, ClinicianStore, DynStore, PatientStore, SessionStore, TransferStore,
};
pub use types::{
    NewAuditEntry, NewPatient, NewPsychologist, NewSession, SessionUpdate, TransferCommand,
};

/// Convenience result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
