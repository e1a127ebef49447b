//! Storage traits for the persistence abstraction layer.
//!
//! This module defines the contracts that all storage backends must
//! implement. Implementations must be thread-safe (`Send + Sync`).

use async_trait::async_trait;
use std::sync::Arc;

use praxis_core::{
    AuditLogEntry, ClinicalSession, Patient, PatientId, PatientStatus, PatientTransfer,
    Psychologist, PsychologistId, SessionHistory, SessionId, UserId,
};

use crate::error::StorageError;
use crate::types::{
    NewAuditEntry, NewPatient, NewPsychologist, NewSession, SessionUpdate, TransferCommand,
};

/// Patient record persistence.
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Creates a new patient record with status `active` and no explicit
    /// owner.
    async fn create_patient(&self, new: NewPatient) -> Result<Patient, StorageError>;

    /// Reads a patient by id. Returns `None` if absent; errors are reserved
    /// for infrastructure failures.
    async fn get_patient(&self, id: PatientId) -> Result<Option<Patient>, StorageError>;

    /// Changes a patient's lifecycle status. Patients are never removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist.
    async fn set_patient_status(
        &self,
        id: PatientId,
        status: PatientStatus,
    ) -> Result<Patient, StorageError>;
}

/// Psychologist profile directory.
#[async_trait]
pub trait ClinicianStore: Send + Sync {
    async fn create_psychologist(
        &self,
        new: NewPsychologist,
    ) -> Result<Psychologist, StorageError>;

    async fn get_psychologist(
        &self,
        id: PsychologistId,
    ) -> Result<Option<Psychologist>, StorageError>;

    /// Looks up the profile belonging to a user account, if any.
    async fn get_psychologist_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Psychologist>, StorageError>;
}

/// Clinical session notes with versioned updates and immutable history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a session note at version 1.
    async fn create_session(&self, new: NewSession) -> Result<ClinicalSession, StorageError>;

    async fn get_session(&self, id: SessionId) -> Result<Option<ClinicalSession>, StorageError>;

    /// Lists a patient's sessions, newest session date first.
    async fn list_sessions(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<ClinicalSession>, StorageError>;

    /// Versioned update with compare-and-swap semantics.
    ///
    /// The patch is applied only when the stored version still equals
    /// `expected_version`; in the same atomic step the pre-update state is
    /// archived as a history row stamped with the old version, the version
    /// is incremented, and `edited_by` is set to `editor`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    /// Returns `StorageError::VersionConflict` if a concurrent update won
    /// the race; the caller's change is not applied and no history row is
    /// written.
    async fn update_session(
        &self,
        id: SessionId,
        expected_version: i64,
        editor: UserId,
        patch: SessionUpdate,
    ) -> Result<ClinicalSession, StorageError>;

    /// Lists archived versions of a session, oldest version first.
    async fn list_session_history(
        &self,
        id: SessionId,
    ) -> Result<Vec<SessionHistory>, StorageError>;
}

/// The atomic ownership-transfer unit and its immutable history.
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Reassigns a patient to a new owner and appends the transfer row as
    /// one atomic unit: either both the ownership mutation and the history
    /// insert commit, or neither does.
    ///
    /// Concurrent transfers of the same patient serialize; the later one
    /// observes the earlier one's new owner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist.
    /// Returns `StorageError::AlreadyOwner` if the target clinician already
    /// owns the patient at commit time.
    async fn execute_transfer(
        &self,
        cmd: TransferCommand,
    ) -> Result<PatientTransfer, StorageError>;

    /// Lists a patient's completed transfers, newest first.
    async fn list_transfers(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<PatientTransfer>, StorageError>;
}

/// Append-only audit trail.
///
/// Deliberately exposes no update or delete operation: immutability of the
/// trail is part of the interface contract, not a backend courtesy.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Appends one audit entry.
    async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, StorageError>;

    /// Lists a patient's audit entries, newest first.
    async fn list_audit_by_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<AuditLogEntry>, StorageError>;
}

/// All store facets bundled, so the server can hold one trait object.
pub trait ClinicStore:
    PatientStore + ClinicianStore + SessionStore + TransferStore + AuditStore
{
}

impl<T> ClinicStore for T where
    T: PatientStore + ClinicianStore + SessionStore + TransferStore + AuditStore
{
}

/// Shared handle to a storage backend.
pub type DynStore = Arc<dyn ClinicStore>;
