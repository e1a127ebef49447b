//! Clinical session notes.
//!
//! Session notes are versioned: every accepted edit archives the previous
//! state as an immutable history row and bumps the version. Concurrent
//! edits of the same note are resolved by compare-and-swap in the store;
//! the loser gets a conflict instead of silently overwriting the winner.
//!
//! Access control happens before any of this: callers pass in a patient
//! record already resolved through the access guard.

use praxis_api::ApiError;
use praxis_core::{
    AuditAction, ClinicalSession, Patient, PsychologistId, ResourceKind, SessionHistory, SessionId,
    Subject, Timestamp, parse_id,
};
use praxis_storage::{DynStore, NewSession, SessionStore, SessionUpdate};
use serde::Deserialize;

use crate::audit::{AuditEntryBuilder, AuditService, RequestMeta};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Clinician the session belongs to. Defaults to the caller's own
    /// profile when omitted.
    pub psychologist_id: Option<PsychologistId>,
    pub session_date: Timestamp,
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub session_date: Option<Timestamp>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct SessionVersioner {
    store: DynStore,
    audit: AuditService,
}

impl SessionVersioner {
    pub fn new(store: DynStore, audit: AuditService) -> Self {
        Self { store, audit }
    }

    pub async fn create(
        &self,
        subject: &Subject,
        patient: &Patient,
        req: CreateSessionRequest,
        meta: &RequestMeta,
    ) -> Result<ClinicalSession, ApiError> {
        let psychologist_id = req
            .psychologist_id
            .or(subject.psychologist_profile_id)
            .ok_or_else(|| ApiError::bad_request("psychologistId is required"))?;

        let session = self
            .store
            .create_session(NewSession {
                patient_id: patient.id,
                psychologist_id,
                session_date: req.session_date,
                notes: req.notes,
                created_by: subject.user_id,
            })
            .await?;

        self.audit
            .record(
                AuditEntryBuilder::new(
                    subject.user_id,
                    AuditAction::Create,
                    ResourceKind::ClinicalSession,
                )
                .resource_id(session.id)
                .patient(patient.id)
                .meta(meta),
            )
            .await;

        Ok(session)
    }

    pub async fn list(&self, patient: &Patient) -> Result<Vec<ClinicalSession>, ApiError> {
        Ok(self.store.list_sessions(patient.id).await?)
    }

    /// Apply a partial edit to a session note.
    ///
    /// The current version is read first and used as the compare-and-swap
    /// expectation, so an edit racing with another writer surfaces as a
    /// conflict rather than a lost update.
    pub async fn update(
        &self,
        subject: &Subject,
        patient: &Patient,
        raw_session_id: &str,
        req: UpdateSessionRequest,
        meta: &RequestMeta,
    ) -> Result<ClinicalSession, ApiError> {
        let patch = SessionUpdate {
            session_date: req.session_date,
            notes: req.notes,
        };
        if patch.is_empty() {
            return Err(ApiError::bad_request("no fields to update"));
        }

        let current = self.resolve(patient, raw_session_id).await?;

        let updated = self
            .store
            .update_session(current.id, current.version, subject.user_id, patch)
            .await?;

        self.audit
            .record(
                AuditEntryBuilder::new(
                    subject.user_id,
                    AuditAction::Update,
                    ResourceKind::ClinicalSession,
                )
                .resource_id(updated.id)
                .patient(patient.id)
                .meta(meta)
                .details(format!("version={}", updated.version)),
            )
            .await;

        Ok(updated)
    }

    /// Archived versions of a session, oldest first.
    pub async fn history(
        &self,
        patient: &Patient,
        raw_session_id: &str,
    ) -> Result<Vec<SessionHistory>, ApiError> {
        let session = self.resolve(patient, raw_session_id).await?;
        Ok(self.store.list_session_history(session.id).await?)
    }

    /// Load a session and check it belongs to the given patient.
    ///
    /// A session reached through the wrong patient's URL reads as absent,
    /// the same as an unknown id.
    async fn resolve(
        &self,
        patient: &Patient,
        raw_session_id: &str,
    ) -> Result<ClinicalSession, ApiError> {
        let session_id: SessionId =
            parse_id(raw_session_id).map_err(|_| ApiError::bad_request("invalid session id"))?;
        let session = self
            .store
            .get_session(session_id)
            .await?
            .filter(|s| s.patient_id == patient.id)
            .ok_or_else(|| ApiError::not_found(format!("session {session_id} not found")))?;
        Ok(session)
    }
}
