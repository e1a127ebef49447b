//! Clinical session notes and their immutable edit history.

use crate::id::{PatientId, PsychologistId, SessionId, UserId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// One dated encounter note, tied to exactly one patient and one responsible
/// clinician.
///
/// `version` strictly increases with every successful update and never
/// resets; `edited_by` records the author of the current version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalSession {
    pub id: SessionId,
    pub patient_id: PatientId,
    pub psychologist_id: PsychologistId,
    pub session_date: Timestamp,
    pub notes: String,
    pub version: i64,
    pub edited_by: UserId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One immutable row per superseded session version.
///
/// Written at the moment a newer version replaces it, stamped with the
/// version that was current before the update. `(session_id, version)` is
/// unique; rows are never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistory {
    pub id: i64,
    pub session_id: SessionId,
    pub version: i64,
    pub session_date: Timestamp,
    pub notes: String,
    pub edited_by: UserId,
    pub archived_at: Timestamp,
}

impl SessionHistory {
    /// Snapshot the given session as a history row, before it is overwritten.
    pub fn snapshot_of(id: i64, session: &ClinicalSession, archived_at: Timestamp) -> Self {
        Self {
            id,
            session_id: session.id,
            version: session.version,
            session_date: session.session_date,
            notes: session.notes.clone(),
            edited_by: session.edited_by,
            archived_at,
        }
    }
}
