//! New-record types passed into the stores.
//!
//! Ids and timestamps are assigned by the backend; callers only supply the
//! domain fields.

use praxis_core::{AuditAction, PatientId, PsychologistId, ResourceKind, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Input for registering a patient.
///
/// The registering user is recorded as `created_by_user_id`; the explicit
/// owner is intentionally absent at creation and only ever set by transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub full_name: String,
    pub created_by_user_id: UserId,
}

/// Input for registering a psychologist profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPsychologist {
    pub user_id: UserId,
    pub full_name: String,
}

/// Input for creating a clinical session note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub patient_id: PatientId,
    pub psychologist_id: PsychologistId,
    pub session_date: Timestamp,
    pub notes: String,
    pub created_by: UserId,
}

/// Partial update of a session note. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub session_date: Option<Timestamp>,
    pub notes: Option<String>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.session_date.is_none() && self.notes.is_none()
    }
}

/// The atomic ownership-change unit handed to [`crate::TransferStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferCommand {
    pub patient_id: PatientId,
    pub to_psychologist_id: PsychologistId,
    pub transferred_by_admin_id: UserId,
    pub reason: Option<String>,
}

/// Input for appending an audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub user_id: UserId,
    pub action: AuditAction,
    pub resource_type: ResourceKind,
    pub resource_id: Option<i64>,
    pub patient_id: Option<PatientId>,
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub details: Option<String>,
}
