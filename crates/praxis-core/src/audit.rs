//! Audit trail record types.
//!
//! Entries are append-only: nothing in any interface can update or delete a
//! row once written. The store that persists them exposes only append and
//! list operations.

use crate::id::{AuditEntryId, PatientId, UserId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Action recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    View,
    Create,
    Update,
    Delete,
    AccessDenied,
    TransferDenied,
    PatientTransfer,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::View => "view",
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::AccessDenied => "access_denied",
            AuditAction::TransferDenied => "transfer_denied",
            AuditAction::PatientTransfer => "patient_transfer",
        }
    }

    /// Denial entries are always written, regardless of the read-logging
    /// config knobs.
    pub fn is_denial(&self) -> bool {
        matches!(self, AuditAction::AccessDenied | AuditAction::TransferDenied)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of record an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Patient,
    ClinicalSession,
    PatientTransfer,
    Psychologist,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Patient => "patient",
            ResourceKind::ClinicalSession => "clinical_session",
            ResourceKind::PatientTransfer => "patient_transfer",
            ResourceKind::Psychologist => "psychologist",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable row per access decision or mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub user_id: UserId,
    pub action: AuditAction,
    pub resource_type: ResourceKind,
    pub resource_id: Option<i64>,
    /// Populated whenever the entry relates to a patient, so the trail for
    /// one patient can be listed in a single query.
    pub patient_id: Option<PatientId>,
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub details: Option<String>,
    pub recorded_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now_utc;

    #[test]
    fn action_codes() {
        assert_eq!(AuditAction::AccessDenied.as_str(), "access_denied");
        assert_eq!(AuditAction::PatientTransfer.as_str(), "patient_transfer");
        assert_eq!(AuditAction::View.as_str(), "view");
    }

    #[test]
    fn denial_classification() {
        assert!(AuditAction::AccessDenied.is_denial());
        assert!(AuditAction::TransferDenied.is_denial());
        assert!(!AuditAction::Update.is_denial());
    }

    #[test]
    fn action_serde_matches_as_str() {
        for action in [
            AuditAction::View,
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Delete,
            AuditAction::AccessDenied,
            AuditAction::TransferDenied,
            AuditAction::PatientTransfer,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn entry_serializes_camel_case() {
        let entry = AuditLogEntry {
            id: 1,
            user_id: 7,
            action: AuditAction::AccessDenied,
            resource_type: ResourceKind::Patient,
            resource_id: Some(10),
            patient_id: Some(10),
            ip_address: Some("192.168.1.1".parse().unwrap()),
            user_agent: Some("test-agent".to_string()),
            details: Some("role=psychologist owner=5".to_string()),
            recorded_at: now_utc(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "access_denied");
        assert_eq!(json["resourceType"], "patient");
        assert_eq!(json["patientId"], 10);
        assert_eq!(json["ipAddress"], "192.168.1.1");
    }
}
