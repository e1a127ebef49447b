//! Patient and clinician profile records.

use crate::id::{PatientId, PsychologistId, UserId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a patient record. Patients are never hard-deleted;
/// deactivation and discharge are status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Active,
    Inactive,
    Discharged,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Active => "active",
            PatientStatus::Inactive => "inactive",
            PatientStatus::Discharged => "discharged",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clinical record subject.
///
/// Ownership is carried by two fields: the explicit `owner_psychologist_id`
/// (set by transfer) and the implicit `created_by_user_id` (the registering
/// user, which covers legacy records that predate explicit ownership). Both
/// are equally valid ownership proofs; the access guard checks them with a
/// logical OR on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub full_name: String,
    pub status: PatientStatus,
    pub owner_psychologist_id: Option<PsychologistId>,
    pub created_by_user_id: UserId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A clinician profile that patient ownership can point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Psychologist {
    pub id: PsychologistId,
    pub user_id: UserId,
    pub full_name: String,
    pub created_at: Timestamp,
}
