//! Record-level access control for patient data.
//!
//! A psychologist may reach a patient record when they own it or when they
//! created it; admins may reach everything; receptionists nothing. Denied
//! attempts are always written to the audit trail and surface as the same
//! generic 403 regardless of which condition failed.

use praxis_api::ApiError;
use praxis_core::{AuditAction, Patient, ResourceKind, Role, Subject, parse_id};
use praxis_storage::{DynStore, PatientStore};

use crate::audit::{AuditEntryBuilder, AuditService, RequestMeta};

#[derive(Clone)]
pub struct AccessGuard {
    store: DynStore,
    audit: AuditService,
}

/// Pure ownership decision, shared by the guard and its tests.
///
/// The two psychologist conditions are OR-ed: owning the record through the
/// clinician profile, or having created it under this user account. An
/// unassigned record (no owner) is reachable only by its creator.
pub fn allows(subject: &Subject, patient: &Patient) -> bool {
    match subject.role {
        Role::Admin => true,
        Role::Psychologist => {
            let owns = patient.owner_psychologist_id.is_some()
                && patient.owner_psychologist_id == subject.psychologist_profile_id;
            owns || patient.created_by_user_id == subject.user_id
        }
        Role::Receptionist => false,
    }
}

impl AccessGuard {
    pub fn new(store: DynStore, audit: AuditService) -> Self {
        Self { store, audit }
    }

    /// Resolve a raw patient id, load the record, and enforce access.
    ///
    /// On denial an `access_denied` entry is recorded before the generic
    /// 403 is returned; the response never reveals whether ownership or
    /// role was the failing condition.
    pub async fn authorize(
        &self,
        subject: &Subject,
        raw_patient_id: &str,
        meta: &RequestMeta,
    ) -> Result<Patient, ApiError> {
        let patient_id =
            parse_id(raw_patient_id).map_err(|_| ApiError::bad_request("invalid patient id"))?;

        let patient = self
            .store
            .get_patient(patient_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("patient {patient_id} not found")))?;

        if allows(subject, &patient) {
            return Ok(patient);
        }

        let owner = patient
            .owner_psychologist_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        self.audit
            .record(
                AuditEntryBuilder::new(subject.user_id, AuditAction::AccessDenied, ResourceKind::Patient)
                    .resource_id(patient.id)
                    .patient(patient.id)
                    .meta(meta)
                    .details(format!("role={} owner={owner}", subject.role)),
            )
            .await;

        Err(ApiError::access_denied())
    }
}
