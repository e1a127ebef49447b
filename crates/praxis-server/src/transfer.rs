//! Patient ownership transfers.
//!
//! Transfers are an admin-only operation and the only way a patient's
//! owning clinician changes after creation. Preconditions are checked in a
//! fixed order so a caller failing several of them always sees the same
//! error, and the ownership mutation plus the transfer row commit as one
//! atomic unit in the store.

use praxis_api::ApiError;
use praxis_core::{AuditAction, PatientTransfer, PsychologistId, ResourceKind, Subject, parse_id};
use praxis_storage::{ClinicianStore, DynStore, PatientStore, TransferCommand, TransferStore};
use serde::Deserialize;

use crate::audit::{AuditEntryBuilder, AuditService, RequestMeta};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub to_psychologist_id: Option<PsychologistId>,
    pub reason: Option<String>,
}

#[derive(Clone)]
pub struct TransferCoordinator {
    store: DynStore,
    audit: AuditService,
}

impl TransferCoordinator {
    pub fn new(store: DynStore, audit: AuditService) -> Self {
        Self { store, audit }
    }

    /// Transfer a patient to a new owning clinician.
    ///
    /// Precondition order: caller must be an admin (denied attempts are
    /// audited as `transfer_denied`), the target clinician must be named
    /// and exist, the patient must exist, and the target must differ from
    /// the current owner. Only then does the store commit the ownership
    /// change together with the transfer row.
    pub async fn transfer(
        &self,
        subject: &Subject,
        raw_patient_id: &str,
        req: TransferRequest,
        meta: &RequestMeta,
    ) -> Result<PatientTransfer, ApiError> {
        if !subject.is_admin() {
            let mut builder = AuditEntryBuilder::new(
                subject.user_id,
                AuditAction::TransferDenied,
                ResourceKind::PatientTransfer,
            )
            .meta(meta)
            .details("not_admin");
            // The raw id may be garbage here; reference the patient only
            // when it parses.
            if let Ok(id) = parse_id(raw_patient_id) {
                builder = builder.patient(id);
            }
            self.audit.record(builder).await;
            return Err(ApiError::forbidden(
                "only administrators may transfer patients",
            ));
        }

        let patient_id =
            parse_id(raw_patient_id).map_err(|_| ApiError::bad_request("invalid patient id"))?;

        let to_psychologist_id = req
            .to_psychologist_id
            .ok_or_else(|| ApiError::bad_request("toPsychologistId is required"))?;

        if self
            .store
            .get_psychologist(to_psychologist_id)
            .await?
            .is_none()
        {
            return Err(ApiError::not_found(format!(
                "psychologist {to_psychologist_id} not found"
            )));
        }

        let patient = self
            .store
            .get_patient(patient_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("patient {patient_id} not found")))?;

        if patient.owner_psychologist_id == Some(to_psychologist_id) {
            return Err(ApiError::conflict(
                "patient is already assigned to this clinician",
            ));
        }

        let transfer = self
            .store
            .execute_transfer(TransferCommand {
                patient_id,
                to_psychologist_id,
                transferred_by_admin_id: subject.user_id,
                reason: req.reason.clone(),
            })
            .await?;

        let from = transfer
            .from_psychologist_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        let mut details = format!("from={from} to={to_psychologist_id}");
        if let Some(reason) = &transfer.reason {
            details.push_str(&format!(" reason={reason}"));
        }
        self.audit
            .record(
                AuditEntryBuilder::new(
                    subject.user_id,
                    AuditAction::PatientTransfer,
                    ResourceKind::PatientTransfer,
                )
                .resource_id(transfer.id)
                .patient(patient_id)
                .meta(meta)
                .details(details),
            )
            .await;

        Ok(transfer)
    }

    /// List a patient's transfer history, newest first. Admin-only.
    pub async fn list(
        &self,
        subject: &Subject,
        raw_patient_id: &str,
    ) -> Result<Vec<PatientTransfer>, ApiError> {
        if !subject.is_admin() {
            return Err(ApiError::forbidden(
                "only administrators may view transfer history",
            ));
        }
        let patient_id =
            parse_id(raw_patient_id).map_err(|_| ApiError::bad_request("invalid patient id"))?;
        if self.store.get_patient(patient_id).await?.is_none() {
            return Err(ApiError::not_found(format!(
                "patient {patient_id} not found"
            )));
        }
        Ok(self.store.list_transfers(patient_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use axum::http::StatusCode;
    use praxis_db_memory::InMemoryStore;
    use praxis_storage::{AuditStore, NewPatient, NewPsychologist};
    use std::sync::Arc;

    struct Fixture {
        coordinator: TransferCoordinator,
        store: DynStore,
    }

    async fn fixture() -> Fixture {
        let store: DynStore = Arc::new(InMemoryStore::new());
        let audit = AuditService::new(store.clone(), AuditConfig::default());
        Fixture {
            coordinator: TransferCoordinator::new(store.clone(), audit),
            store,
        }
    }

    async fn seed_patient(store: &DynStore) -> i64 {
        store
            .create_patient(NewPatient {
                full_name: "Jamie Doe".to_string(),
                created_by_user_id: 1,
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_psychologist(store: &DynStore, user_id: i64) -> i64 {
        store
            .create_psychologist(NewPsychologist {
                user_id,
                full_name: "Dr. Reyes".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn non_admin_is_denied_and_audited_before_any_validation() {
        let f = fixture().await;
        let patient_id = seed_patient(&f.store).await;

        let subject = Subject::psychologist(7, 1);
        let err = f
            .coordinator
            .transfer(
                &subject,
                &patient_id.to_string(),
                TransferRequest {
                    to_psychologist_id: None, // would be a 400 for an admin
                    reason: None,
                },
                &RequestMeta::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let trail = f.store.list_audit_by_patient(patient_id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::TransferDenied);
        assert_eq!(trail[0].details.as_deref(), Some("not_admin"));
    }

    #[tokio::test]
    async fn missing_target_is_bad_request() {
        let f = fixture().await;
        let patient_id = seed_patient(&f.store).await;
        let err = f
            .coordinator
            .transfer(
                &Subject::admin(1),
                &patient_id.to_string(),
                TransferRequest {
                    to_psychologist_id: None,
                    reason: None,
                },
                &RequestMeta::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let f = fixture().await;
        let patient_id = seed_patient(&f.store).await;
        let err = f
            .coordinator
            .transfer(
                &Subject::admin(1),
                &patient_id.to_string(),
                TransferRequest {
                    to_psychologist_id: Some(404),
                    reason: None,
                },
                &RequestMeta::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn transfer_to_current_owner_conflicts() {
        let f = fixture().await;
        let patient_id = seed_patient(&f.store).await;
        let psy = seed_psychologist(&f.store, 2).await;

        f.coordinator
            .transfer(
                &Subject::admin(1),
                &patient_id.to_string(),
                TransferRequest {
                    to_psychologist_id: Some(psy),
                    reason: None,
                },
                &RequestMeta::default(),
            )
            .await
            .unwrap();

        let err = f
            .coordinator
            .transfer(
                &Subject::admin(1),
                &patient_id.to_string(),
                TransferRequest {
                    to_psychologist_id: Some(psy),
                    reason: None,
                },
                &RequestMeta::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_body().error.code, "conflict");
    }

    #[tokio::test]
    async fn successful_transfer_moves_ownership_and_audits() {
        let f = fixture().await;
        let patient_id = seed_patient(&f.store).await;
        let psy = seed_psychologist(&f.store, 2).await;

        let transfer = f
            .coordinator
            .transfer(
                &Subject::admin(1),
                &patient_id.to_string(),
                TransferRequest {
                    to_psychologist_id: Some(psy),
                    reason: Some("clinician change requested".to_string()),
                },
                &RequestMeta::default(),
            )
            .await
            .unwrap();
        assert_eq!(transfer.from_psychologist_id, None);
        assert_eq!(transfer.to_psychologist_id, psy);

        let patient = f.store.get_patient(patient_id).await.unwrap().unwrap();
        assert_eq!(patient.owner_psychologist_id, Some(psy));

        let trail = f.store.list_audit_by_patient(patient_id).await.unwrap();
        assert!(
            trail
                .iter()
                .any(|e| e.action == AuditAction::PatientTransfer)
        );
    }

    #[tokio::test]
    async fn transfer_succeeds_when_audit_write_fails() {
        let store: DynStore = Arc::new(crate::audit::testing::FailingAuditStore::new());
        let audit = AuditService::new(store.clone(), AuditConfig::default());
        let coordinator = TransferCoordinator::new(store.clone(), audit);
        let patient_id = seed_patient(&store).await;
        let psy = seed_psychologist(&store, 2).await;

        let transfer = coordinator
            .transfer(
                &Subject::admin(1),
                &patient_id.to_string(),
                TransferRequest {
                    to_psychologist_id: Some(psy),
                    reason: None,
                },
                &RequestMeta::default(),
            )
            .await
            .unwrap();
        assert_eq!(transfer.to_psychologist_id, psy);

        // Ownership moved even though the trail entry was lost.
        let patient = store.get_patient(patient_id).await.unwrap().unwrap();
        assert_eq!(patient.owner_psychologist_id, Some(psy));
    }

    #[tokio::test]
    async fn listing_requires_admin() {
        let f = fixture().await;
        let patient_id = seed_patient(&f.store).await;

        let err = f
            .coordinator
            .list(&Subject::psychologist(7, 1), &patient_id.to_string())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let rows = f
            .coordinator
            .list(&Subject::admin(1), &patient_id.to_string())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
