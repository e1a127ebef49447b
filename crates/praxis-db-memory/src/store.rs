use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use tokio::sync::RwLock;

use praxis_core::{
    AuditLogEntry, ClinicalSession, Patient, PatientId, PatientStatus, PatientTransfer,
    Psychologist, PsychologistId, SessionHistory, SessionId, UserId, now_utc,
};
use praxis_storage::{
    AuditStore, ClinicianStore, NewAuditEntry, NewPatient, NewPsychologist, NewSession,
    PatientStore, SessionStore, SessionUpdate, StorageError, TransferCommand, TransferStore,
};

/// In-memory clinic storage backend.
///
/// Patients and psychologists live in papaya lock-free maps for cheap
/// concurrent reads (the access guard resolves a patient on every request).
/// Patient writers go through papaya's atomic `update` and touch only their
/// own fields, so a status change and an ownership transfer racing on the
/// same record never clobber each other.
/// Sessions, history, transfers and the audit trail sit behind tokio
/// `RwLock`s; the write lock doubles as the serialization point for the two
/// operations that need multi-step atomicity:
///
/// - `execute_transfer` holds the transfer-log write lock across the
///   ownership mutation and the history insert, so concurrent transfers of
///   the same patient serialize and the second observes the first's owner;
/// - `update_session` holds the session write lock across the version
///   check, the history snapshot and the patch, giving compare-and-swap
///   semantics.
#[derive(Debug)]
pub struct InMemoryStore {
    patients: Arc<PapayaHashMap<PatientId, Patient>>,
    psychologists: Arc<PapayaHashMap<PsychologistId, Psychologist>>,
    sessions: RwLock<HashMap<SessionId, ClinicalSession>>,
    session_history: RwLock<HashMap<SessionId, Vec<SessionHistory>>>,
    transfers: RwLock<HashMap<PatientId, Vec<PatientTransfer>>>,
    audit_log: RwLock<Vec<AuditLogEntry>>,
    next_patient_id: AtomicI64,
    next_psychologist_id: AtomicI64,
    next_session_id: AtomicI64,
    next_history_id: AtomicI64,
    next_transfer_id: AtomicI64,
    next_audit_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            patients: Arc::new(PapayaHashMap::new()),
            psychologists: Arc::new(PapayaHashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            session_history: RwLock::new(HashMap::new()),
            transfers: RwLock::new(HashMap::new()),
            audit_log: RwLock::new(Vec::new()),
            next_patient_id: AtomicI64::new(1),
            next_psychologist_id: AtomicI64::new(1),
            next_session_id: AtomicI64::new(1),
            next_history_id: AtomicI64::new(1),
            next_transfer_id: AtomicI64::new(1),
            next_audit_id: AtomicI64::new(1),
        }
    }

    fn next_id(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatientStore for InMemoryStore {
    async fn create_patient(&self, new: NewPatient) -> Result<Patient, StorageError> {
        let now = now_utc();
        let patient = Patient {
            id: Self::next_id(&self.next_patient_id),
            full_name: new.full_name,
            status: PatientStatus::Active,
            owner_psychologist_id: None,
            created_by_user_id: new.created_by_user_id,
            created_at: now,
            updated_at: now,
        };
        let guard = self.patients.pin();
        guard.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn get_patient(&self, id: PatientId) -> Result<Option<Patient>, StorageError> {
        let guard = self.patients.pin();
        Ok(guard.get(&id).cloned())
    }

    async fn set_patient_status(
        &self,
        id: PatientId,
        status: PatientStatus,
    ) -> Result<Patient, StorageError> {
        // Atomic field-scoped update: a stale whole-record insert here could
        // revert an ownership change committed by a concurrent transfer.
        let guard = self.patients.pin();
        let updated = guard
            .update(id, |current| {
                let mut p = current.clone();
                p.status = status;
                p.updated_at = now_utc();
                p
            })
            .ok_or_else(|| StorageError::not_found("patient", id))?;
        Ok(updated.clone())
    }
}

#[async_trait]
impl ClinicianStore for InMemoryStore {
    async fn create_psychologist(
        &self,
        new: NewPsychologist,
    ) -> Result<Psychologist, StorageError> {
        let psychologist = Psychologist {
            id: Self::next_id(&self.next_psychologist_id),
            user_id: new.user_id,
            full_name: new.full_name,
            created_at: now_utc(),
        };
        let guard = self.psychologists.pin();
        guard.insert(psychologist.id, psychologist.clone());
        Ok(psychologist)
    }

    async fn get_psychologist(
        &self,
        id: PsychologistId,
    ) -> Result<Option<Psychologist>, StorageError> {
        let guard = self.psychologists.pin();
        Ok(guard.get(&id).cloned())
    }

    async fn get_psychologist_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<Psychologist>, StorageError> {
        let guard = self.psychologists.pin();
        Ok(guard
            .iter()
            .find(|(_, p)| p.user_id == user_id)
            .map(|(_, p)| p.clone()))
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, new: NewSession) -> Result<ClinicalSession, StorageError> {
        let now = now_utc();
        let session = ClinicalSession {
            id: Self::next_id(&self.next_session_id),
            patient_id: new.patient_id,
            psychologist_id: new.psychologist_id,
            session_date: new.session_date,
            notes: new.notes,
            version: 1,
            edited_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<ClinicalSession>, StorageError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id).cloned())
    }

    async fn list_sessions(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<ClinicalSession>, StorageError> {
        let sessions = self.sessions.read().await;
        let mut result: Vec<ClinicalSession> = sessions
            .values()
            .filter(|s| s.patient_id == patient_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.session_date.cmp(&a.session_date).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    async fn update_session(
        &self,
        id: SessionId,
        expected_version: i64,
        editor: UserId,
        patch: SessionUpdate,
    ) -> Result<ClinicalSession, StorageError> {
        // Lock order: sessions before session_history.
        let mut sessions = self.sessions.write().await;
        let current = sessions
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("clinical_session", id))?;

        if current.version != expected_version {
            return Err(StorageError::version_conflict(
                expected_version,
                current.version,
            ));
        }

        let snapshot = SessionHistory::snapshot_of(
            Self::next_id(&self.next_history_id),
            current,
            now_utc(),
        );
        let mut history = self.session_history.write().await;
        history.entry(id).or_default().push(snapshot);

        if let Some(date) = patch.session_date {
            current.session_date = date;
        }
        if let Some(notes) = patch.notes {
            current.notes = notes;
        }
        current.version += 1;
        current.edited_by = editor;
        current.updated_at = now_utc();

        Ok(current.clone())
    }

    async fn list_session_history(
        &self,
        id: SessionId,
    ) -> Result<Vec<SessionHistory>, StorageError> {
        let history = self.session_history.read().await;
        Ok(history.get(&id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl TransferStore for InMemoryStore {
    async fn execute_transfer(
        &self,
        cmd: TransferCommand,
    ) -> Result<PatientTransfer, StorageError> {
        // The transfer-log write lock is the single-writer section: owner
        // check, ownership mutation and history insert all happen inside it,
        // so a concurrent transfer of the same patient observes this one's
        // committed owner.
        let mut transfers = self.transfers.write().await;

        let guard = self.patients.pin();
        let current = guard
            .get(&cmd.patient_id)
            .ok_or_else(|| StorageError::not_found("patient", cmd.patient_id))?;

        let from = current.owner_psychologist_id;
        if from == Some(cmd.to_psychologist_id) {
            return Err(StorageError::already_owner(
                cmd.patient_id,
                cmd.to_psychologist_id,
            ));
        }

        // Field-scoped update, like `set_patient_status`: a concurrent
        // status change must survive the ownership mutation. Only transfers
        // write the owner field, and they are serialized by the lock above,
        // so the `from` read stays valid through the update.
        guard.update(cmd.patient_id, |current| {
            let mut p = current.clone();
            p.owner_psychologist_id = Some(cmd.to_psychologist_id);
            p.updated_at = now_utc();
            p
        });

        let transfer = PatientTransfer {
            id: Self::next_id(&self.next_transfer_id),
            patient_id: cmd.patient_id,
            from_psychologist_id: from,
            to_psychologist_id: cmd.to_psychologist_id,
            transferred_by_admin_id: cmd.transferred_by_admin_id,
            reason: cmd.reason,
            transferred_at: now_utc(),
        };
        transfers
            .entry(cmd.patient_id)
            .or_default()
            .push(transfer.clone());

        Ok(transfer)
    }

    async fn list_transfers(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<PatientTransfer>, StorageError> {
        let transfers = self.transfers.read().await;
        let mut result = transfers.get(&patient_id).cloned().unwrap_or_default();
        result.reverse();
        Ok(result)
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, StorageError> {
        let row = AuditLogEntry {
            id: Self::next_id(&self.next_audit_id),
            user_id: entry.user_id,
            action: entry.action,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            patient_id: entry.patient_id,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            details: entry.details,
            recorded_at: now_utc(),
        };
        let mut log = self.audit_log.write().await;
        log.push(row.clone());
        Ok(row)
    }

    async fn list_audit_by_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<AuditLogEntry>, StorageError> {
        let log = self.audit_log.read().await;
        Ok(log
            .iter()
            .rev()
            .filter(|e| e.patient_id == Some(patient_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use praxis_core::{AuditAction, ResourceKind, Timestamp};
    use std::str::FromStr;

    fn new_patient(name: &str, created_by: UserId) -> NewPatient {
        NewPatient {
            full_name: name.to_string(),
            created_by_user_id: created_by,
        }
    }

    fn session_for(patient_id: PatientId, date: &str) -> NewSession {
        NewSession {
            patient_id,
            psychologist_id: 5,
            session_date: Timestamp::from_str(date).unwrap(),
            notes: "note".to_string(),
            created_by: 3,
        }
    }

    #[tokio::test]
    async fn create_and_get_patient() {
        let store = InMemoryStore::new();
        let created = store.create_patient(new_patient("Jane Doe", 3)).await.unwrap();
        assert_eq!(created.status, PatientStatus::Active);
        assert_eq!(created.owner_psychologist_id, None);
        assert_eq!(created.created_by_user_id, 3);

        let fetched = store.get_patient(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(store.get_patient(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_change_keeps_record() {
        let store = InMemoryStore::new();
        let patient = store.create_patient(new_patient("Jane", 3)).await.unwrap();

        let updated = store
            .set_patient_status(patient.id, PatientStatus::Inactive)
            .await
            .unwrap();
        assert_eq!(updated.status, PatientStatus::Inactive);
        // Record still resolvable after deactivation.
        assert!(store.get_patient(patient.id).await.unwrap().is_some());

        let err = store
            .set_patient_status(999, PatientStatus::Discharged)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn psychologist_lookup_by_user() {
        let store = InMemoryStore::new();
        let psy = store
            .create_psychologist(NewPsychologist {
                user_id: 12,
                full_name: "Dr. A".to_string(),
            })
            .await
            .unwrap();

        let by_user = store.get_psychologist_by_user(12).await.unwrap().unwrap();
        assert_eq!(by_user.id, psy.id);
        assert!(store.get_psychologist_by_user(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transfer_updates_owner_and_appends_row() {
        let store = InMemoryStore::new();
        let patient = store.create_patient(new_patient("Jane", 3)).await.unwrap();

        let transfer = store
            .execute_transfer(TransferCommand {
                patient_id: patient.id,
                to_psychologist_id: 7,
                transferred_by_admin_id: 1,
                reason: Some("reassignment".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(transfer.from_psychologist_id, None);
        assert_eq!(transfer.to_psychologist_id, 7);

        let owner = store
            .get_patient(patient.id)
            .await
            .unwrap()
            .unwrap()
            .owner_psychologist_id;
        assert_eq!(owner, Some(7));

        let rows = store.list_transfers(patient.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], transfer);
    }

    #[tokio::test]
    async fn transfer_to_current_owner_is_rejected_without_row() {
        let store = InMemoryStore::new();
        let patient = store.create_patient(new_patient("Jane", 3)).await.unwrap();
        let cmd = TransferCommand {
            patient_id: patient.id,
            to_psychologist_id: 7,
            transferred_by_admin_id: 1,
            reason: None,
        };

        store.execute_transfer(cmd.clone()).await.unwrap();
        let err = store.execute_transfer(cmd).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyOwner { .. }));

        // Exactly one row, owner unchanged.
        assert_eq!(store.list_transfers(patient.id).await.unwrap().len(), 1);
        let owner = store
            .get_patient(patient.id)
            .await
            .unwrap()
            .unwrap()
            .owner_psychologist_id;
        assert_eq!(owner, Some(7));
    }

    #[tokio::test]
    async fn transfer_of_missing_patient_fails() {
        let store = InMemoryStore::new();
        let err = store
            .execute_transfer(TransferCommand {
                patient_id: 999,
                to_psychologist_id: 7,
                transferred_by_admin_id: 1,
                reason: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.list_transfers(999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_transfers_to_same_target_serialize() {
        let store = Arc::new(InMemoryStore::new());
        let patient = store.create_patient(new_patient("Jane", 3)).await.unwrap();
        let cmd = TransferCommand {
            patient_id: patient.id,
            to_psychologist_id: 7,
            transferred_by_admin_id: 1,
            reason: None,
        };

        let a = store.execute_transfer(cmd.clone());
        let b = store.execute_transfer(cmd);
        let (ra, rb) = tokio::join!(a, b);

        // Exactly one wins; the loser observes the winner's owner.
        assert!(ra.is_ok() != rb.is_ok());
        assert_eq!(store.list_transfers(patient.id).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_status_change_and_transfer_keep_both_writes() {
        let store = Arc::new(InMemoryStore::new());
        let patient = store.create_patient(new_patient("Jane", 3)).await.unwrap();

        let deactivate = {
            let store = store.clone();
            let id = patient.id;
            tokio::spawn(
                async move { store.set_patient_status(id, PatientStatus::Inactive).await },
            )
        };
        let transfer = {
            let store = store.clone();
            let id = patient.id;
            tokio::spawn(async move {
                store
                    .execute_transfer(TransferCommand {
                        patient_id: id,
                        to_psychologist_id: 7,
                        transferred_by_admin_id: 1,
                        reason: None,
                    })
                    .await
            })
        };
        deactivate.await.unwrap().unwrap();
        transfer.await.unwrap().unwrap();

        // Neither write may revert the other: a transfer row implies the
        // ownership mutation committed, and the deactivation survives it.
        let current = store.get_patient(patient.id).await.unwrap().unwrap();
        assert_eq!(current.owner_psychologist_id, Some(7));
        assert_eq!(current.status, PatientStatus::Inactive);
        assert_eq!(store.list_transfers(patient.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn session_update_bumps_version_and_archives_old_state() {
        let store = InMemoryStore::new();
        let session = store
            .create_session(session_for(10, "2024-03-01T10:00:00Z"))
            .await
            .unwrap();
        assert_eq!(session.version, 1);

        let updated = store
            .update_session(
                session.id,
                1,
                8,
                SessionUpdate {
                    notes: Some("amended".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.edited_by, 8);
        assert_eq!(updated.notes, "amended");

        let history = store.list_session_history(session.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].version, 1);
        assert_eq!(history[0].notes, "note");
    }

    #[tokio::test]
    async fn stale_session_update_conflicts_without_history_row() {
        let store = InMemoryStore::new();
        let session = store
            .create_session(session_for(10, "2024-03-01T10:00:00Z"))
            .await
            .unwrap();

        store
            .update_session(session.id, 1, 8, SessionUpdate::default())
            .await
            .unwrap();

        // Second writer still holds version 1.
        let err = store
            .update_session(session.id, 1, 9, SessionUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionConflict {
                expected: 1,
                actual: 2
            }
        ));

        let history = store.list_session_history(session.id).await.unwrap();
        assert_eq!(history.len(), 1);
        let current = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(current.version, 2);
        assert_eq!(current.edited_by, 8);
    }

    #[tokio::test]
    async fn sequential_updates_strictly_increase_version() {
        let store = InMemoryStore::new();
        let session = store
            .create_session(session_for(10, "2024-03-01T10:00:00Z"))
            .await
            .unwrap();

        let mut version = session.version;
        for editor in [4, 5, 6] {
            let updated = store
                .update_session(session.id, version, editor, SessionUpdate::default())
                .await
                .unwrap();
            assert_eq!(updated.version, version + 1);
            version = updated.version;
        }

        let history = store.list_session_history(session.id).await.unwrap();
        let versions: Vec<i64> = history.iter().map(|h| h.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn sessions_list_newest_first() {
        let store = InMemoryStore::new();
        store
            .create_session(session_for(10, "2024-03-01T10:00:00Z"))
            .await
            .unwrap();
        store
            .create_session(session_for(10, "2024-04-01T10:00:00Z"))
            .await
            .unwrap();
        store
            .create_session(session_for(11, "2024-05-01T10:00:00Z"))
            .await
            .unwrap();

        let sessions = store.list_sessions(10).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].session_date > sessions[1].session_date);
    }

    #[tokio::test]
    async fn audit_entries_list_newest_first_per_patient() {
        let store = InMemoryStore::new();
        for (action, pid) in [
            (AuditAction::View, Some(10)),
            (AuditAction::AccessDenied, Some(10)),
            (AuditAction::Create, Some(11)),
        ] {
            store
                .append_audit(NewAuditEntry {
                    user_id: 7,
                    action,
                    resource_type: ResourceKind::Patient,
                    resource_id: pid,
                    patient_id: pid,
                    ip_address: None,
                    user_agent: None,
                    details: None,
                })
                .await
                .unwrap();
        }

        let entries = store.list_audit_by_patient(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::AccessDenied);
        assert_eq!(entries[1].action, AuditAction::View);
    }
}
