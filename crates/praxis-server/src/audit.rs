//! Audit trail service.
//!
//! Every access decision and mutation against clinical data is recorded as
//! an append-only audit entry. Writes are best-effort from the caller's
//! point of view: a failed audit write is logged and never turns a
//! successful clinical operation into an error response.

use std::net::IpAddr;

use axum::http::HeaderMap;
use praxis_core::{AuditAction, AuditLogEntry, PatientId, ResourceKind, UserId};
use praxis_storage::{AuditStore, DynStore, NewAuditEntry, StorageResult};

use crate::config::AuditConfig;

/// Request-scoped metadata attached to audit entries.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
}

/// Extract audit metadata from HTTP headers.
///
/// Client IP comes from `X-Forwarded-For` (first hop) or `X-Real-IP`; the
/// request id is the one stamped by the request_id middleware.
pub fn extract_request_meta(headers: &HeaderMap) -> RequestMeta {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .and_then(|s| s.trim().parse().ok());

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    RequestMeta {
        ip_address,
        user_agent,
        request_id,
    }
}

/// Builder for audit entries.
#[derive(Debug, Clone)]
pub struct AuditEntryBuilder {
    user_id: UserId,
    action: AuditAction,
    resource_type: ResourceKind,
    resource_id: Option<i64>,
    patient_id: Option<PatientId>,
    ip_address: Option<IpAddr>,
    user_agent: Option<String>,
    details: Option<String>,
}

impl AuditEntryBuilder {
    pub fn new(user_id: UserId, action: AuditAction, resource_type: ResourceKind) -> Self {
        Self {
            user_id,
            action,
            resource_type,
            resource_id: None,
            patient_id: None,
            ip_address: None,
            user_agent: None,
            details: None,
        }
    }

    pub fn resource_id(mut self, id: i64) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn patient(mut self, id: PatientId) -> Self {
        self.patient_id = Some(id);
        self
    }

    pub fn meta(mut self, meta: &RequestMeta) -> Self {
        self.ip_address = meta.ip_address;
        self.user_agent = meta.user_agent.clone();
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn build(self) -> NewAuditEntry {
        NewAuditEntry {
            user_id: self.user_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            patient_id: self.patient_id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            details: self.details,
        }
    }
}

/// Audit service wrapping the audit store.
#[derive(Clone)]
pub struct AuditService {
    store: DynStore,
    config: AuditConfig,
}

impl AuditService {
    pub fn new(store: DynStore, config: AuditConfig) -> Self {
        Self { store, config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Check whether an action should produce an entry.
    ///
    /// Denials are always written while auditing is enabled. Successful
    /// views can be turned off separately; everything else follows the
    /// master switch.
    pub fn should_log(&self, action: AuditAction) -> bool {
        if !self.config.enabled {
            return false;
        }
        if action.is_denial() {
            return true;
        }
        match action {
            AuditAction::View => self.config.log_read_operations,
            _ => true,
        }
    }

    /// Record an audit entry, swallowing write failures.
    pub async fn record(&self, builder: AuditEntryBuilder) {
        let action = builder.action;
        if !self.should_log(action) {
            return;
        }

        let entry = builder.build();
        if let Err(e) = self.store.append_audit(entry).await {
            tracing::warn!(
                error = %e,
                action = %action,
                "failed to write audit entry"
            );
        }
    }

    /// List the trail for one patient, newest first.
    pub async fn list_by_patient(&self, patient_id: PatientId) -> StorageResult<Vec<AuditLogEntry>> {
        self.store.list_audit_by_patient(patient_id).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use praxis_db_memory::InMemoryStore;
    use std::sync::Arc;

    fn service(enabled: bool, log_reads: bool) -> AuditService {
        AuditService::new(
            Arc::new(InMemoryStore::new()),
            AuditConfig {
                enabled,
                log_read_operations: log_reads,
            },
        )
    }

    #[test]
    fn denials_logged_even_with_reads_off() {
        let svc = service(true, false);
        assert!(!svc.should_log(AuditAction::View));
        assert!(svc.should_log(AuditAction::AccessDenied));
        assert!(svc.should_log(AuditAction::TransferDenied));
        assert!(svc.should_log(AuditAction::Update));
    }

    #[test]
    fn nothing_logged_when_disabled() {
        let svc = service(false, true);
        assert!(!svc.should_log(AuditAction::AccessDenied));
        assert!(!svc.should_log(AuditAction::Create));
    }

    #[test]
    fn meta_extraction_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.9, 172.16.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.5"));
        headers.insert(
            axum::http::header::USER_AGENT,
            HeaderValue::from_static("praxis-test"),
        );
        let meta = extract_request_meta(&headers);
        assert_eq!(meta.ip_address, Some("10.0.0.9".parse().unwrap()));
        assert_eq!(meta.user_agent.as_deref(), Some("praxis-test"));
    }

    #[tokio::test]
    async fn record_appends_entry() {
        let store: DynStore = Arc::new(InMemoryStore::new());
        let svc = AuditService::new(store.clone(), AuditConfig::default());
        svc.record(
            AuditEntryBuilder::new(1, AuditAction::View, ResourceKind::Patient)
                .resource_id(10)
                .patient(10)
                .details("role=admin"),
        )
        .await;

        let entries = store.list_audit_by_patient(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::View);
        assert_eq!(entries[0].details.as_deref(), Some("role=admin"));
    }

    #[tokio::test]
    async fn record_swallows_append_failures() {
        let store: DynStore = Arc::new(super::testing::FailingAuditStore::new());
        let svc = AuditService::new(store, AuditConfig::default());
        // Completes normally; the storage failure is logged, not surfaced.
        svc.record(
            AuditEntryBuilder::new(1, AuditAction::AccessDenied, ResourceKind::Patient)
                .patient(10),
        )
        .await;
    }

    #[tokio::test]
    async fn disabled_service_records_nothing() {
        let store: DynStore = Arc::new(InMemoryStore::new());
        let svc = AuditService::new(
            store.clone(),
            AuditConfig {
                enabled: false,
                log_read_operations: true,
            },
        );
        svc.record(
            AuditEntryBuilder::new(1, AuditAction::AccessDenied, ResourceKind::Patient).patient(10),
        )
        .await;
        assert!(store.list_audit_by_patient(10).await.unwrap().is_empty());
    }
}
