use praxis_storage::DynStore;

use crate::access::AccessGuard;
use crate::audit::AuditService;
use crate::config::AuditConfig;
use crate::sessions::SessionVersioner;
use crate::transfer::TransferCoordinator;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub guard: AccessGuard,
    pub transfers: TransferCoordinator,
    pub sessions: SessionVersioner,
    pub audit: AuditService,
}

impl AppState {
    pub fn new(store: DynStore, audit_config: AuditConfig) -> Self {
        let audit = AuditService::new(store.clone(), audit_config);
        Self {
            guard: AccessGuard::new(store.clone(), audit.clone()),
            transfers: TransferCoordinator::new(store.clone(), audit.clone()),
            sessions: SessionVersioner::new(store.clone(), audit.clone()),
            audit,
            store,
        }
    }
}
