use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};
use praxis_storage::DynStore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers, middleware as app_middleware, state::AppState};

pub struct PraxisServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, store: DynStore) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let state = AppState::new(store, cfg.audit.clone());

    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Patient records
        .route("/patients", post(handlers::create_patient))
        .route(
            "/patients/{id}",
            get(handlers::get_patient).delete(handlers::deactivate_patient),
        )
        // Clinical sessions
        .route(
            "/patients/{id}/sessions",
            post(handlers::create_session).get(handlers::list_sessions),
        )
        .route(
            "/patients/{id}/sessions/{session_id}",
            put(handlers::update_session),
        )
        .route(
            "/patients/{id}/sessions/{session_id}/history",
            get(handlers::session_history),
        )
        // Ownership transfers
        .route("/patients/{id}/transfer", patch(handlers::transfer_patient))
        .route("/patients/{id}/transfers", get(handlers::list_transfers))
        // Audit trail
        .route("/patients/{id}/audit-logs", get(handlers::list_audit_logs))
        // Clinician directory
        .route("/psychologists", post(handlers::create_psychologist))
        .with_state(state)
        // Middleware stack (order: request id -> cors/trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %method,
                        http.target = %uri,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<DynStore>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn with_store(mut self, store: DynStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> PraxisServer {
        let store = self
            .store
            .unwrap_or_else(|| std::sync::Arc::new(praxis_db_memory::InMemoryStore::new()));
        let app = build_app(&self.config, store);

        PraxisServer {
            addr: self.addr,
            app,
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PraxisServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
