//! HTTP handlers for the clinic API.
//!
//! Handlers stay thin: identity extraction happens in the
//! [`AuthenticatedSubject`] extractor, record-level access in
//! [`crate::access::AccessGuard`], and domain rules in the coordinator
//! services. Every failure path funnels through [`ApiError`].

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;

use praxis_api::ApiError;
use praxis_core::{AuditAction, PatientStatus, ResourceKind, Role};
use praxis_storage::{ClinicianStore, NewPatient, NewPsychologist, PatientStore};

use crate::audit::{AuditEntryBuilder, extract_request_meta};
use crate::sessions::{CreateSessionRequest, UpdateSessionRequest};
use crate::state::AppState;
use crate::subject::AuthenticatedSubject;
use crate::transfer::TransferRequest;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Praxis Clinic Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}

// ---- Patients ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub full_name: String,
}

pub async fn create_patient(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    headers: HeaderMap,
    Json(req): Json<CreatePatientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !matches!(subject.role, Role::Admin | Role::Psychologist) {
        return Err(ApiError::forbidden("role may not register patients"));
    }
    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err(ApiError::bad_request("fullName must not be empty"));
    }

    let patient = state
        .store
        .create_patient(NewPatient {
            full_name: full_name.to_string(),
            created_by_user_id: subject.user_id,
        })
        .await?;

    let meta = extract_request_meta(&headers);
    state
        .audit
        .record(
            AuditEntryBuilder::new(subject.user_id, AuditAction::Create, ResourceKind::Patient)
                .resource_id(patient.id)
                .patient(patient.id)
                .meta(&meta),
        )
        .await;

    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn get_patient(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let meta = extract_request_meta(&headers);
    let patient = state.guard.authorize(&subject, &id, &meta).await?;

    state
        .audit
        .record(
            AuditEntryBuilder::new(subject.user_id, AuditAction::View, ResourceKind::Patient)
                .resource_id(patient.id)
                .patient(patient.id)
                .meta(&meta),
        )
        .await;

    Ok(Json(patient))
}

pub async fn deactivate_patient(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let meta = extract_request_meta(&headers);
    let patient = state.guard.authorize(&subject, &id, &meta).await?;

    let updated = state
        .store
        .set_patient_status(patient.id, PatientStatus::Inactive)
        .await?;

    state
        .audit
        .record(
            AuditEntryBuilder::new(subject.user_id, AuditAction::Delete, ResourceKind::Patient)
                .resource_id(updated.id)
                .patient(updated.id)
                .meta(&meta)
                .details("status=inactive"),
        )
        .await;

    Ok(Json(updated))
}

// ---- Clinical sessions ----

pub async fn create_session(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let meta = extract_request_meta(&headers);
    let patient = state.guard.authorize(&subject, &id, &meta).await?;
    let session = state
        .sessions
        .create(&subject, &patient, req, &meta)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let meta = extract_request_meta(&headers);
    let patient = state.guard.authorize(&subject, &id, &meta).await?;
    let sessions = state.sessions.list(&patient).await?;
    Ok(Json(sessions))
}

pub async fn update_session(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    Path((id, session_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let meta = extract_request_meta(&headers);
    let patient = state.guard.authorize(&subject, &id, &meta).await?;
    let session = state
        .sessions
        .update(&subject, &patient, &session_id, req, &meta)
        .await?;
    Ok(Json(session))
}

pub async fn session_history(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    Path((id, session_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let meta = extract_request_meta(&headers);
    let patient = state.guard.authorize(&subject, &id, &meta).await?;
    let history = state.sessions.history(&patient, &session_id).await?;
    Ok(Json(history))
}

// ---- Transfers ----

pub async fn transfer_patient(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let meta = extract_request_meta(&headers);
    let transfer = state.transfers.transfer(&subject, &id, req, &meta).await?;
    Ok(Json(transfer))
}

pub async fn list_transfers(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transfers = state.transfers.list(&subject, &id).await?;
    Ok(Json(transfers))
}

// ---- Audit trail ----

pub async fn list_audit_logs(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let meta = extract_request_meta(&headers);
    // Reading the trail obeys the same record-level rule as the record
    // itself, and is not itself audited.
    let patient = state.guard.authorize(&subject, &id, &meta).await?;
    let entries = state.audit.list_by_patient(patient.id).await?;
    Ok(Json(entries))
}

// ---- Psychologists ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePsychologistRequest {
    pub user_id: i64,
    pub full_name: String,
}

pub async fn create_psychologist(
    State(state): State<AppState>,
    AuthenticatedSubject(subject): AuthenticatedSubject,
    headers: HeaderMap,
    Json(req): Json<CreatePsychologistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !subject.is_admin() {
        return Err(ApiError::forbidden(
            "only administrators may register psychologists",
        ));
    }
    if req.user_id <= 0 {
        return Err(ApiError::bad_request("userId must be positive"));
    }
    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err(ApiError::bad_request("fullName must not be empty"));
    }

    let psychologist = state
        .store
        .create_psychologist(NewPsychologist {
            user_id: req.user_id,
            full_name: full_name.to_string(),
        })
        .await?;

    let meta = extract_request_meta(&headers);
    state
        .audit
        .record(
            AuditEntryBuilder::new(
                subject.user_id,
                AuditAction::Create,
                ResourceKind::Psychologist,
            )
            .resource_id(psychologist.id)
            .meta(&meta),
        )
        .await;

    Ok((StatusCode::CREATED, Json(psychologist)))
}
