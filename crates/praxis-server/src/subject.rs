//! Request identity extraction.
//!
//! The clinic deploys behind an authenticating gateway that stamps each
//! request with the caller's identity headers. This module turns those
//! headers into a typed [`Subject`] for handlers; requests without a
//! complete, well-formed identity are rejected with 401 before any
//! handler logic runs.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use std::str::FromStr;

use praxis_api::ApiError;
use praxis_core::{Role, Subject, parse_id};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const PSYCHOLOGIST_ID_HEADER: &str = "x-psychologist-id";

/// Extractor wrapper around [`Subject`].
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedSubject(pub Subject);

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Build a [`Subject`] from identity headers.
///
/// `x-user-id` and `x-user-role` are mandatory; `x-psychologist-id` is only
/// meaningful for psychologists and is ignored for other roles.
pub fn subject_from_headers(headers: &HeaderMap) -> Result<Subject, ApiError> {
    let user_id = header_str(headers, USER_ID_HEADER)
        .ok_or_else(|| ApiError::unauthorized("missing x-user-id header"))
        .and_then(|raw| {
            parse_id(raw).map_err(|_| ApiError::unauthorized("invalid x-user-id header"))
        })?;

    let role = header_str(headers, USER_ROLE_HEADER)
        .ok_or_else(|| ApiError::unauthorized("missing x-user-role header"))
        .and_then(|raw| {
            Role::from_str(raw.trim())
                .map_err(|_| ApiError::unauthorized("invalid x-user-role header"))
        })?;

    let psychologist_profile_id = match (role, header_str(headers, PSYCHOLOGIST_ID_HEADER)) {
        (Role::Psychologist, Some(raw)) => Some(
            parse_id(raw).map_err(|_| ApiError::unauthorized("invalid x-psychologist-id header"))?,
        ),
        _ => None,
    };

    Ok(Subject {
        user_id,
        role,
        psychologist_profile_id,
    })
}

impl<S> FromRequestParts<S> for AuthenticatedSubject
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        subject_from_headers(&parts.headers).map(AuthenticatedSubject)
    }
}
