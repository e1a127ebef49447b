//! The authenticated caller as the access-control engine sees it.
//!
//! Identity verification happens upstream; by the time a request reaches the
//! core, it carries an already-authenticated [`Subject`]. The ownership rule
//! in the access guard is a pure function of this value plus the patient
//! record, which keeps it unit-testable without any HTTP machinery.

use crate::error::CoreError;
use crate::id::{PsychologistId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Clinic staff roles.
///
/// Only `admin` and `psychologist` ever pass the record access rule;
/// `receptionist` exists for the scheduling side of the application and is
/// always denied clinical-record access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Psychologist,
    Receptionist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Psychologist => "psychologist",
            Role::Receptionist => "receptionist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "psychologist" => Ok(Role::Psychologist),
            "receptionist" => Ok(Role::Receptionist),
            other => Err(CoreError::invalid_role(other)),
        }
    }
}

/// An authenticated caller.
///
/// `psychologist_profile_id` is present only for subjects with the
/// psychologist role; it references the clinician profile that patient
/// ownership points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub user_id: UserId,
    pub role: Role,
    pub psychologist_profile_id: Option<PsychologistId>,
}

impl Subject {
    pub fn new(user_id: UserId, role: Role, psychologist_profile_id: Option<PsychologistId>) -> Self {
        Self {
            user_id,
            role,
            psychologist_profile_id,
        }
    }

    /// Shorthand for an admin subject.
    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin, None)
    }

    /// Shorthand for a psychologist subject with the given profile.
    pub fn psychologist(user_id: UserId, profile_id: PsychologistId) -> Self {
        Self::new(user_id, Role::Psychologist, Some(profile_id))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
