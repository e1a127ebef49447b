pub mod audit;
pub mod error;
pub mod id;
pub mod patient;
pub mod session;
pub mod subject;
pub mod time;
pub mod transfer;

pub use audit::{AuditAction, AuditLogEntry, ResourceKind};
pub use error::{CoreError, ErrorCategory, Result};
pub use id::{AuditEntryId, PatientId, PsychologistId, SessionId, TransferId, UserId, parse_id};
pub use patient::{Patient, PatientStatus, Psychologist};
pub use session::{ClinicalSession, SessionHistory};
pub use subject::{Role, Subject};
pub use time::{Timestamp, now_utc};
pub use transfer::PatientTransfer;
