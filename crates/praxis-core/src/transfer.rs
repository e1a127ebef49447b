//! Ownership transfer records.

use crate::id::{PatientId, PsychologistId, TransferId, UserId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// One immutable row per completed ownership change.
///
/// A row exists if and only if the matching ownership mutation on the
/// patient committed; the two are written as one atomic unit by the
/// transfer store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientTransfer {
    pub id: TransferId,
    pub patient_id: PatientId,
    pub from_psychologist_id: Option<PsychologistId>,
    pub to_psychologist_id: PsychologistId,
    pub transferred_by_admin_id: UserId,
    pub reason: Option<String>,
    pub transferred_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now_utc;

    #[test]
    fn serializes_camel_case_with_nullable_from() {
        let transfer = PatientTransfer {
            id: 1,
            patient_id: 10,
            from_psychologist_id: None,
            to_psychologist_id: 7,
            transferred_by_admin_id: 1,
            reason: Some("reassignment".to_string()),
            transferred_at: now_utc(),
        };
        let json = serde_json::to_value(&transfer).unwrap();
        assert!(json["fromPsychologistId"].is_null());
        assert_eq!(json["toPsychologistId"], 7);
        assert_eq!(json["reason"], "reassignment");
    }
}
