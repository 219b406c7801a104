//! Case access authorization.
//!
//! Decides whether a caller may read documents attached to a case:
//! 1. Caller is the case's patient → ALLOW
//! 2. Caller is a doctor with an approved assignment → ALLOW
//! 3. Caller is a doctor awaiting approval → DENY
//! 4. Default → DENY
//!
//! The participant table is a mirror maintained by the case service.

use rusqlite::Connection;

use crate::db::repository::get_case_participant;
use crate::db::DatabaseError;
use crate::models::enums::ParticipantRole;

/// Why access was granted (or denied): for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    Patient,
    ApprovedDoctor,
    PendingDoctor,
    NotParticipant,
}

#[derive(Debug, Clone, Copy)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self { allowed: true, reason }
    }

    fn deny(reason: AccessReason) -> Self {
        Self { allowed: false, reason }
    }
}

/// Check whether `user_id` participates in `case_id`.
pub fn check_case_access(
    conn: &Connection,
    case_id: &str,
    user_id: &str,
) -> Result<AccessDecision, DatabaseError> {
    let Some(participant) = get_case_participant(conn, case_id, user_id)? else {
        return Ok(AccessDecision::deny(AccessReason::NotParticipant));
    };

    let decision = match (participant.role, participant.approved) {
        (ParticipantRole::Patient, _) => AccessDecision::allow(AccessReason::Patient),
        (ParticipantRole::Doctor, true) => AccessDecision::allow(AccessReason::ApprovedDoctor),
        (ParticipantRole::Doctor, false) => AccessDecision::deny(AccessReason::PendingDoctor),
    };
    Ok(decision)
}
