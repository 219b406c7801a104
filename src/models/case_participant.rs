use serde::{Deserialize, Serialize};

use super::enums::ParticipantRole;

/// A user attached to a case. Doctors only count once `approved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseParticipant {
    pub case_id: String,
    pub user_id: String,
    pub role: ParticipantRole,
    pub approved: bool,
}
