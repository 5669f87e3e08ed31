//! ApprovalRequest entity (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::risk::{RiskLevel, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl ApprovalStatus {
    /// Terminal states are write-once (§3 invariant).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub request_id: String,
    pub workflow_id: String,
    pub thread_id: String,
    pub checkpoint_id: String,
    pub risk_level: RiskLevel,
    pub required_role: Role,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<String>,
    pub justification: Option<String>,
    pub external_ref: Option<String>,
}
