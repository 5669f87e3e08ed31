//! Risk Assessor & HITL Manager (§4.5): classify a task's risk, create/update approval
//! records, and signal workflow resumption.

mod approval;
mod error;
mod manager;
mod risk;
mod ui_client;

pub use approval::{ApprovalRequest, ApprovalStatus};
pub use error::HitlError;
pub use manager::{Decision, HitlManager};
pub use risk::{assess, RiskAssessment, RiskLevel, RiskPredicate, RiskRule, Role};
pub use ui_client::{ApprovalUiClient, HttpApprovalUiClient, NullApprovalUiClient};
