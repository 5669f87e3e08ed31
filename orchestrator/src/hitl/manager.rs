//! HITL Manager (§4.5): stateful approval-request lifecycle, backed by the Checkpoint
//! Store's thread/checkpoint ids, the Event Bus, and the external approval-UI client.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bus::{event_types, Event, EventBus};
use crate::config::ApprovalTimeouts;
use crate::locks::LockManager;
use crate::task::Task;

use super::approval::{ApprovalRequest, ApprovalStatus};
use super::error::HitlError;
use super::risk::{self, RiskLevel, RiskRule, Role};
use super::ui_client::ApprovalUiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
    Cancelled,
}

impl Decision {
    fn terminal_status(&self) -> ApprovalStatus {
        match self {
            Decision::Approved => ApprovalStatus::Approved,
            Decision::Rejected | Decision::Cancelled => ApprovalStatus::Rejected,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
            Decision::Cancelled => "cancelled",
        }
    }
}

pub struct HitlManager {
    requests: DashMap<String, ApprovalRequest>,
    risk_rules: Vec<RiskRule>,
    approval_timeouts: ApprovalTimeouts,
    event_bus: Arc<EventBus>,
    lock_manager: Arc<LockManager>,
    ui_client: Arc<dyn ApprovalUiClient>,
}

impl HitlManager {
    pub fn new(
        risk_rules: Vec<RiskRule>,
        approval_timeouts: ApprovalTimeouts,
        event_bus: Arc<EventBus>,
        lock_manager: Arc<LockManager>,
        ui_client: Arc<dyn ApprovalUiClient>,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: DashMap::new(),
            risk_rules,
            approval_timeouts,
            event_bus,
            lock_manager,
            ui_client,
        })
    }

    fn lock_resource(request_id: &str) -> String {
        format!("approval:{request_id}")
    }

    /// `create_request(workflow_id, thread_id, checkpoint_id, task, agent_name)` (§4.5).
    /// Returns `None` when the task's risk is `low` (no approval needed).
    pub async fn create_request(
        &self,
        workflow_id: &str,
        thread_id: &str,
        checkpoint_id: &str,
        task: &Task,
        _agent_name: &str,
    ) -> Result<Option<String>, HitlError> {
        let assessment = risk::assess(task, &self.risk_rules);
        if assessment.level == RiskLevel::Low {
            return Ok(None);
        }
        let required_role = assessment.required_role.unwrap_or(Role::Developer);
        let timeout_seconds = assessment
            .level
            .timeout_seconds(&self.approval_timeouts)
            .unwrap_or(self.approval_timeouts.medium);

        let request_id = Uuid::new_v4().to_string();
        let handle = self
            .lock_manager
            .acquire(
                Self::lock_resource(&request_id),
                "hitl_manager",
                Duration::from_secs(30),
                Duration::ZERO,
                None,
            )
            .await
            .map_err(|_| HitlError::Conflict(request_id.clone()))?;

        let now = Utc::now();
        let mut request = ApprovalRequest {
            request_id: request_id.clone(),
            workflow_id: workflow_id.to_string(),
            thread_id: thread_id.to_string(),
            checkpoint_id: checkpoint_id.to_string(),
            risk_level: assessment.level,
            required_role,
            status: ApprovalStatus::Pending,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(timeout_seconds as i64),
            decided_at: None,
            decided_by: None,
            justification: None,
            external_ref: None,
        };

        let external_ref = self.ui_client.create_record(&request).await?;
        request.external_ref = Some(external_ref);
        self.requests.insert(request_id.clone(), request);
        handle.release().await;

        info!(request_id = %request_id, workflow_id, "approval request created");
        self.event_bus
            .emit(
                Event::new(
                    event_types::APPROVAL_REQUEST,
                    json!({"request_id": request_id, "workflow_id": workflow_id, "thread_id": thread_id}),
                    "hitl_manager",
                )
                .with_correlation_id(workflow_id.to_string()),
                true,
            )
            .await;

        Ok(Some(request_id))
    }

    /// `record_decision(request_id, decision, decided_by, justification?)` (§4.5): atomic
    /// `pending -> approved/rejected` transition; rejects decisions on terminal requests.
    pub async fn record_decision(
        &self,
        request_id: &str,
        decision: Decision,
        decided_by: &str,
        justification: Option<String>,
    ) -> Result<(), HitlError> {
        let handle = self
            .lock_manager
            .acquire(
                Self::lock_resource(request_id),
                "hitl_manager",
                Duration::from_secs(30),
                Duration::from_secs(5),
                None,
            )
            .await
            .map_err(|_| HitlError::Conflict(request_id.to_string()))?;

        let (workflow_id, checkpoint_id) = {
            let mut entry = self
                .requests
                .get_mut(request_id)
                .ok_or_else(|| HitlError::NotFound(request_id.to_string()))?;

            if entry.status.is_terminal() {
                return Err(HitlError::Conflict(request_id.to_string()));
            }
            if entry.risk_level == RiskLevel::Critical && justification.is_none() {
                return Err(HitlError::Validation(
                    "critical approval requires a justification".into(),
                ));
            }

            entry.status = decision.terminal_status();
            entry.decided_at = Some(Utc::now());
            entry.decided_by = Some(decided_by.to_string());
            entry.justification = justification;
            (entry.workflow_id.clone(), entry.checkpoint_id.clone())
        };
        handle.release().await;

        self.event_bus
            .emit(
                Event::new(
                    event_types::APPROVAL_DECISION,
                    json!({
                        "request_id": request_id,
                        "decision": decision.as_str(),
                        "workflow_id": workflow_id,
                        "checkpoint_id": checkpoint_id,
                    }),
                    "hitl_manager",
                )
                .with_correlation_id(workflow_id),
                true,
            )
            .await;

        Ok(())
    }

    /// Background pass (§4.5): flips any `pending` row past `expires_at` to `expired` and
    /// emits `approval_decision{decision=rejected, reason=expired}`.
    pub async fn expire_pending(&self) {
        let now = Utc::now();
        let expired: Vec<(String, String, String)> = self
            .requests
            .iter()
            .filter(|e| e.status == ApprovalStatus::Pending && e.expires_at < now)
            .map(|e| (e.request_id.clone(), e.workflow_id.clone(), e.checkpoint_id.clone()))
            .collect();

        for (request_id, workflow_id, checkpoint_id) in expired {
            if let Some(mut entry) = self.requests.get_mut(&request_id) {
                if entry.status != ApprovalStatus::Pending {
                    continue;
                }
                entry.status = ApprovalStatus::Expired;
                entry.decided_at = Some(now);
            } else {
                continue;
            }
            warn!(request_id = %request_id, "approval request expired");
            self.event_bus
                .emit(
                    Event::new(
                        event_types::APPROVAL_DECISION,
                        json!({
                            "request_id": request_id,
                            "decision": "rejected",
                            "reason": "expired",
                            "workflow_id": workflow_id,
                            "checkpoint_id": checkpoint_id,
                        }),
                        "hitl_manager",
                    )
                    .with_correlation_id(workflow_id),
                    true,
                )
                .await;
        }
    }

    pub fn get(&self, request_id: &str) -> Result<ApprovalRequest, HitlError> {
        self.requests
            .get(request_id)
            .map(|e| e.clone())
            .ok_or_else(|| HitlError::NotFound(request_id.to_string()))
    }

    /// Pending requests, optionally filtered to those requiring a given role.
    pub fn list_pending(&self, required_role: Option<Role>) -> Vec<ApprovalRequest> {
        self.requests
            .iter()
            .filter(|e| e.status == ApprovalStatus::Pending)
            .filter(|e| required_role.map(|role| role == e.required_role).unwrap_or(true))
            .map(|e| e.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hitl::ui_client::NullApprovalUiClient;
    use std::collections::HashMap;

    fn manager() -> Arc<HitlManager> {
        HitlManager::new(
            RiskRule::default_table(),
            ApprovalTimeouts::default(),
            EventBus::new("test-node"),
            LockManager::new(None),
            Arc::new(NullApprovalUiClient),
        )
    }

    fn task_with(operation: &str) -> Task {
        let mut task = Task::new("t1", "delete the thing");
        task.context
            .insert("operation".into(), serde_json::Value::String(operation.into()));
        task.context
            .insert("environment".into(), serde_json::Value::String("dev".into()));
        task
    }

    #[tokio::test]
    async fn low_risk_task_needs_no_approval() {
        let manager = manager();
        let result = manager
            .create_request("wf-1", "thread-1", "c1", &Task::new("t1", "read a file"), "agent")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn high_risk_task_creates_pending_request() {
        let manager = manager();
        let request_id = manager
            .create_request("wf-1", "thread-1", "c1", &task_with("delete"), "agent")
            .await
            .unwrap()
            .unwrap();
        let request = manager.get(&request_id).unwrap();
        assert_eq!(request.status, ApprovalStatus::Pending);
    }

    #[tokio::test]
    async fn critical_decision_without_justification_is_rejected() {
        let manager = manager();
        let request_id = manager
            .create_request("wf-1", "thread-1", "c1", &task_with("secret"), "agent")
            .await
            .unwrap()
            .unwrap();
        let result = manager
            .record_decision(&request_id, Decision::Approved, "lead", None)
            .await;
        assert!(matches!(result, Err(HitlError::Validation(_))));
    }

    #[tokio::test]
    async fn decision_on_terminal_request_conflicts() {
        let manager = manager();
        let request_id = manager
            .create_request("wf-1", "thread-1", "c1", &task_with("delete"), "agent")
            .await
            .unwrap()
            .unwrap();
        manager
            .record_decision(&request_id, Decision::Approved, "lead", None)
            .await
            .unwrap();
        let second = manager
            .record_decision(&request_id, Decision::Rejected, "lead", None)
            .await;
        assert!(matches!(second, Err(HitlError::Conflict(_))));
    }

    #[tokio::test]
    async fn expire_pending_flips_past_deadline_rows() {
        let manager = HitlManager::new(
            vec![RiskRule {
                predicate: super::super::risk::RiskPredicate {
                    operation: Some("delete".into()),
                    ..Default::default()
                },
                level: RiskLevel::Medium,
                required_role: Role::Developer,
            }],
            ApprovalTimeouts {
                medium: 0,
                high: 3600,
                critical: 7200,
            },
            EventBus::new("test-node"),
            LockManager::new(None),
            Arc::new(NullApprovalUiClient),
        );
        let request_id = manager
            .create_request("wf-1", "thread-1", "c1", &task_with("delete"), "agent")
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.expire_pending().await;
        let request = manager.get(&request_id).unwrap();
        assert_eq!(request.status, ApprovalStatus::Expired);
    }
}
