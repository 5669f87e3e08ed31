//! §6 HTTP API: route handlers plus the router they're mounted on.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use orchestrator::{Decision, OrchestratorError, Task};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::dto::{
    status_str, CancelRequest, OrchestrateRequest, OrchestrateResponse, StatusResponse,
    TaskResponse, WebhookApprovalRequest, WebhookApprovalResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/orchestrate", post(orchestrate))
        .route("/tasks/:task_id", get(get_task))
        .route("/tasks/:task_id/resume", post(resume))
        .route("/tasks/:task_id/cancel", post(cancel))
        .route("/webhooks/approval", post(webhook_approval))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn orchestrate(
    State(state): State<AppState>,
    Json(body): Json<OrchestrateRequest>,
) -> Result<Json<OrchestrateResponse>, ApiError> {
    if body.description.trim().is_empty() {
        return Err(ApiError(OrchestratorError::Validation("description must not be empty".into())));
    }

    let task_id = orchestrator::memory::uuid6().to_string();
    let mut task = Task::new(task_id.clone(), body.description);
    task.priority = body.priority.unwrap_or_default();
    task.context = body.context.unwrap_or_default();

    let workflow_state = state.engine.orchestrate(task).await?;

    Ok(Json(OrchestrateResponse {
        task_id,
        status: status_str(&workflow_state),
        approval_request_id: workflow_state.approval_request_id.clone(),
    }))
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let workflow_state = state.engine.get_task(&task_id)?;
    Ok(Json(TaskResponse::from(&workflow_state)))
}

async fn resume(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let workflow_state = state.engine.resume(&task_id).await?;
    Ok(Json(StatusResponse { status: status_str(&workflow_state) }))
}

async fn cancel(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let reason = body.reason.unwrap_or_else(|| "cancelled via API".to_string());
    let workflow_state = state.engine.cancel(&task_id, &reason).await?;
    Ok(Json(StatusResponse { status: status_str(&workflow_state) }))
}

type HmacSha256 = Hmac<Sha256>;

/// The webhook body carries its own signature field, so it can't be an HMAC over the raw
/// bytes (that would need to include a signature not yet computed). Instead the signature
/// covers a canonical string of the other fields, hex-encoded.
fn canonical_payload(body: &WebhookApprovalRequest) -> String {
    format!(
        "{}:{}:{}:{}",
        body.request_id,
        body.decision,
        body.decided_by,
        body.justification.as_deref().unwrap_or("")
    )
}

fn verify_signature(secret: &str, body: &WebhookApprovalRequest) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(canonical_payload(body).as_bytes());
    let expected = mac.finalize().into_bytes();

    let Ok(provided) = hex::decode(&body.signature) else {
        return false;
    };
    provided.len() == expected.len() && bool::from(provided.ct_eq(&expected))
}

async fn webhook_approval(
    State(state): State<AppState>,
    Json(body): Json<WebhookApprovalRequest>,
) -> Result<Json<WebhookApprovalResponse>, ApiError> {
    if !verify_signature(&state.shared_secret_approval_webhook, &body) {
        return Err(ApiError(OrchestratorError::PermissionDenied("webhook signature mismatch".into())));
    }

    let decision = match body.decision.as_str() {
        "approved" => Decision::Approved,
        "rejected" => Decision::Rejected,
        "cancelled" => Decision::Cancelled,
        other => {
            return Err(ApiError(OrchestratorError::Validation(format!("unknown decision: {other}"))));
        }
    };

    state
        .engine
        .hitl()
        .record_decision(&body.request_id, decision, &body.decided_by, body.justification)
        .await?;

    Ok(Json(WebhookApprovalResponse { ok: true }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "dependencies": {
            "checkpoint_store": "ok",
            "event_bus": "ok",
            "lock_manager": "ok",
            "llm": "unknown",
            "tool_gateway": "unknown",
        },
        "active_workflows": state.engine.active_workflow_count(),
    }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let active_workflows = state.engine.active_workflow_count();
    let subscriber_errors = state.engine.event_bus().subscriber_errors_total();
    let pending_approvals = state.engine.hitl().list_pending(None).len();

    let body = format!(
        "# HELP orchestrator_active_workflows In-flight (non-terminal) workflows.\n\
         # TYPE orchestrator_active_workflows gauge\n\
         orchestrator_active_workflows {active_workflows}\n\
         # HELP orchestrator_pending_approvals Approval requests awaiting a decision.\n\
         # TYPE orchestrator_pending_approvals gauge\n\
         orchestrator_pending_approvals {pending_approvals}\n\
         # HELP orchestrator_event_bus_subscriber_errors_total Event bus subscriber handler errors.\n\
         # TYPE orchestrator_event_bus_subscriber_errors_total counter\n\
         orchestrator_event_bus_subscriber_errors_total {subscriber_errors}\n"
    );
    ([("content-type", "text/plain; version=0.0.4")], body)
}
