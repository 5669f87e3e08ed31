//! Shared fixtures for the HTTP-level integration tests (mirrors `serve/tests/e2e/common.rs`'s
//! role: build a real server instance and a small client helper, instead of re-deriving both
//! per scenario file).

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use orchestrator::hitl::NullApprovalUiClient;
use orchestrator::{
    Checkpointer, Engine, EventBus, HitlManager, LlmClient, LockManager, MemorySaver, RiskRule, Settings,
    ToolCatalog, WorkflowState,
};
use orchestrator_serve::{default_specialists, register_default_agent_profiles, AppState};
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

pub const SHARED_SECRET: &str = "integration-test-secret";

/// Builds a router backed by a real `Engine` -- real graph, real risk assessment, real
/// approval lifecycle -- with only the LLM and the outbound tool gateway faked out, the
/// same substitution the engine's own unit tests make.
pub fn test_app(llm: Arc<dyn LlmClient>) -> Router {
    let mut settings = Settings::default();
    settings.shared_secret_approval_webhook = SHARED_SECRET.to_string();

    let event_bus = EventBus::new("test-node");
    let lock_manager = LockManager::new(Some(Arc::clone(&event_bus)));
    let catalog = ToolCatalog::new(HashMap::new());
    register_default_agent_profiles(&catalog);
    let hitl = HitlManager::new(
        RiskRule::default_table(),
        settings.approval_timeouts.clone(),
        Arc::clone(&event_bus),
        Arc::clone(&lock_manager),
        Arc::new(NullApprovalUiClient),
    );
    let checkpointer: Arc<dyn Checkpointer<WorkflowState>> = Arc::new(MemorySaver::new());

    let engine = Engine::new(
        settings.clone(),
        event_bus,
        lock_manager,
        catalog,
        hitl,
        checkpointer,
        llm,
        Arc::new(EchoToolGateway),
        default_specialists(),
        "coder",
    );

    let state = AppState::new(engine, settings.shared_secret_approval_webhook.clone());
    orchestrator_serve::build_router(state)
}

struct EchoToolGateway;

#[async_trait::async_trait]
impl orchestrator::ToolGatewayClient for EchoToolGateway {
    async fn invoke(&self, tool_name: &str, _arguments: &Value) -> Result<Value, orchestrator::OrchestratorError> {
        Ok(serde_json::json!({"artifact": format!("{tool_name}-ok")}))
    }
}

/// Hex HMAC-SHA256 over the same canonical string `routes::canonical_payload` builds, so
/// tests can sign a webhook body without reaching into a private route-handler function.
pub fn sign_webhook(secret: &str, request_id: &str, decision: &str, decided_by: &str, justification: Option<&str>) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let canonical = format!("{request_id}:{decision}:{decided_by}:{}", justification.unwrap_or(""));
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Drives one request through the router and decodes the JSON body, regardless of status.
pub async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(v) => Body::from(serde_json::to_vec(&v).unwrap()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}
