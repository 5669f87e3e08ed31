//! Binary entrypoint: loads configuration, wires the six core services into an `Engine`,
//! and serves the §6 HTTP API.
//!
//! Exit codes follow §6 "Exit kinds": 0 success, 2 configuration error, 3 dependency
//! unavailable at startup, non-zero otherwise.

use std::process::ExitCode;
use std::sync::Arc;

use orchestrator::{
    ChatOpenAI, Engine, EventBus, HitlManager, LlmClient, LockManager, MemorySaver, Settings,
    ToolCatalog, ToolGatewayClient, WorkflowState,
};
use orchestrator::hitl::{ApprovalUiClient, HttpApprovalUiClient, NullApprovalUiClient};
use orchestrator::memory::{Checkpointer, JsonSerializer, SqliteSaver};
use orchestrator::tool_gateway::HttpToolGatewayClient;
use orchestrator_serve::{default_specialists, register_default_agent_profiles, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = env_config::load_and_apply("orchestrator", None) {
        eprintln!("failed to load configuration: {err}");
        return ExitCode::from(2);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match Settings::from_env_or_default() {
        Ok(s) => s,
        Err(err) => {
            tracing::error!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };

    let node_id = std::env::var("ORCHESTRATOR_NODE_ID").unwrap_or_else(|_| "orchestrator-serve".to_string());
    let event_bus = EventBus::new(node_id);
    let lock_manager = LockManager::new(Some(Arc::clone(&event_bus)));
    let catalog = ToolCatalog::new(settings.keyword_to_servers.clone());
    register_default_agent_profiles(&catalog);

    let ui_client: Arc<dyn ApprovalUiClient> = match std::env::var("APPROVAL_UI_BASE_URL") {
        Ok(url) if !url.is_empty() => Arc::new(HttpApprovalUiClient::new(url)),
        _ => Arc::new(NullApprovalUiClient),
    };
    let hitl = HitlManager::new(
        settings.risk_rules.clone(),
        settings.approval_timeouts.clone(),
        Arc::clone(&event_bus),
        Arc::clone(&lock_manager),
        ui_client,
    );

    let checkpointer: Arc<dyn Checkpointer<WorkflowState>> = if settings.checkpoint_db_path.is_empty() {
        Arc::new(MemorySaver::new())
    } else {
        match SqliteSaver::new(&settings.checkpoint_db_path, Arc::new(JsonSerializer)) {
            Ok(saver) => Arc::new(saver),
            Err(err) => {
                tracing::error!("failed to open checkpoint database: {err}");
                return ExitCode::from(3);
            }
        }
    };

    let llm_model = std::env::var("ORCHESTRATOR_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
    let llm: Arc<dyn LlmClient> = Arc::new(ChatOpenAI::new(llm_model));

    let tool_gateway_base_url =
        std::env::var("TOOL_GATEWAY_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:9000".to_string());
    let tool_gateway: Arc<dyn ToolGatewayClient> = Arc::new(HttpToolGatewayClient::new(tool_gateway_base_url));

    let engine = Engine::new(
        settings.clone(),
        event_bus,
        lock_manager,
        catalog,
        hitl,
        checkpointer,
        llm,
        tool_gateway,
        default_specialists(),
        "coder",
    );

    let app_state = AppState::new(engine, settings.shared_secret_approval_webhook.clone());

    let addr = std::env::var("ORCHESTRATOR_LISTEN_ADDR").ok();
    if let Err(err) = orchestrator_serve::run(addr.as_deref(), app_state).await {
        tracing::error!("server error: {err}");
        return ExitCode::from(3);
    }

    ExitCode::SUCCESS
}
