//! HTTP server for the orchestrator's §6 external interface: task intake, status, resume,
//! cancel, and the approval webhook.
//!
//! **Public API**: [`build_router`], [`AppState`], [`run_on_listener`].

mod bootstrap;
mod dto;
mod error;
mod routes;
mod state;

use tokio::net::TcpListener;
use tracing::info;

pub use bootstrap::{default_specialists, register_default_agent_profiles};
pub use routes::build_router;
pub use state::AppState;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Serves `state`'s router on an existing listener. Used directly by tests (bind to
/// `127.0.0.1:0`, pass the listener, read back the ephemeral port).
pub async fn run_on_listener(
    listener: TcpListener,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("orchestrator HTTP server listening on http://{addr}");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Binds `addr` (default `127.0.0.1:8080`) and serves until Ctrl-C / SIGTERM.
pub async fn run(addr: Option<&str>, state: AppState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = addr.unwrap_or(DEFAULT_ADDR);
    let listener = TcpListener::bind(addr).await?;
    run_on_listener(listener, state).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
