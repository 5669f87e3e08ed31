//! Shared axum state: the compiled `Engine` plus the bits of `Settings` the HTTP layer
//! itself needs (currently just the webhook shared secret).

use std::sync::Arc;

use orchestrator::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub shared_secret_approval_webhook: Arc<String>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, shared_secret_approval_webhook: String) -> Self {
        Self { engine, shared_secret_approval_webhook: Arc::new(shared_secret_approval_webhook) }
    }
}
