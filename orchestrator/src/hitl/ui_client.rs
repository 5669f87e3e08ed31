//! External approval-UI client (§4.5 step 4: "Create the external UI record").

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::approval::ApprovalRequest;
use super::error::HitlError;

#[async_trait]
pub trait ApprovalUiClient: Send + Sync {
    /// Creates the UI-side record for a new approval request, returning an opaque
    /// `external_ref` the UI uses to locate it.
    async fn create_record(&self, request: &ApprovalRequest) -> Result<String, HitlError>;
}

#[derive(Serialize)]
struct CreateRecordPayload<'a> {
    request_id: &'a str,
    workflow_id: &'a str,
    risk_level: &'a str,
    required_role: &'a str,
    expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Deserialize)]
struct CreateRecordResponse {
    external_ref: String,
}

/// HTTP-backed client for a real approval UI.
pub struct HttpApprovalUiClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApprovalUiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ApprovalUiClient for HttpApprovalUiClient {
    async fn create_record(&self, request: &ApprovalRequest) -> Result<String, HitlError> {
        let risk_level = serde_json::to_value(request.risk_level)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        let payload = CreateRecordPayload {
            request_id: &request.request_id,
            workflow_id: &request.workflow_id,
            risk_level: &risk_level,
            required_role: request.required_role.as_str(),
            expires_at: request.expires_at,
        };
        let response = self
            .client
            .post(format!("{}/approvals", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| HitlError::UiUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(HitlError::UiUnavailable(format!("status {}", response.status())));
        }
        let body: CreateRecordResponse = response
            .json()
            .await
            .map_err(|e| HitlError::UiUnavailable(e.to_string()))?;
        Ok(body.external_ref)
    }
}

/// No-op client for tests and deployments with no external approval UI wired up yet.
pub struct NullApprovalUiClient;

#[async_trait]
impl ApprovalUiClient for NullApprovalUiClient {
    async fn create_record(&self, request: &ApprovalRequest) -> Result<String, HitlError> {
        Ok(format!("local:{}", request.request_id))
    }
}
