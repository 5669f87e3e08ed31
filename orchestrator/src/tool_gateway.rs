//! Tool Gateway client (§6 "Tool Gateway contract"): outbound HTTP invocation of one tool
//! call on behalf of an agent node. The engine never parses `result` structurally beyond
//! attaching it to the message list.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OrchestratorError;

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    tool_name: &'a str,
    arguments: &'a Value,
}

#[derive(Debug, Deserialize)]
struct InvokeResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// `POST {gateway}/invoke` with `{tool_name, arguments}` (§6).
#[async_trait]
pub trait ToolGatewayClient: Send + Sync {
    async fn invoke(&self, tool_name: &str, arguments: &Value) -> Result<Value, OrchestratorError>;
}

fn map_gateway_error(body: InvokeResponse) -> OrchestratorError {
    let message = body.message.unwrap_or_else(|| "tool gateway error".to_string());
    match body.error_kind.as_deref() {
        Some("validation_error") => OrchestratorError::Validation(message),
        Some("not_found") => OrchestratorError::NotFound(message),
        Some("permission_denied") => OrchestratorError::PermissionDenied(message),
        _ => OrchestratorError::UpstreamUnavailable(message),
    }
}

/// HTTP implementation of the Tool Gateway contract.
pub struct HttpToolGatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpToolGatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[async_trait]
impl ToolGatewayClient for HttpToolGatewayClient {
    async fn invoke(&self, tool_name: &str, arguments: &Value) -> Result<Value, OrchestratorError> {
        let url = format!("{}/invoke", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&InvokeRequest { tool_name, arguments })
            .send()
            .await
            .map_err(|e| OrchestratorError::UpstreamUnavailable(format!("tool gateway unreachable: {e}")))?;

        let body: InvokeResponse = response
            .json()
            .await
            .map_err(|e| OrchestratorError::UpstreamUnavailable(format!("malformed tool gateway response: {e}")))?;

        if body.ok {
            Ok(body.result.unwrap_or(Value::Null))
        } else {
            Err(map_gateway_error(body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_gateway_error_uses_error_kind_when_present() {
        let err = map_gateway_error(InvokeResponse {
            ok: false,
            result: None,
            error_kind: Some("not_found".into()),
            message: Some("unknown tool".into()),
        });
        assert!(matches!(err, OrchestratorError::NotFound(m) if m == "unknown tool"));
    }

    #[test]
    fn map_gateway_error_defaults_to_upstream_unavailable() {
        let err = map_gateway_error(InvokeResponse { ok: false, result: None, error_kind: None, message: None });
        assert!(matches!(err, OrchestratorError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn http_client_against_unreachable_host_is_upstream_unavailable() {
        let client = HttpToolGatewayClient::new("http://127.0.0.1:1");
        let result = client.invoke("get_time", &json!({})).await;
        assert!(matches!(result, Err(OrchestratorError::UpstreamUnavailable(_))));
    }
}
