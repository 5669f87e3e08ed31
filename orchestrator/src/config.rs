//! Process-wide configuration surface (§6 "Configuration surface").
//!
//! `Settings` is loaded from a TOML file; every field has the spec-mandated default so a
//! missing file is not an error (teacher precedent: `config` crate's `load_and_apply` never
//! fails on a missing source, only on a malformed one).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hitl::RiskRule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Read(std::io::Error),
    #[error("parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Approval timeouts per risk level, in seconds (§4.5 table; §6 `approval_timeouts`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalTimeouts {
    pub medium: u64,
    pub high: u64,
    pub critical: u64,
}

impl Default for ApprovalTimeouts {
    fn default() -> Self {
        Self {
            medium: 1800,
            high: 3600,
            critical: 7200,
        }
    }
}

/// Tool-selection strategy (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolStrategy {
    Minimal,
    AgentProfile,
    #[default]
    Progressive,
    Full,
}

/// Everything in §6's "Configuration surface" table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_parallel_workflows: usize,
    pub max_tool_rounds: u32,
    pub node_timeout_seconds: u64,
    pub llm_retry_backoff: Vec<u64>,
    pub lock_default_ttl_seconds: u64,
    pub approval_timeouts: ApprovalTimeouts,
    pub tool_strategy_default: ToolStrategy,
    pub keyword_to_servers: HashMap<String, Vec<String>>,
    pub risk_rules: Vec<RiskRule>,
    pub shared_secret_approval_webhook: String,
    /// Per-node Supervisor timeout (§4.6: "10s for Supervisor"). Not in the §6 table by name
    /// but required to implement the §4.6 timeout rule; defaults accordingly.
    pub supervisor_timeout_seconds: u64,
    /// Path to the SQLite checkpoint database. Empty string selects the in-memory store.
    pub checkpoint_db_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        let mut keyword_to_servers = HashMap::new();
        keyword_to_servers.insert("docker".into(), vec!["docker".into(), "kubernetes".into()]);
        keyword_to_servers.insert("test".into(), vec!["pytest".into(), "playwright".into()]);
        keyword_to_servers.insert(
            "deploy".into(),
            vec!["terraform".into(), "kubernetes".into(), "github".into()],
        );
        keyword_to_servers.insert(
            "search".into(),
            vec!["context7".into(), "vector-search".into()],
        );

        Self {
            max_parallel_workflows: 32,
            max_tool_rounds: 6,
            node_timeout_seconds: 120,
            llm_retry_backoff: vec![1, 2, 4],
            lock_default_ttl_seconds: 60,
            approval_timeouts: ApprovalTimeouts::default(),
            tool_strategy_default: ToolStrategy::default(),
            keyword_to_servers,
            risk_rules: RiskRule::default_table(),
            shared_secret_approval_webhook: String::new(),
            supervisor_timeout_seconds: 10,
            checkpoint_db_path: String::new(),
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file; missing fields fall back to spec defaults per-field.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Loads from `ORCHESTRATOR_CONFIG` (default `./orchestrator.toml`); absent file -> defaults.
    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        let path = std::env::var("ORCHESTRATOR_CONFIG")
            .unwrap_or_else(|_| "orchestrator.toml".to_string());
        if Path::new(&path).exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
