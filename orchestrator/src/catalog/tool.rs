//! Tool and AgentProfile entities (§3).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub server: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(default)]
    pub tags: HashSet<String>,
    #[serde(default)]
    pub agent_affinity: HashSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_name: String,
    pub model_hint: String,
    pub system_prompt: String,
    #[serde(default)]
    pub allowed_servers: HashSet<String>,
    #[serde(default)]
    pub recommended_tools: HashSet<String>,
    pub temperature: f32,
}
