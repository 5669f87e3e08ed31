//! Tool Catalog & Progressive Loader (§4.4).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::ToolStrategy;

use super::error::CatalogError;
use super::tool::{AgentProfile, Tool};

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "to", "of", "in", "on", "for", "and", "or", "is", "are", "with", "at", "by",
    "this", "that", "it", "be", "as", "from", "into",
];

/// Lowercases, strips punctuation, splits on whitespace, drops stop words (§4.4 `MINIMAL`).
fn extract_keywords(description: &str) -> Vec<String> {
    let mut keywords: Vec<String> = description
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word))
        .map(String::from)
        .collect();
    keywords.sort();
    keywords.dedup();
    keywords
}

/// Maintains tool metadata and selects a minimal relevant subset for a task (§4.4).
pub struct ToolCatalog {
    tools: DashMap<String, Tool>,
    profiles: DashMap<String, AgentProfile>,
    keyword_to_servers: HashMap<String, Vec<String>>,
}

impl ToolCatalog {
    pub fn new(keyword_to_servers: HashMap<String, Vec<String>>) -> Arc<Self> {
        Arc::new(Self {
            tools: DashMap::new(),
            profiles: DashMap::new(),
            keyword_to_servers,
        })
    }

    pub fn register_tool(&self, tool: Tool) -> Result<(), CatalogError> {
        if self.tools.contains_key(&tool.name) {
            return Err(CatalogError::DuplicateTool(tool.name));
        }
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    pub fn register_agent_profile(&self, profile: AgentProfile) {
        self.profiles.insert(profile.agent_name.clone(), profile);
    }

    pub fn list_all(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.iter().map(|e| e.value().clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn get(&self, name: &str) -> Result<Tool, CatalogError> {
        self.tools
            .get(name)
            .map(|t| t.clone())
            .ok_or_else(|| CatalogError::ToolNotFound(name.to_string()))
    }

    fn get_profile(&self, agent_name: &str) -> Result<AgentProfile, CatalogError> {
        self.profiles
            .get(agent_name)
            .map(|p| p.clone())
            .ok_or_else(|| CatalogError::AgentProfileNotFound(agent_name.to_string()))
    }

    /// Public lookup for an agent node's own profile (§4.6 step 1: "Loads its AgentProfile").
    pub fn agent_profile(&self, agent_name: &str) -> Result<AgentProfile, CatalogError> {
        self.get_profile(agent_name)
    }

    /// Tools belonging to any of `servers`, sorted by (tag frequency desc, name asc) so
    /// ties break deterministically (§4.4 `MINIMAL` tie-break rule).
    fn tools_for_servers(&self, servers: &HashSet<&str>) -> Vec<Tool> {
        let mut matched: Vec<Tool> = self
            .tools
            .iter()
            .filter(|e| servers.contains(e.value().server.as_str()))
            .map(|e| e.value().clone())
            .collect();

        let mut tag_frequency: HashMap<String, usize> = HashMap::new();
        for tool in &matched {
            for tag in &tool.tags {
                *tag_frequency.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        let frequency_of = |tool: &Tool| -> usize {
            tool.tags.iter().map(|t| tag_frequency.get(t).copied().unwrap_or(0)).sum()
        };

        matched.sort_by(|a, b| frequency_of(b).cmp(&frequency_of(a)).then_with(|| a.name.cmp(&b.name)));
        matched
    }

    fn minimal(&self, task_description: &str) -> Vec<Tool> {
        let keywords = extract_keywords(task_description);
        let mut servers: HashSet<&str> = HashSet::new();
        for keyword in &keywords {
            if let Some(mapped) = self.keyword_to_servers.get(keyword) {
                servers.extend(mapped.iter().map(String::as_str));
            }
        }
        let mut tools = self.tools_for_servers(&servers);
        tools.truncate(30);
        tools
    }

    fn agent_profile_tools(&self, profile: &AgentProfile) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .tools
            .iter()
            .filter(|e| {
                profile.recommended_tools.contains(e.key()) || profile.allowed_servers.contains(&e.value().server)
            })
            .map(|e| e.value().clone())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// `select(task_description, agent_name, strategy)` (§4.4). Deterministic for the same
    /// catalog/task/agent/strategy input.
    pub fn select(
        &self,
        task_description: &str,
        agent_name: &str,
        strategy: ToolStrategy,
    ) -> Result<Vec<Tool>, CatalogError> {
        match strategy {
            ToolStrategy::Minimal => Ok(self.minimal(task_description)),
            ToolStrategy::AgentProfile => {
                let profile = self.get_profile(agent_name)?;
                Ok(self.agent_profile_tools(&profile))
            }
            ToolStrategy::Progressive => {
                let mut selected = self.minimal(task_description);
                let mut seen: HashSet<String> = selected.iter().map(|t| t.name.clone()).collect();
                if let Ok(profile) = self.get_profile(agent_name) {
                    let mut recommended: Vec<Tool> = self
                        .tools
                        .iter()
                        .filter(|e| profile.recommended_tools.contains(e.key()))
                        .map(|e| e.value().clone())
                        .collect();
                    recommended.sort_by(|a, b| a.name.cmp(&b.name));
                    for tool in recommended {
                        if seen.insert(tool.name.clone()) {
                            selected.push(tool);
                        }
                    }
                }
                selected.truncate(40);
                Ok(selected)
            }
            ToolStrategy::Full => Ok(self.list_all()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str, server: &str, tags: &[&str]) -> Tool {
        Tool {
            name: name.into(),
            server: server.into(),
            description: String::new(),
            input_schema: json!({}),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            agent_affinity: HashSet::new(),
        }
    }

    fn catalog() -> Arc<ToolCatalog> {
        let mut keyword_to_servers = HashMap::new();
        keyword_to_servers.insert("docker".into(), vec!["docker".into()]);
        keyword_to_servers.insert("deploy".into(), vec!["kubernetes".into()]);
        let catalog = ToolCatalog::new(keyword_to_servers);
        catalog.register_tool(tool("docker_build", "docker", &["build"])).unwrap();
        catalog.register_tool(tool("docker_push", "docker", &["push"])).unwrap();
        catalog.register_tool(tool("k8s_apply", "kubernetes", &["apply"])).unwrap();
        catalog.register_tool(tool("unrelated", "other", &[])).unwrap();
        catalog
    }

    #[test]
    fn minimal_matches_keyword_mapped_servers_only() {
        let catalog = catalog();
        let tools = catalog.select("please docker build this", "any", ToolStrategy::Minimal).unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"docker_build"));
        assert!(names.contains(&"docker_push"));
        assert!(!names.contains(&"unrelated"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let catalog = catalog();
        let result = catalog.register_tool(tool("docker_build", "docker", &[]));
        assert!(matches!(result, Err(CatalogError::DuplicateTool(_))));
    }

    #[test]
    fn agent_profile_strategy_unions_recommended_and_allowed_servers() {
        let catalog = catalog();
        catalog.register_agent_profile(AgentProfile {
            agent_name: "deployer".into(),
            model_hint: "gpt".into(),
            system_prompt: String::new(),
            allowed_servers: ["kubernetes".to_string()].into_iter().collect(),
            recommended_tools: ["docker_build".to_string()].into_iter().collect(),
            temperature: 0.0,
        });
        let tools = catalog.select("deploy", "deployer", ToolStrategy::AgentProfile).unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"docker_build"));
        assert!(names.contains(&"k8s_apply"));
        assert!(!names.contains(&"docker_push"));
    }

    #[test]
    fn full_strategy_returns_everything() {
        let catalog = catalog();
        let tools = catalog.select("anything", "any", ToolStrategy::Full).unwrap();
        assert_eq!(tools.len(), 4);
    }

    #[test]
    fn selection_is_deterministic_across_repeated_calls() {
        let catalog = catalog();
        let first = catalog.select("docker deploy", "any", ToolStrategy::Minimal).unwrap();
        let second = catalog.select("docker deploy", "any", ToolStrategy::Minimal).unwrap();
        let first_names: Vec<&str> = first.iter().map(|t| t.name.as_str()).collect();
        let second_names: Vec<&str> = second.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(first_names, second_names);
    }
}
