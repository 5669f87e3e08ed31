//! The concrete specialist roster (§4.6 "Supervisor routes to exactly one specialist").
//! Shared by the binary entrypoint and the integration tests so both build the same
//! graph shape.

use std::collections::HashSet;

use orchestrator::{AgentProfile, SpecialistSpec, ToolCatalog};

/// Three specialists: two non-gated, one (`deployer`) state-changing and therefore
/// routed through the Approval Gate (§4.6).
pub fn default_specialists() -> Vec<SpecialistSpec> {
    vec![
        SpecialistSpec { name: "coder".into(), capability: "write or edit source code".into(), state_changing: false },
        SpecialistSpec { name: "tester".into(), capability: "run or author tests".into(), state_changing: false },
        SpecialistSpec {
            name: "deployer".into(),
            capability: "deploy, provision, or otherwise change live infrastructure".into(),
            state_changing: true,
        },
    ]
}

/// Registers a default `AgentProfile` per specialist in `default_specialists` -- without
/// one, `AgentNode::run` fails every call with `CatalogError::AgentProfileNotFound`
/// (§4.6 step 1: "Loads its AgentProfile").
pub fn register_default_agent_profiles(catalog: &ToolCatalog) {
    catalog.register_agent_profile(AgentProfile {
        agent_name: "coder".into(),
        model_hint: "gpt-4o-mini".into(),
        system_prompt: "You write and edit source code to satisfy the given task.".into(),
        allowed_servers: HashSet::new(),
        recommended_tools: HashSet::new(),
        temperature: 0.2,
    });
    catalog.register_agent_profile(AgentProfile {
        agent_name: "tester".into(),
        model_hint: "gpt-4o-mini".into(),
        system_prompt: "You write and run tests against the given task.".into(),
        allowed_servers: HashSet::new(),
        recommended_tools: HashSet::new(),
        temperature: 0.0,
    });
    catalog.register_agent_profile(AgentProfile {
        agent_name: "deployer".into(),
        model_hint: "gpt-4o-mini".into(),
        system_prompt: "You deploy and provision infrastructure for the given task.".into(),
        allowed_servers: HashSet::new(),
        recommended_tools: HashSet::new(),
        temperature: 0.0,
    });
}
