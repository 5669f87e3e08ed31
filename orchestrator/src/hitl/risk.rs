//! Risk Assessor (§4.5): a pure function classifying a task's risk via a declarative,
//! first-match-wins rule table.

use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Approval timeout in seconds (§4.5 table); `None` for `low` (auto-approved).
    pub fn timeout_seconds(&self, timeouts: &crate::config::ApprovalTimeouts) -> Option<u64> {
        match self {
            RiskLevel::Low => None,
            RiskLevel::Medium => Some(timeouts.medium),
            RiskLevel::High => Some(timeouts.high),
            RiskLevel::Critical => Some(timeouts.critical),
        }
    }

    pub fn justification_required(&self) -> bool {
        matches!(self, RiskLevel::Critical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Developer,
    TechLead,
    DevopsEngineer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Developer => "developer",
            Role::TechLead => "tech_lead",
            Role::DevopsEngineer => "devops_engineer",
        }
    }
}

/// A predicate over task fields (§4.5: "keyword presence in description, environment tag,
/// operation class, and priority"). All set fields must match (AND); an empty/unset field
/// is not checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskPredicate {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub min_priority: Option<Priority>,
}

impl RiskPredicate {
    fn matches(&self, task: &Task) -> bool {
        if !self.keywords.is_empty() {
            let description = task.description.to_lowercase();
            if !self.keywords.iter().any(|k| description.contains(&k.to_lowercase())) {
                return false;
            }
        }
        if let Some(environment) = &self.environment {
            if task.environment() != Some(environment.as_str()) {
                return false;
            }
        }
        if let Some(operation) = &self.operation {
            if task.operation() != Some(operation.as_str()) {
                return false;
            }
        }
        if let Some(min_priority) = self.min_priority {
            if task.priority < min_priority {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRule {
    pub predicate: RiskPredicate,
    pub level: RiskLevel,
    pub required_role: Role,
}

impl RiskRule {
    /// A reasonable default table, first-match-wins, covering the shapes the predicate
    /// language supports. Operators are expected to replace this via `risk_rules` in
    /// config for their own environment/operation taxonomy.
    pub fn default_table() -> Vec<RiskRule> {
        vec![
            RiskRule {
                predicate: RiskPredicate {
                    operation: Some("secret".into()),
                    ..Default::default()
                },
                level: RiskLevel::Critical,
                required_role: Role::DevopsEngineer,
            },
            RiskRule {
                predicate: RiskPredicate {
                    operation: Some("delete".into()),
                    environment: Some("prod".into()),
                    ..Default::default()
                },
                level: RiskLevel::Critical,
                required_role: Role::DevopsEngineer,
            },
            RiskRule {
                predicate: RiskPredicate {
                    operation: Some("deploy".into()),
                    environment: Some("prod".into()),
                    ..Default::default()
                },
                level: RiskLevel::High,
                required_role: Role::TechLead,
            },
            RiskRule {
                predicate: RiskPredicate {
                    operation: Some("delete".into()),
                    ..Default::default()
                },
                level: RiskLevel::High,
                required_role: Role::TechLead,
            },
            RiskRule {
                predicate: RiskPredicate {
                    operation: Some("write".into()),
                    environment: Some("prod".into()),
                    ..Default::default()
                },
                level: RiskLevel::Medium,
                required_role: Role::Developer,
            },
            RiskRule {
                predicate: RiskPredicate {
                    operation: Some("deploy".into()),
                    ..Default::default()
                },
                level: RiskLevel::Medium,
                required_role: Role::Developer,
            },
            RiskRule {
                predicate: RiskPredicate {
                    keywords: vec!["migration".into()],
                    ..Default::default()
                },
                level: RiskLevel::Medium,
                required_role: Role::Developer,
            },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub required_role: Option<Role>,
    pub justification_required: bool,
}

/// `assess(task)` (§4.5): first matching rule wins; unmatched tasks default to `low`.
pub fn assess(task: &Task, rules: &[RiskRule]) -> RiskAssessment {
    for rule in rules {
        if rule.predicate.matches(task) {
            return RiskAssessment {
                level: rule.level,
                required_role: Some(rule.required_role),
                justification_required: rule.level.justification_required(),
            };
        }
    }
    RiskAssessment {
        level: RiskLevel::Low,
        required_role: None,
        justification_required: false,
    }
}
