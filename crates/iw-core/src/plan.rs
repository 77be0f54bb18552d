//! Response plans and the command suggestions derived from them.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

/// Structural problems that make a response plan unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Plan has no steps")]
    Empty,

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),

    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("Dependency cycle involving steps: {0}")]
    Cycle(String),
}

fn default_requires_approval() -> bool {
    true
}

/// One step of a response plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseStep {
    /// Canonical id (e.g. `lock_account`) or free text.
    pub step_id: String,
    pub description: String,
    pub rationale: String,
    #[serde(default = "default_requires_approval")]
    pub requires_human_approval: bool,
    /// Ids of steps that must happen before this one.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ResponseStep {
    pub fn new(
        step_id: impl Into<String>,
        description: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            description: description.into(),
            rationale: rationale.into(),
            requires_human_approval: true,
            dependencies: Vec::new(),
        }
    }

    pub fn depends_on(mut self, step_id: impl Into<String>) -> Self {
        self.dependencies.push(step_id.into());
        self
    }
}

/// The remediation plan for one incident.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponsePlan {
    pub incident_id: Uuid,
    pub overall_goal: String,
    pub steps: Vec<ResponseStep>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ResponsePlan {
    /// Builds a plan after checking its structure and ordering steps by dependency.
    ///
    /// Steps keep their given order except where a step would run before one of its
    /// dependencies; those are moved after it. Duplicate ids, dangling dependencies
    /// and cycles are rejected.
    pub fn new(
        incident_id: Uuid,
        overall_goal: impl Into<String>,
        steps: Vec<ResponseStep>,
        notes: Option<String>,
    ) -> Result<Self, PlanError> {
        let steps = order_by_dependencies(steps)?;
        Ok(Self {
            incident_id,
            overall_goal: overall_goal.into(),
            steps,
            notes,
        })
    }

    /// Returns the step with the given id.
    pub fn step(&self, step_id: &str) -> Option<&ResponseStep> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }
}

/// Stable topological sort: among the steps whose dependencies are satisfied,
/// the one listed first goes next.
fn order_by_dependencies(steps: Vec<ResponseStep>) -> Result<Vec<ResponseStep>, PlanError> {
    if steps.is_empty() {
        return Err(PlanError::Empty);
    }

    let mut seen = HashSet::new();
    for step in &steps {
        if !seen.insert(step.step_id.as_str()) {
            return Err(PlanError::DuplicateStep(step.step_id.clone()));
        }
    }
    for step in &steps {
        if let Some(dependency) = step.dependencies.iter().find(|d| !seen.contains(d.as_str())) {
            return Err(PlanError::UnknownDependency {
                step: step.step_id.clone(),
                dependency: dependency.clone(),
            });
        }
    }

    let mut remaining: Vec<Option<ResponseStep>> = steps.into_iter().map(Some).collect();
    let mut placed: HashMap<String, usize> = HashMap::new();
    let mut ordered = Vec::with_capacity(remaining.len());

    while ordered.len() < remaining.len() {
        let next = remaining.iter().position(|slot| {
            slot.as_ref().is_some_and(|step| {
                step.dependencies
                    .iter()
                    .all(|d| d == &step.step_id || placed.contains_key(d))
            })
        });

        match next {
            Some(index) => {
                if let Some(step) = remaining[index].take() {
                    placed.insert(step.step_id.clone(), ordered.len());
                    ordered.push(step);
                }
            }
            None => {
                let stuck: Vec<&str> = remaining
                    .iter()
                    .flatten()
                    .map(|s| s.step_id.as_str())
                    .collect();
                return Err(PlanError::Cycle(stuck.join(", ")));
            }
        }
    }

    Ok(ordered)
}

/// A read-only remediation command for a human to review before running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandSuggestion {
    /// The plan step this command implements.
    pub step_id: String,
    pub description: String,
    pub command: String,
    /// Target system tag (e.g. `okta_api`).
    pub system: String,
    /// Always true: suggestions are never executed by the pipeline.
    pub read_only: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Persisted form of a command suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandRecord {
    pub incident_id: Uuid,
    pub command: CommandSuggestion,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(plan: &ResponsePlan) -> Vec<&str> {
        plan.steps.iter().map(|s| s.step_id.as_str()).collect()
    }

    #[test]
    fn test_plan_keeps_order_when_dependencies_hold() {
        let plan = ResponsePlan::new(
            Uuid::new_v4(),
            "Contain account takeover",
            vec![
                ResponseStep::new("collect_auth_logs", "Pull logs", "Scope"),
                ResponseStep::new("lock_account", "Suspend user", "Contain")
                    .depends_on("collect_auth_logs"),
                ResponseStep::new("notify_user", "Tell the user", "Communicate"),
            ],
            None,
        )
        .unwrap();
        assert_eq!(
            ids(&plan),
            vec!["collect_auth_logs", "lock_account", "notify_user"]
        );
    }

    #[test]
    fn test_plan_moves_step_after_its_dependency() {
        let plan = ResponsePlan::new(
            Uuid::new_v4(),
            "goal",
            vec![
                ResponseStep::new("revoke_sessions", "d", "r").depends_on("lock_account"),
                ResponseStep::new("collect_auth_logs", "d", "r"),
                ResponseStep::new("lock_account", "d", "r"),
            ],
            None,
        )
        .unwrap();
        assert_eq!(
            ids(&plan),
            vec!["collect_auth_logs", "lock_account", "revoke_sessions"]
        );
    }

    #[test]
    fn test_plan_rejects_unknown_dependency() {
        let err = ResponsePlan::new(
            Uuid::new_v4(),
            "goal",
            vec![ResponseStep::new("lock_account", "d", "r").depends_on("optional_step_id")],
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownDependency {
                step: "lock_account".into(),
                dependency: "optional_step_id".into(),
            }
        );
    }

    #[test]
    fn test_plan_rejects_cycle_and_duplicates() {
        let cycle = ResponsePlan::new(
            Uuid::new_v4(),
            "goal",
            vec![
                ResponseStep::new("a", "d", "r").depends_on("b"),
                ResponseStep::new("b", "d", "r").depends_on("a"),
            ],
            None,
        );
        assert!(matches!(cycle, Err(PlanError::Cycle(_))));

        let duplicate = ResponsePlan::new(
            Uuid::new_v4(),
            "goal",
            vec![
                ResponseStep::new("a", "d", "r"),
                ResponseStep::new("a", "d", "r"),
            ],
            None,
        );
        assert_eq!(duplicate, Err(PlanError::DuplicateStep("a".into())));
    }

    #[test]
    fn test_step_defaults_require_approval() {
        let step: ResponseStep = serde_json::from_value(serde_json::json!({
            "step_id": "lock_account",
            "description": "Suspend",
            "rationale": "Contain"
        }))
        .unwrap();
        assert!(step.requires_human_approval);
        assert!(step.dependencies.is_empty());
    }
}
