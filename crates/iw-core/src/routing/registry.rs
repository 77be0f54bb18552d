//! The closed set of pipeline agents and their descriptions.

use super::plan::Phase;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Registry problems detected at construction time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Agent not registered: {0}")]
    MissingAgent(AgentKind),
}

/// Every agent the orchestrator can dispatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentKind {
    #[serde(rename = "detector_agent")]
    Detector,
    #[serde(rename = "risk_agent")]
    RiskAssessor,
    #[serde(rename = "planner_agent")]
    Planner,
    #[serde(rename = "command_agent")]
    CommandSynthesizer,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Detector,
        AgentKind::RiskAssessor,
        AgentKind::Planner,
        AgentKind::CommandSynthesizer,
    ];

    /// Wire name used in route plans.
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Detector => "detector_agent",
            AgentKind::RiskAssessor => "risk_agent",
            AgentKind::Planner => "planner_agent",
            AgentKind::CommandSynthesizer => "command_agent",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("Unknown agent: {}", s))
    }
}

/// Description of one agent, rendered into routing prompts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentMeta {
    pub kind: AgentKind,
    pub description: String,
    pub input_type: String,
    pub output_type: String,
    pub phase: Phase,
    /// Whether the pipeline is meaningless without this agent.
    pub critical: bool,
}

impl AgentMeta {
    fn new(
        kind: AgentKind,
        description: &str,
        input_type: &str,
        output_type: &str,
        phase: Phase,
        critical: bool,
    ) -> Self {
        Self {
            kind,
            description: description.to_string(),
            input_type: input_type.to_string(),
            output_type: output_type.to_string(),
            phase,
            critical,
        }
    }

    /// One prompt line describing this agent.
    pub fn prompt_line(&self) -> String {
        format!(
            "- {}: {} (phase={}, input={}, output={}, critical={})",
            self.kind,
            self.description,
            self.phase,
            self.input_type,
            self.output_type,
            self.critical
        )
    }
}

/// Lookup table from agent kind to its metadata.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: HashMap<AgentKind, AgentMeta>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Registry with every built-in agent.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(AgentMeta::new(
            AgentKind::Detector,
            "Analyzes identity-provider events to detect anomalies like impossible travel and failed-login bursts. Produces Findings.",
            "List[IdentityEvent]",
            "List[Finding]",
            Phase::Ingest,
            true,
        ));
        registry.register(AgentMeta::new(
            AgentKind::RiskAssessor,
            "Assigns severity and risk scores to Findings, deciding how serious each one is.",
            "Finding",
            "RiskAssessment",
            Phase::Analysis,
            true,
        ));
        registry.register(AgentMeta::new(
            AgentKind::Planner,
            "Creates a ResponsePlan (steps, rationale) for a given Incident.",
            "Incident",
            "ResponsePlan",
            Phase::Response,
            true,
        ));
        registry.register(AgentMeta::new(
            AgentKind::CommandSynthesizer,
            "Generates read-only commands from a ResponsePlan for a human analyst to review.",
            "ResponsePlan",
            "List[CommandSuggestion]",
            Phase::Response,
            false,
        ));
        registry
    }

    /// Registers an agent, replacing any previous entry for its kind.
    pub fn register(&mut self, meta: AgentMeta) {
        self.agents.insert(meta.kind, meta);
    }

    pub fn get(&self, kind: AgentKind) -> Option<&AgentMeta> {
        self.agents.get(&kind)
    }

    /// Looks up an agent by wire name.
    pub fn resolve(&self, name: &str) -> Option<&AgentMeta> {
        name.parse::<AgentKind>().ok().and_then(|kind| self.get(kind))
    }

    /// Entries in a stable order.
    pub fn list(&self) -> Vec<&AgentMeta> {
        AgentKind::ALL
            .iter()
            .filter_map(|kind| self.agents.get(kind))
            .collect()
    }

    /// Ensures every agent kind is registered.
    pub fn validate(&self) -> Result<(), RegistryError> {
        match AgentKind::ALL
            .into_iter()
            .find(|kind| !self.agents.contains_key(kind))
        {
            Some(kind) => Err(RegistryError::MissingAgent(kind)),
            None => Ok(()),
        }
    }

    /// Prompt block listing every registered agent.
    pub fn describe(&self) -> String {
        self.list()
            .iter()
            .map(|meta| meta.prompt_line())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
