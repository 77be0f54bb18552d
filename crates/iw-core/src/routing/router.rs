//! Asks the reasoning capability which agents to run, then guards the answer.

use super::guard::RoutingGuard;
use super::plan::{ContextKind, RoutePlan, RoutingContext};
use super::registry::AgentRegistry;
use super::RoutingError;
use crate::reasoning::{ReasoningCapability, ROUTING_TEMPERATURE};
use std::sync::Arc;
use tracing::{debug, instrument};

const SYSTEM_PROMPT: &str = "You are an orchestration router for a security automation platform \
that analyzes identity-provider security events. You NEVER execute actions yourself. You only \
decide which agents (tools) should be called and in what order. Be concise and deterministic.";

const RAW_EVENTS_RULES: &str = r#"Routing rules for kind == "raw_events":
- The phase MUST be "ingest" or "analysis".
- detector_agent MUST be included.
- risk_agent MUST be included, after detector_agent.
- The typical order is: detector_agent, then risk_agent.
- Do NOT include planner_agent or command_agent here."#;

const INCIDENT_RULES: &str = r#"Routing rules for kind == "incident":
- The phase MUST be "response".
- planner_agent MUST be included.
- If the incident severity is high or critical, command_agent SHOULD also be included.
- The typical order is: planner_agent, then optionally command_agent."#;

const GENERIC_RULES: &str = "Routing rules:
- Choose a reasonable phase from: ingest, analysis, response.
- Use only agents that make sense for the provided context.";

const GENERAL_INSTRUCTIONS: &str = r#"General instructions:
- Select only agents relevant to this context.
- Prefer critical=true agents when needed.
- Respect logical dependencies. For example:
  - detector_agent must run before risk_agent.
  - risk_agent must run before planner_agent.
  - planner_agent must run before command_agent.
- If context.kind == "raw_events": focus on detection and risk scoring.
- If context.kind == "incident": focus on planning and (optionally) command generation.
- Minimize unnecessary agents.

Return ONLY JSON with this structure:
{
  "phase": "ingest|analysis|response",
  "steps": [
    {
      "agent_name": "string",
      "reason": "string",
      "when": "string"
    }
  ],
  "notes": "string or null"
}"#;

/// Produces guarded route plans.
pub struct Router {
    reasoner: Arc<dyn ReasoningCapability>,
    registry: AgentRegistry,
    guard: RoutingGuard,
}

impl Router {
    pub fn new(reasoner: Arc<dyn ReasoningCapability>, registry: AgentRegistry) -> Self {
        Self {
            reasoner,
            registry,
            guard: RoutingGuard::new(),
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Requests a route plan for `context` and repairs it.
    ///
    /// Fails only when the reasoning call fails or the reply does not have the
    /// shape of a route plan at all.
    #[instrument(skip(self, context), fields(context = %context.kind))]
    pub async fn route(&self, context: &RoutingContext) -> Result<RoutePlan, RoutingError> {
        let user = self.user_prompt(context);
        let reply = self
            .reasoner
            .invoke(SYSTEM_PROMPT, &user, ROUTING_TEMPERATURE)
            .await?;
        let candidate = RoutePlan::from_reply(reply)?;
        debug!(agents = ?candidate.agent_names(), "Candidate route plan");

        let plan = self.guard.repair(candidate, context);
        debug!(agents = ?plan.agent_names(), phase = %plan.phase, "Guarded route plan");
        Ok(plan)
    }

    fn user_prompt(&self, context: &RoutingContext) -> String {
        let rules = match context.kind {
            ContextKind::RawEvents => RAW_EVENTS_RULES,
            ContextKind::Incident => INCIDENT_RULES,
            ContextKind::Other(_) => GENERIC_RULES,
        };
        let context_json = serde_json::to_string_pretty(context).unwrap_or_default();

        format!(
            "Available agents:\n{}\n\nContext (JSON):\n{}\n\n{}\n\n{}\n",
            self.registry.describe(),
            context_json,
            rules,
            GENERAL_INSTRUCTIONS
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedReasoner;
    use serde_json::json;

    #[tokio::test]
    async fn test_route_repairs_model_reply() {
        let reasoner = Arc::new(ScriptedReasoner::new().on(
            "orchestration router",
            json!({"phase": "analysis", "steps": [
                {"agent_name": "risk_agent", "reason": "score", "when": "now"}
            ]}),
        ));
        let router = Router::new(reasoner.clone(), AgentRegistry::builtin());

        let plan = router
            .route(&RoutingContext::new(ContextKind::RawEvents, json!([])))
            .await
            .unwrap();
        assert_eq!(plan.agent_names(), vec!["detector_agent", "risk_agent"]);

        let calls = reasoner.calls();
        assert_eq!(calls.len(), 1);
        assert!((calls[0].temperature - ROUTING_TEMPERATURE).abs() < f32::EPSILON);
        assert!(calls[0].user.contains("kind == \"raw_events\""));
        assert!(calls[0].user.contains("- planner_agent:"));
    }

    #[tokio::test]
    async fn test_route_fails_on_unparseable_plan() {
        let reasoner = Arc::new(
            ScriptedReasoner::new().on("orchestration router", json!({"steps": "detector_agent"})),
        );
        let router = Router::new(reasoner, AgentRegistry::builtin());

        let err = router
            .route(&RoutingContext::new(ContextKind::Incident, json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::InvalidPlan(_)));
    }

    #[tokio::test]
    async fn test_route_propagates_reasoning_failure() {
        let router = Router::new(Arc::new(ScriptedReasoner::new()), AgentRegistry::builtin());
        let err = router
            .route(&RoutingContext::new(ContextKind::RawEvents, json!([])))
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::Reasoning(_)));
    }
}
