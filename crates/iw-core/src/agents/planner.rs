use crate::incident::Incident;
use crate::plan::{ResponsePlan, ResponseStep};
use crate::reasoning::{ReasoningCapability, ReasoningError, Reply, DEFAULT_TEMPERATURE};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

const SYSTEM_PROMPT: &str = "You are an incident response planner for identity-provider security \
incidents. You design step-by-step response plans that are safe and appropriate.";

/// Goal used when the reply does not state one.
pub const DEFAULT_GOAL: &str = "Respond to identity-provider security incident.";

/// Step ids the planner is steered towards.
pub const CANONICAL_STEP_IDS: [&str; 9] = [
    "collect_auth_logs",
    "analyze_geo_and_devices",
    "lock_account",
    "force_password_reset",
    "notify_user",
    "enable_mfa",
    "revoke_sessions",
    "forensic_review",
    "update_incident_status",
];

/// Builds response plans for incidents through the reasoning capability.
pub struct ResponsePlanner {
    reasoner: Arc<dyn ReasoningCapability>,
    temperature: f32,
}

impl ResponsePlanner {
    pub fn new(reasoner: Arc<dyn ReasoningCapability>) -> Self {
        Self {
            reasoner,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[instrument(skip(self, incident), fields(incident_id = %incident.id))]
    pub async fn plan(&self, incident: &Incident) -> Result<ResponsePlan, ReasoningError> {
        let incident_json = serde_json::to_string_pretty(incident)
            .map_err(|e| ReasoningError::Malformed(format!("incident serialization: {}", e)))?;
        let canonical = CANONICAL_STEP_IDS
            .iter()
            .map(|id| format!("  - \"{}\"", id))
            .collect::<Vec<_>>()
            .join("\n");
        let user = format!(
            r#"Incident (JSON):
{}

Design a concise but clear response plan.

Rules:
- Focus on containment, eradication, recovery, and communication as appropriate.
- Assume actions will be reviewed by a human analyst before execution.
- All steps should be safe and non-destructive.
- Mark steps that MUST be human-approved before execution.
- When possible, use one of these canonical step_id values:
{}
- You may still add other step_ids if needed, but prefer the canonical ones above.
- Every entry in "dependencies" must be the step_id of another step in this plan.

Return ONLY JSON:
{{
  "overall_goal": "string",
  "steps": [
    {{
      "step_id": "string",
      "description": "string",
      "rationale": "string",
      "requires_human_approval": true,
      "dependencies": ["optional_step_id"]
    }}
  ],
  "notes": "string or null"
}}"#,
            incident_json, canonical
        );

        let reply = self
            .reasoner
            .invoke(SYSTEM_PROMPT, &user, self.temperature)
            .await?;
        let plan = parse_plan(incident, &reply)?;
        debug!(steps = plan.steps.len(), "Response plan built");
        Ok(plan)
    }
}

fn parse_plan(incident: &Incident, reply: &Map<String, Value>) -> Result<ResponsePlan, ReasoningError> {
    let root = Reply::new("response plan", reply);
    let mut steps = Vec::new();

    for (index, item) in root.array("steps")?.iter().enumerate() {
        let Value::Object(fields) = item else {
            return Err(ReasoningError::Malformed(format!(
                "response plan: step {} is not an object",
                index
            )));
        };
        let step = Reply::new("response step", fields);
        steps.push(ResponseStep {
            step_id: step.str("step_id")?.to_string(),
            description: step.str("description")?.to_string(),
            rationale: step.str("rationale")?.to_string(),
            requires_human_approval: step.opt_bool("requires_human_approval")?.unwrap_or(true),
            dependencies: step.str_list("dependencies")?,
        });
    }

    let goal = root
        .opt_str("overall_goal")?
        .filter(|g| !g.trim().is_empty())
        .unwrap_or(DEFAULT_GOAL);
    let notes = root.opt_str("notes")?.map(str::to_string);

    ResponsePlan::new(incident.id, goal, steps, notes)
        .map_err(|e| ReasoningError::Malformed(format!("response plan: {}", e)))
}
