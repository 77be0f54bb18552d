//! Two-stage pipeline orchestration.
//!
//! Stage A turns a batch of raw events into findings and incidents:
//! detect, persist every finding, then assess each finding and persist one
//! incident per promoted finding. Stage B runs once per new incident, in
//! creation order: plan, persist the plan, then synthesize and persist
//! read-only commands from that plan.
//!
//! Each stage asks the router which agents to run; the router's answer has
//! already been repaired by the routing guard, so the dispatch loop only has
//! to execute it.
//!
//! ## Failure isolation
//!
//! - A failed risk assessment skips that finding; the others continue.
//! - A failed routing, planning or command step skips that incident.
//! - Persistence failures and unknown agents abort the batch. Records written
//!   before the failure stay valid.

use crate::agents::{ResponsePlanner, RiskAssessor};
use crate::detection::DetectionEngine;
use crate::event::IdentityEvent;
use crate::finding::Finding;
use crate::incident::Incident;
use crate::plan::{CommandRecord, CommandSuggestion, ResponsePlan};
use crate::policy::PromotionPolicy;
use crate::reasoning::{ReasoningCapability, ReasoningError};
use crate::routing::{
    AgentKind, AgentRegistry, ContextKind, RegistryError, Router, RoutingContext, RoutingError,
};
use crate::store::{PipelineStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Errors that can occur in the orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Agent registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),

    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Agent {agent} cannot run for context {context}")]
    MisplacedAgent { agent: AgentKind, context: ContextKind },
}

impl OrchestratorError {
    /// Whether this failure stays confined to the finding or incident being handled.
    pub fn is_isolated(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Routing(_) | OrchestratorError::Reasoning(_)
        )
    }
}

/// Maps a response plan to read-only command suggestions.
pub trait CommandSynthesis: Send + Sync {
    fn synthesize(&self, plan: &ResponsePlan) -> Vec<CommandSuggestion>;
}

/// An incident whose Stage B was abandoned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentFailure {
    pub incident_id: Uuid,
    pub error: String,
}

/// Summary of one processed batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchReport {
    pub events: usize,
    pub findings: usize,
    pub assessed: usize,
    pub assessment_failures: usize,
    /// Ids of incidents created in this batch, in creation order.
    pub incidents: Vec<Uuid>,
    pub plans: usize,
    pub commands: usize,
    pub incident_failures: Vec<IncidentFailure>,
}

/// What Stage B produced for one incident.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentOutcome {
    pub plan: Option<ResponsePlan>,
    pub commands: Vec<CommandSuggestion>,
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    reasoner: Arc<dyn ReasoningCapability>,
    synthesizer: Arc<dyn CommandSynthesis>,
    store: PipelineStore,
    engine: DetectionEngine,
    policy: PromotionPolicy,
    registry: AgentRegistry,
    temperature: Option<f32>,
}

impl OrchestratorBuilder {
    pub fn with_engine(mut self, engine: DetectionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_policy(mut self, policy: PromotionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_registry(mut self, registry: AgentRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Overrides the sampling temperature of the risk and planning calls.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Validates the agent registry and assembles the orchestrator.
    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        self.registry.validate()?;

        let mut assessor = RiskAssessor::new(Arc::clone(&self.reasoner));
        let mut planner = ResponsePlanner::new(Arc::clone(&self.reasoner));
        if let Some(temperature) = self.temperature {
            assessor = assessor.with_temperature(temperature);
            planner = planner.with_temperature(temperature);
        }

        info!(
            model = self.reasoner.model(),
            detectors = ?self.engine.detector_names(),
            promotion_threshold = self.policy.threshold(),
            "Orchestrator ready"
        );

        Ok(Orchestrator {
            router: Router::new(self.reasoner, self.registry),
            engine: self.engine,
            assessor,
            planner,
            synthesizer: self.synthesizer,
            policy: self.policy,
            store: self.store,
        })
    }
}

/// Drives batches of events through the pipeline.
pub struct Orchestrator {
    router: Router,
    engine: DetectionEngine,
    assessor: RiskAssessor,
    planner: ResponsePlanner,
    synthesizer: Arc<dyn CommandSynthesis>,
    policy: PromotionPolicy,
    store: PipelineStore,
}

impl Orchestrator {
    /// Starts a builder with default detection, promotion and agent registry.
    pub fn builder(
        reasoner: Arc<dyn ReasoningCapability>,
        synthesizer: Arc<dyn CommandSynthesis>,
        store: PipelineStore,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            reasoner,
            synthesizer,
            store,
            engine: DetectionEngine::with_defaults(),
            policy: PromotionPolicy::default(),
            registry: AgentRegistry::builtin(),
            temperature: None,
        }
    }

    pub fn store(&self) -> &PipelineStore {
        &self.store
    }

    /// Runs both stages over one batch of events.
    #[instrument(skip_all, fields(events = events.len()))]
    pub async fn process_batch(
        &self,
        events: &[IdentityEvent],
    ) -> Result<BatchReport, OrchestratorError> {
        let mut report = BatchReport {
            events: events.len(),
            ..Default::default()
        };

        let incidents = self.process_raw_events(events, &mut report).await?;

        for incident in &incidents {
            match self.process_incident(incident).await {
                Ok(outcome) => {
                    report.plans += usize::from(outcome.plan.is_some());
                    report.commands += outcome.commands.len();
                }
                Err(e) if e.is_isolated() => {
                    warn!(incident_id = %incident.id, error = %e, "Incident response abandoned");
                    report.incident_failures.push(IncidentFailure {
                        incident_id: incident.id,
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            findings = report.findings,
            incidents = report.incidents.len(),
            plans = report.plans,
            commands = report.commands,
            "Batch processed"
        );
        Ok(report)
    }

    /// Stage A: detection, assessment and promotion.
    #[instrument(skip_all, fields(stage = "raw_events"))]
    async fn process_raw_events(
        &self,
        events: &[IdentityEvent],
        report: &mut BatchReport,
    ) -> Result<Vec<Incident>, OrchestratorError> {
        let route = self.router.route(&RoutingContext::raw_events(events)).await?;

        let mut findings: Vec<Finding> = Vec::new();
        let mut incidents = Vec::new();

        for step in &route.steps {
            match self.dispatch_kind(&step.agent_name, &ContextKind::RawEvents)? {
                AgentKind::Detector => {
                    findings = self.engine.detect(events);
                    for finding in &findings {
                        self.store.findings.append(finding).await?;
                    }
                    report.findings += findings.len();
                    info!(count = findings.len(), "Findings persisted");
                }
                AgentKind::RiskAssessor => {
                    for finding in &findings {
                        let risk = match self.assessor.assess(finding).await {
                            Ok(risk) => risk,
                            Err(e) => {
                                warn!(finding_id = %finding.id, error = %e, "Risk assessment failed");
                                report.assessment_failures += 1;
                                continue;
                            }
                        };
                        report.assessed += 1;

                        let decision = self.policy.decide(&risk);
                        debug!(finding_id = %finding.id, %decision, score = risk.score, "Promotion decided");
                        if !decision.is_promoted() {
                            continue;
                        }

                        let incident = Incident::from_finding(finding, &risk);
                        self.store.incidents.append(&incident).await?;
                        info!(
                            incident_id = %incident.id,
                            finding_id = %finding.id,
                            severity = %incident.severity,
                            "Incident created"
                        );
                        report.incidents.push(incident.id);
                        incidents.push(incident);
                    }
                }
                agent => {
                    return Err(OrchestratorError::MisplacedAgent {
                        agent,
                        context: ContextKind::RawEvents,
                    })
                }
            }
        }

        Ok(incidents)
    }

    /// Stage B for one incident: planning and command synthesis.
    #[instrument(skip_all, fields(stage = "incident", incident_id = %incident.id))]
    pub async fn process_incident(
        &self,
        incident: &Incident,
    ) -> Result<IncidentOutcome, OrchestratorError> {
        let route = self.router.route(&RoutingContext::incident(incident)).await?;
        let mut outcome = IncidentOutcome::default();

        for step in &route.steps {
            match self.dispatch_kind(&step.agent_name, &ContextKind::Incident)? {
                AgentKind::Planner => {
                    let plan = self.planner.plan(incident).await?;
                    self.store.plans.append(&plan).await?;
                    info!(steps = plan.steps.len(), "Response plan persisted");
                    outcome.plan = Some(plan);
                }
                AgentKind::CommandSynthesizer => {
                    // Commands only ever come from a plan that is already persisted.
                    let Some(plan) = &outcome.plan else {
                        debug!("No response plan, skipping command synthesis");
                        continue;
                    };
                    for command in self.synthesizer.synthesize(plan) {
                        let record = CommandRecord {
                            incident_id: incident.id,
                            command,
                        };
                        self.store.commands.append(&record).await?;
                        outcome.commands.push(record.command);
                    }
                    info!(count = outcome.commands.len(), "Commands persisted");
                }
                agent => {
                    return Err(OrchestratorError::MisplacedAgent {
                        agent,
                        context: ContextKind::Incident,
                    })
                }
            }
        }

        Ok(outcome)
    }

    fn dispatch_kind(
        &self,
        agent_name: &str,
        context: &ContextKind,
    ) -> Result<AgentKind, OrchestratorError> {
        let meta = self
            .router
            .registry()
            .resolve(agent_name)
            .ok_or_else(|| OrchestratorError::UnknownAgent(agent_name.to_string()))?;
        debug!(agent = %meta.kind, context = %context, "Dispatching agent");
        Ok(meta.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ResponseStep;
    use crate::store::{valid_records, MemoryLog};
    use crate::testing::{failure_burst, ScriptedReasoner, PLANNER_PROMPT, RISK_PROMPT, ROUTER_PROMPT};
    use serde_json::json;

    /// Emits one command per plan step.
    struct EchoSynthesizer;

    impl CommandSynthesis for EchoSynthesizer {
        fn synthesize(&self, plan: &ResponsePlan) -> Vec<CommandSuggestion> {
            plan.steps
                .iter()
                .map(|step: &ResponseStep| CommandSuggestion {
                    step_id: step.step_id.clone(),
                    description: step.description.clone(),
                    command: format!("echo {}", step.step_id),
                    system: "test".into(),
                    read_only: true,
                    notes: None,
                })
                .collect()
        }
    }

    fn risk(severity: &str, score: f64) -> serde_json::Value {
        json!({"severity": severity, "likelihood": 0.5, "impact": 0.5,
               "score": score, "rationale": "r"})
    }

    fn route(phase: &str, agents: &[&str]) -> serde_json::Value {
        let steps: Vec<_> = agents
            .iter()
            .map(|a| json!({"agent_name": a, "reason": "r", "when": "now"}))
            .collect();
        json!({"phase": phase, "steps": steps})
    }

    fn plan_reply() -> serde_json::Value {
        json!({"overall_goal": "contain", "steps": [
            {"step_id": "lock_account", "description": "d", "rationale": "r"}
        ]})
    }

    fn orchestrator(reasoner: ScriptedReasoner, store: PipelineStore) -> Orchestrator {
        Orchestrator::builder(Arc::new(reasoner), Arc::new(EchoSynthesizer), store)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_low_risk_findings_are_not_promoted() {
        let reasoner = ScriptedReasoner::new()
            .on(ROUTER_PROMPT, route("ingest", &["detector_agent", "risk_agent"]))
            .on(RISK_PROMPT, risk("low", 0.2));
        let store = PipelineStore::in_memory();
        let report = orchestrator(reasoner, store.clone())
            .process_batch(&failure_burst("00u1", 5))
            .await
            .unwrap();

        assert_eq!(report.findings, 1);
        assert_eq!(report.assessed, 1);
        assert!(report.incidents.is_empty());
        assert_eq!(store.findings.read_all().await.unwrap().len(), 1);
        assert!(store.incidents.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assessment_failure_is_isolated() {
        let reasoner = ScriptedReasoner::new()
            .on(ROUTER_PROMPT, route("ingest", &[]))
            .on(ROUTER_PROMPT, route("response", &["planner_agent"]))
            .on_text(RISK_PROMPT, "not json at all")
            .on(RISK_PROMPT, risk("high", 0.9))
            .on(PLANNER_PROMPT, plan_reply());
        let store = PipelineStore::in_memory();
        let report = orchestrator(reasoner, store.clone())
            .process_batch(&failure_burst("00u1", 6))
            .await
            .unwrap();

        assert_eq!(report.findings, 2);
        assert_eq!(report.assessment_failures, 1);
        assert_eq!(report.assessed, 1);
        assert_eq!(report.incidents.len(), 1);
        // High severity forces the command step even though the router left it out.
        assert_eq!(report.commands, 1);
    }

    #[tokio::test]
    async fn test_planning_failure_is_isolated_per_incident() {
        let reasoner = ScriptedReasoner::new()
            .on(ROUTER_PROMPT, route("ingest", &["detector_agent", "risk_agent"]))
            .on(ROUTER_PROMPT, route("response", &["planner_agent", "command_agent"]))
            .on(RISK_PROMPT, risk("critical", 0.95))
            .on_text(PLANNER_PROMPT, "I cannot help with that.")
            .on(PLANNER_PROMPT, plan_reply());
        let store = PipelineStore::in_memory();
        let report = orchestrator(reasoner, store.clone())
            .process_batch(&failure_burst("00u1", 6))
            .await
            .unwrap();

        assert_eq!(report.incidents.len(), 2);
        assert_eq!(report.incident_failures.len(), 1);
        assert_eq!(report.incident_failures[0].incident_id, report.incidents[0]);
        assert_eq!(report.plans, 1);
        assert_eq!(report.commands, 1);

        let commands = valid_records(store.commands.read_all().await.unwrap());
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].incident_id, report.incidents[1]);
    }

    #[tokio::test]
    async fn test_stage_b_routing_failure_is_isolated_per_incident() {
        let reasoner = ScriptedReasoner::new()
            .on(ROUTER_PROMPT, route("ingest", &["detector_agent", "risk_agent"]))
            .on(ROUTER_PROMPT, json!({"phase": "response"}))
            .on(ROUTER_PROMPT, route("response", &["planner_agent"]))
            .on(RISK_PROMPT, risk("critical", 0.95))
            .on(PLANNER_PROMPT, plan_reply());
        let store = PipelineStore::in_memory();
        let report = orchestrator(reasoner, store.clone())
            .process_batch(&failure_burst("00u1", 6))
            .await
            .unwrap();

        assert_eq!(report.incidents.len(), 2);
        assert_eq!(report.incident_failures.len(), 1);
        assert_eq!(report.incident_failures[0].incident_id, report.incidents[0]);
        assert!(report.incident_failures[0].error.contains("Routing"));
        assert_eq!(report.plans, 1);

        let plans = valid_records(store.plans.read_all().await.unwrap());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].incident_id, report.incidents[1]);
    }

    #[tokio::test]
    async fn test_low_severity_incident_gets_no_commands_unless_requested() {
        let reasoner = ScriptedReasoner::new()
            .on(ROUTER_PROMPT, route("ingest", &["detector_agent", "risk_agent"]))
            .on(ROUTER_PROMPT, route("response", &["planner_agent"]))
            .on(RISK_PROMPT, risk("low", 0.65))
            .on(PLANNER_PROMPT, plan_reply());
        let store = PipelineStore::in_memory();
        let report = orchestrator(reasoner, store.clone())
            .process_batch(&failure_burst("00u1", 5))
            .await
            .unwrap();

        assert_eq!(report.incidents.len(), 1);
        assert_eq!(report.plans, 1);
        assert_eq!(report.commands, 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts_batch() {
        let incidents = MemoryLog::<Incident>::new();
        incidents.set_fail_appends(true);
        let store = PipelineStore {
            incidents: Arc::new(incidents),
            ..PipelineStore::in_memory()
        };
        let reasoner = ScriptedReasoner::new()
            .on(ROUTER_PROMPT, route("ingest", &["detector_agent", "risk_agent"]))
            .on(RISK_PROMPT, risk("high", 0.9));

        let err = orchestrator(reasoner, store.clone())
            .process_batch(&failure_burst("00u1", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Store(_)));
        // Findings written before the failure remain.
        assert_eq!(store.findings.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stage_a_routing_failure_aborts_batch() {
        let reasoner = ScriptedReasoner::new().on(ROUTER_PROMPT, json!({"phase": "ingest"}));
        let err = orchestrator(reasoner, PipelineStore::in_memory())
            .process_batch(&failure_burst("00u1", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Routing(_)));
    }

    #[tokio::test]
    async fn test_build_rejects_incomplete_registry() {
        let result = Orchestrator::builder(
            Arc::new(ScriptedReasoner::new()),
            Arc::new(EchoSynthesizer),
            PipelineStore::in_memory(),
        )
        .with_registry(AgentRegistry::new())
        .build();
        assert!(matches!(
            result,
            Err(OrchestratorError::Registry(RegistryError::MissingAgent(_)))
        ));
    }
}
