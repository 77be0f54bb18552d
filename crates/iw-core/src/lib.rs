//! # iw-core
//!
//! Core pipeline and data models for IdP Warden.
//!
//! This crate provides the identity event model, the deterministic detection
//! engine, agent routing with its guard, the reasoning-backed risk and planning
//! agents, the promotion policy, append-only record stores and the two-stage
//! orchestrator that ties them together.

pub mod agents;
pub mod detection;
pub mod event;
pub mod finding;
pub mod incident;
pub mod orchestrator;
pub mod plan;
pub mod policy;
pub mod reasoning;
pub mod risk;
pub mod routing;
pub mod store;
pub mod testing;

pub use agents::{ResponsePlanner, RiskAssessor};
pub use detection::{DetectionConfig, DetectionConfigError, DetectionEngine, Detector};
pub use event::{ClientContext, IdentityEvent, Outcome};
pub use finding::{Finding, FindingKind};
pub use incident::{Incident, IncidentStatus, Severity};
pub use orchestrator::{
    BatchReport, CommandSynthesis, IncidentFailure, IncidentOutcome, Orchestrator,
    OrchestratorBuilder, OrchestratorError,
};
pub use plan::{CommandRecord, CommandSuggestion, PlanError, ResponsePlan, ResponseStep};
pub use policy::{PolicyError, PromotionDecision, PromotionPolicy, DEFAULT_PROMOTION_THRESHOLD};
pub use reasoning::{extract_json_object, ReasoningCapability, ReasoningError};
pub use risk::RiskAssessment;
pub use routing::{
    AgentKind, AgentMeta, AgentRegistry, ContextKind, Phase, RoutePlan, RouteStep, Router,
    RoutingContext, RoutingError, RoutingGuard,
};
pub use store::{JsonlLog, MemoryLog, PipelineStore, RecordLog, StoreError};
