//! Deterministic validation and repair of candidate route plans.
//!
//! The guard is the only thing standing between an unreliable reasoning reply
//! and agent dispatch. For known context kinds its output always satisfies the
//! sequencing rules below, whatever the candidate looked like:
//!
//! * `raw_events`: exactly the detector and the risk assessor, detector first,
//!   phase `ingest`.
//! * `incident`: the planner first, then the command synthesizer if the incident
//!   is high or critical or the candidate asked for it, phase `response`.
//!
//! Other context kinds pass through untouched.

use super::plan::{ContextKind, Phase, RoutePlan, RouteStep, RoutingContext};
use super::registry::AgentKind;
use crate::incident::Severity;
use std::collections::HashSet;
use tracing::warn;

/// Repairs route plans against the sequencing rules of their context.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingGuard;

impl RoutingGuard {
    pub fn new() -> Self {
        Self
    }

    /// Returns a corrected copy of `candidate` for `context`.
    pub fn repair(&self, candidate: RoutePlan, context: &RoutingContext) -> RoutePlan {
        match &context.kind {
            ContextKind::RawEvents => repair_raw_events(candidate, &context.kind),
            ContextKind::Incident => {
                let escalating = context
                    .severity()
                    .and_then(|s| Severity::parse(&s))
                    .is_some_and(|s| s.is_escalating());
                repair_incident(candidate, &context.kind, escalating)
            }
            ContextKind::Other(_) => candidate,
        }
    }
}

fn repair_raw_events(mut plan: RoutePlan, kind: &ContextKind) -> RoutePlan {
    let detector = AgentKind::Detector.name();
    let assessor = AgentKind::RiskAssessor.name();

    if !plan.contains(detector) {
        warn!(context = %kind, agent = detector, "Route plan missing required agent, inserting first");
        plan.steps.insert(
            0,
            RouteStep::new(
                detector,
                "Required to analyze raw identity events and produce findings.",
                "now",
            ),
        );
    }
    if !plan.contains(assessor) {
        warn!(context = %kind, agent = assessor, "Route plan missing required agent, appending");
        plan.steps.push(RouteStep::new(
            assessor,
            "Required to score findings and decide incident promotion.",
            "after_detector_agent",
        ));
    }

    retain_agents(&mut plan, &[detector, assessor], kind);
    collapse_duplicates(&mut plan, kind);
    move_after(&mut plan, detector, assessor, kind);
    set_phase(&mut plan, Phase::Ingest, kind);
    plan
}

fn repair_incident(mut plan: RoutePlan, kind: &ContextKind, escalating: bool) -> RoutePlan {
    let planner = AgentKind::Planner.name();
    let synthesizer = AgentKind::CommandSynthesizer.name();

    if !plan.contains(planner) {
        warn!(context = %kind, agent = planner, "Route plan missing required agent, inserting first");
        plan.steps.insert(
            0,
            RouteStep::new(
                planner,
                "Required to generate a response plan for the incident.",
                "now",
            ),
        );
    }
    if escalating && !plan.contains(synthesizer) {
        warn!(context = %kind, agent = synthesizer, "High-severity incident without command step, appending");
        plan.steps.push(RouteStep::new(
            synthesizer,
            "Generate read-only commands for the response plan.",
            "after_planner_agent",
        ));
    }

    retain_agents(&mut plan, &[planner, synthesizer], kind);
    collapse_duplicates(&mut plan, kind);
    move_after(&mut plan, planner, synthesizer, kind);
    set_phase(&mut plan, Phase::Response, kind);
    plan
}

/// Drops steps for agents outside `allowed`, keeping survivors in order.
fn retain_agents(plan: &mut RoutePlan, allowed: &[&str], kind: &ContextKind) {
    plan.steps.retain(|step| {
        let keep = allowed.contains(&step.agent_name.as_str());
        if !keep {
            warn!(context = %kind, agent = %step.agent_name, "Dropping agent not allowed in this context");
        }
        keep
    });
}

/// Keeps only the first step for each agent.
fn collapse_duplicates(plan: &mut RoutePlan, kind: &ContextKind) {
    let mut seen = HashSet::new();
    plan.steps.retain(|step| {
        let first = seen.insert(step.agent_name.clone());
        if !first {
            warn!(context = %kind, agent = %step.agent_name, "Dropping duplicate agent step");
        }
        first
    });
}

/// Moves `dependent` to directly after `prerequisite` if it currently precedes it.
fn move_after(plan: &mut RoutePlan, prerequisite: &str, dependent: &str, kind: &ContextKind) {
    let position = |name: &str| plan.steps.iter().position(|s| s.agent_name == name);
    let (Some(pre), Some(dep)) = (position(prerequisite), position(dependent)) else {
        return;
    };
    if dep < pre {
        warn!(context = %kind, agent = dependent, after = prerequisite, "Reordering agent after its prerequisite");
        let step = plan.steps.remove(dep);
        // Removal shifted the prerequisite one slot to the left.
        plan.steps.insert(pre, step);
    }
}

fn set_phase(plan: &mut RoutePlan, phase: Phase, kind: &ContextKind) {
    if plan.phase != phase {
        warn!(context = %kind, from = %plan.phase, to = %phase, "Overriding route plan phase");
        plan.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(phase: Phase, agents: &[&str]) -> RoutePlan {
        RoutePlan::new(
            phase,
            agents
                .iter()
                .map(|a| RouteStep::new(*a, "model reason", "now"))
                .collect(),
        )
    }

    fn raw_ctx() -> RoutingContext {
        RoutingContext::new(ContextKind::RawEvents, json!([]))
    }

    fn incident_ctx(severity: &str) -> RoutingContext {
        RoutingContext::new(ContextKind::Incident, json!({ "severity": severity }))
    }

    #[test]
    fn test_raw_events_empty_plan_gets_both_agents() {
        let repaired = RoutingGuard::new().repair(plan(Phase::Response, &[]), &raw_ctx());
        assert_eq!(repaired.agent_names(), vec!["detector_agent", "risk_agent"]);
        assert_eq!(repaired.phase, Phase::Ingest);
        assert_eq!(repaired.steps[1].when, "after_detector_agent");
    }

    #[test]
    fn test_raw_events_every_candidate_shape_is_repaired() {
        let candidates: Vec<Vec<&str>> = vec![
            vec!["risk_agent"],
            vec!["detector_agent"],
            vec!["planner_agent", "command_agent"],
            vec!["risk_agent", "detector_agent"],
            vec!["detector_agent", "detector_agent", "unknown", "risk_agent"],
            vec!["risk_agent", "planner_agent", "risk_agent"],
        ];
        for agents in candidates {
            let repaired = RoutingGuard::new().repair(plan(Phase::Analysis, &agents), &raw_ctx());
            assert_eq!(
                repaired.agent_names(),
                vec!["detector_agent", "risk_agent"],
                "candidate {:?}",
                agents
            );
            assert_eq!(repaired.phase, Phase::Ingest);
        }
    }

    #[test]
    fn test_raw_events_keeps_model_reasons() {
        let candidate = plan(Phase::Ingest, &["detector_agent", "risk_agent"]);
        let repaired = RoutingGuard::new().repair(candidate.clone(), &raw_ctx());
        assert_eq!(repaired, candidate);
    }

    #[test]
    fn test_incident_critical_forces_command_step() {
        let repaired =
            RoutingGuard::new().repair(plan(Phase::Response, &["planner_agent"]), &incident_ctx("Critical"));
        assert_eq!(repaired.agent_names(), vec!["planner_agent", "command_agent"]);
    }

    #[test]
    fn test_incident_low_leaves_command_absent() {
        let repaired = RoutingGuard::new().repair(plan(Phase::Ingest, &[]), &incident_ctx("low"));
        assert_eq!(repaired.agent_names(), vec!["planner_agent"]);
        assert_eq!(repaired.phase, Phase::Response);
    }

    #[test]
    fn test_incident_low_keeps_requested_command_step() {
        let repaired = RoutingGuard::new().repair(
            plan(Phase::Response, &["command_agent", "detector_agent"]),
            &incident_ctx("medium"),
        );
        assert_eq!(repaired.agent_names(), vec!["planner_agent", "command_agent"]);
    }

    #[test]
    fn test_incident_misordered_plan_is_reordered() {
        let repaired = RoutingGuard::new().repair(
            plan(Phase::Response, &["command_agent", "planner_agent"]),
            &incident_ctx("high"),
        );
        assert_eq!(repaired.agent_names(), vec!["planner_agent", "command_agent"]);
    }

    #[test]
    fn test_incident_unparseable_severity_is_not_escalating() {
        let ctx = RoutingContext::new(ContextKind::Incident, json!({ "severity": 9 }));
        let repaired = RoutingGuard::new().repair(plan(Phase::Response, &[]), &ctx);
        assert_eq!(repaired.agent_names(), vec!["planner_agent"]);

        let ctx = RoutingContext::new(ContextKind::Incident, json!("not an object"));
        let repaired = RoutingGuard::new().repair(plan(Phase::Response, &[]), &ctx);
        assert_eq!(repaired.agent_names(), vec!["planner_agent"]);
    }

    #[test]
    fn test_other_kinds_pass_through() {
        let candidate = plan(
            Phase::Unrecognized("whatever".into()),
            &["triage_agent", "risk_agent"],
        );
        let ctx = RoutingContext::new(ContextKind::Other("alert".into()), json!({}));
        assert_eq!(RoutingGuard::new().repair(candidate.clone(), &ctx), candidate);
    }
}
