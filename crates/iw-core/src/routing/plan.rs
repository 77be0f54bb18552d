//! Route plans and the contexts they are requested for.

use crate::event::IdentityEvent;
use crate::incident::Incident;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::RoutingError;

/// Pipeline phase a route plan belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    Ingest,
    Analysis,
    Response,
    /// A phase name the pipeline does not know; kept for pass-through contexts.
    Unrecognized(String),
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Phase::Ingest => "ingest",
            Phase::Analysis => "analysis",
            Phase::Response => "response",
            Phase::Unrecognized(other) => other,
        }
    }
}

impl From<String> for Phase {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ingest" => Phase::Ingest,
            "analysis" => Phase::Analysis,
            "response" => Phase::Response,
            _ => Phase::Unrecognized(value),
        }
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        phase.as_str().to_string()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One agent invocation in a route plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Wire name of the agent; may be unknown until dispatch.
    pub agent_name: String,
    pub reason: String,
    /// Free-form timing hint such as `now` or `after_detector_agent`.
    pub when: String,
}

impl RouteStep {
    pub fn new(
        agent_name: impl Into<String>,
        reason: impl Into<String>,
        when: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            reason: reason.into(),
            when: when.into(),
        }
    }
}

/// Ordered agent invocations for one context. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub phase: Phase,
    pub steps: Vec<RouteStep>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RoutePlan {
    pub fn new(phase: Phase, steps: Vec<RouteStep>) -> Self {
        Self {
            phase,
            steps,
            notes: None,
        }
    }

    /// Parses a reasoning reply into a route plan.
    pub fn from_reply(reply: Map<String, Value>) -> Result<Self, RoutingError> {
        serde_json::from_value(Value::Object(reply))
            .map_err(|e| RoutingError::InvalidPlan(e.to_string()))
    }

    /// Agent names in step order.
    pub fn agent_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.agent_name.as_str()).collect()
    }

    pub fn contains(&self, agent_name: &str) -> bool {
        self.steps.iter().any(|s| s.agent_name == agent_name)
    }
}

/// What a routing request is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContextKind {
    RawEvents,
    Incident,
    Other(String),
}

impl ContextKind {
    pub fn as_str(&self) -> &str {
        match self {
            ContextKind::RawEvents => "raw_events",
            ContextKind::Incident => "incident",
            ContextKind::Other(other) => other,
        }
    }
}

impl From<String> for ContextKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "raw_events" => ContextKind::RawEvents,
            "incident" => ContextKind::Incident,
            _ => ContextKind::Other(value),
        }
    }
}

impl From<ContextKind> for String {
    fn from(kind: ContextKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subject of a routing decision: a kind tag plus a JSON snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingContext {
    pub kind: ContextKind,
    pub data: Value,
}

impl RoutingContext {
    pub fn new(kind: ContextKind, data: Value) -> Self {
        Self { kind, data }
    }

    /// Context for a batch of raw events.
    pub fn raw_events(events: &[IdentityEvent]) -> Self {
        Self::snapshot(ContextKind::RawEvents, events)
    }

    /// Context for a single incident.
    pub fn incident(incident: &Incident) -> Self {
        Self::snapshot(ContextKind::Incident, incident)
    }

    /// Serializes `value` as the payload; a value that cannot be serialized becomes `null`.
    fn snapshot<T: Serialize + ?Sized>(kind: ContextKind, value: &T) -> Self {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(context = %kind, error = %e, "Routing context snapshot failed to serialize");
                Value::Null
            }
        };
        Self::new(kind, data)
    }

    /// Severity field of the payload, lowercased; absent when missing or not a string.
    pub fn severity(&self) -> Option<String> {
        self.data
            .get("severity")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_from_reply() {
        let reply = json!({
            "phase": "Analysis",
            "steps": [{"agent_name": "risk_agent", "reason": "score", "when": "now"}],
            "notes": null
        });
        let plan = RoutePlan::from_reply(reply.as_object().unwrap().clone()).unwrap();
        assert_eq!(plan.phase, Phase::Analysis);
        assert_eq!(plan.agent_names(), vec!["risk_agent"]);
    }

    #[test]
    fn test_plan_from_reply_keeps_unknown_phase() {
        let reply = json!({"phase": "containment", "steps": []});
        let plan = RoutePlan::from_reply(reply.as_object().unwrap().clone()).unwrap();
        assert_eq!(plan.phase, Phase::Unrecognized("containment".into()));
        assert!(plan.notes.is_none());
    }

    #[test]
    fn test_plan_from_reply_rejects_broken_structure() {
        let missing_steps = json!({"phase": "ingest"});
        assert!(RoutePlan::from_reply(missing_steps.as_object().unwrap().clone()).is_err());

        let bad_step = json!({"phase": "ingest", "steps": [{"agent_name": "detector_agent"}]});
        let err = RoutePlan::from_reply(bad_step.as_object().unwrap().clone()).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidPlan(_)));
    }

    #[test]
    fn test_context_severity() {
        let ctx = RoutingContext::new(ContextKind::Incident, json!({"severity": "CRITICAL"}));
        assert_eq!(ctx.severity().as_deref(), Some("critical"));

        let ctx = RoutingContext::new(ContextKind::Incident, json!({"severity": 3}));
        assert_eq!(ctx.severity(), None);
    }

    #[test]
    fn test_snapshot_of_events_is_an_array() {
        let ctx = RoutingContext::raw_events(&crate::testing::failure_burst("00u1", 2));
        assert_eq!(ctx.kind, ContextKind::RawEvents);
        assert_eq!(ctx.data.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_unserializable_snapshot_becomes_null() {
        // JSON objects need string keys.
        let mut value = std::collections::BTreeMap::new();
        value.insert((1u8, 2u8), 3u8);
        let ctx = RoutingContext::snapshot(ContextKind::Other("custom".into()), &value);
        assert_eq!(ctx.data, Value::Null);
        assert_eq!(ctx.kind.as_str(), "custom");
    }

    #[test]
    fn test_context_kind_wire_names() {
        assert_eq!(json!(ContextKind::RawEvents), json!("raw_events"));
        assert_eq!(
            ContextKind::from("alert".to_string()),
            ContextKind::Other("alert".into())
        );
    }
}
