//! Incident data models for IdP Warden.
//!
//! An incident is a finding that the promotion policy escalated. It is created
//! exactly once per promoted finding and persisted immediately.

use crate::finding::Finding;
use crate::risk::RiskAssessment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Severity levels shared by risk assessments and incidents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low severity
    Low,
    /// Medium severity
    Medium,
    /// High severity - requires attention
    High,
    /// Critical - immediate response required
    Critical,
}

impl Severity {
    /// Parses a severity case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Whether this severity forces escalation regardless of score.
    pub fn is_escalating(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// Status of an incident.
///
/// Nothing in the pipeline moves an incident out of `Open`; the other states
/// belong to the analysts working the queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Newly created, not yet looked at
    #[default]
    Open,
    /// An analyst has reviewed it
    Triaged,
    /// Closed
    Closed,
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Open => write!(f, "Open"),
            IncidentStatus::Triaged => write!(f, "Triaged"),
            IncidentStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// Represents a security incident escalated from a finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Incident {
    /// Unique identifier for this incident.
    pub id: Uuid,
    /// The finding this incident was promoted from.
    pub finding_id: Uuid,
    pub title: String,
    pub description: String,
    /// Severity assigned by the risk assessment.
    pub severity: Severity,
    /// Composite risk score (0.0 - 1.0).
    pub risk_score: f64,
    /// Timestamp when the incident was created.
    pub created_at: DateTime<Utc>,
    pub status: IncidentStatus,
    /// Finding metadata plus the finding kind.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Incident {
    /// Creates a new open incident from a promoted finding and its assessment.
    pub fn from_finding(finding: &Finding, risk: &RiskAssessment) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            "finding_type".to_string(),
            serde_json::json!(finding.kind.as_str()),
        );
        metadata.extend(
            finding
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        Self {
            id: Uuid::new_v4(),
            finding_id: finding.id,
            title: format!("Incident from {}", finding.kind),
            description: finding.description.clone(),
            severity: risk.severity,
            risk_score: risk.score,
            created_at: Utc::now(),
            status: IncidentStatus::Open,
            metadata,
        }
    }
}
