//! Detection findings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Kinds of pattern the detection engine reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    ImpossibleTravel,
    FailedLoginBurst,
    Other,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::ImpossibleTravel => "impossible_travel",
            FindingKind::FailedLoginBurst => "failed_login_burst",
            FindingKind::Other => "other",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An anomalous pattern detected over one or more events.
///
/// Findings are only built by detectors and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub id: Uuid,
    pub kind: FindingKind,
    pub description: String,
    /// Contributing event ids in chronological order. Never empty.
    pub event_ids: Vec<String>,
    /// The actor the pattern was observed for.
    pub actor_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Finding {
    /// Creates a finding with a fresh id.
    ///
    /// Panics in debug builds if `event_ids` is empty; detectors always pass at least one.
    pub fn new(
        kind: FindingKind,
        description: impl Into<String>,
        event_ids: Vec<String>,
        actor_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        debug_assert!(!event_ids.is_empty(), "a finding needs contributing events");
        Self {
            id: Uuid::new_v4(),
            kind,
            description: description.into(),
            event_ids,
            actor_id,
            created_at,
            metadata: BTreeMap::new(),
        }
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}
