//! Normalized identity-provider events.
//!
//! Events are the only input of the detection engine. They are immutable once
//! built; the raw provider payload is carried along untouched for reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Parses a provider outcome string (`SUCCESS`, `failure`, ...).
    ///
    /// Anything other than success or failure (e.g. `SKIPPED`, `UNKNOWN`) maps to `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Some(Outcome::Success),
            "FAILURE" => Some(Outcome::Failure),
            _ => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "SUCCESS"),
            Outcome::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Network and geolocation attributes of the client that produced an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientContext {
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl ClientContext {
    /// Returns the country, treating blank values as absent.
    pub fn country(&self) -> Option<&str> {
        self.country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Returns `(latitude, longitude)` when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// A single normalized System Log record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityEvent {
    /// Provider-assigned event id.
    pub id: String,
    /// Provider event type (e.g. `user.session.start`).
    pub event_type: String,
    /// The acting principal.
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub actor_type: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(flatten)]
    pub client: ClientContext,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    /// Always timezone-aware; normalized to UTC at ingestion.
    pub timestamp: DateTime<Utc>,
    /// Untouched provider payload.
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl IdentityEvent {
    /// Creates an event with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            actor_id: None,
            actor_type: None,
            target_id: None,
            client: ClientContext::default(),
            outcome: None,
            timestamp,
            raw: serde_json::Value::Null,
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.client.country = Some(country.into());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.client.latitude = Some(latitude);
        self.client.longitude = Some(longitude);
        self
    }

    /// Returns the actor id, treating blank ids as absent.
    pub fn actor(&self) -> Option<&str> {
        self.actor_id.as_deref().filter(|a| !a.trim().is_empty())
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == Some(Outcome::Failure)
    }

    /// Ordering used everywhere events are sorted: timestamp, then id.
    pub fn chronological(a: &IdentityEvent, b: &IdentityEvent) -> Ordering {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_outcome_parse() {
        assert_eq!(Outcome::parse("SUCCESS"), Some(Outcome::Success));
        assert_eq!(Outcome::parse(" failure "), Some(Outcome::Failure));
        assert_eq!(Outcome::parse("SKIPPED"), None);
    }

    #[test]
    fn test_blank_country_is_absent() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let event = IdentityEvent::new("e1", "user.session.start", ts).with_country("  ");
        assert_eq!(event.client.country(), None);
    }

    #[test]
    fn test_flattened_client_fields() {
        let json = serde_json::json!({
            "id": "evt-1",
            "event_type": "user.session.start",
            "actor_id": "00u1",
            "country": "US",
            "outcome": "FAILURE",
            "timestamp": "2025-01-01T10:00:00+02:00"
        });
        let event: IdentityEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.client.country(), Some("US"));
        assert!(event.is_failure());
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_chronological_breaks_ties_by_id() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let a = IdentityEvent::new("a", "t", ts);
        let b = IdentityEvent::new("b", "t", ts);
        assert_eq!(IdentityEvent::chronological(&a, &b), Ordering::Less);
    }
}
