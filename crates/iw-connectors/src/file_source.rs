//! System Log export read from a local JSON file.
//!
//! The file holds a JSON array of flat entries:
//!
//! ```json
//! [{"id": "evt-1", "event_type": "user.session.start", "actor_id": "00u1",
//!   "country": "US", "outcome": "FAILURE", "timestamp": "2025-03-01T09:00:00Z"}]
//! ```
//!
//! Entries missing `id`, `event_type` or a timezone-qualified `timestamp` are
//! skipped with a warning. The untouched entry is kept as the event's raw payload.

use crate::traits::{ConnectorError, ConnectorResult, EventSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use iw_core::{ClientContext, IdentityEvent, Outcome};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// One flat export entry.
#[derive(Debug, Deserialize)]
struct LogEntry {
    id: String,
    event_type: String,
    #[serde(default)]
    actor_id: Option<String>,
    #[serde(default)]
    actor_type: Option<String>,
    #[serde(default)]
    target_id: Option<String>,
    #[serde(default)]
    ip_address: Option<String>,
    #[serde(default)]
    user_agent: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    outcome: Option<String>,
    timestamp: String,
}

/// Event source backed by a JSON array file.
pub struct JsonFileEventSource {
    path: PathBuf,
}

impl JsonFileEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, e: std::io::Error) -> ConnectorError {
        ConnectorError::Io {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}

/// Normalizes one entry, or explains why it was rejected.
fn normalize(raw: Value) -> Result<IdentityEvent, String> {
    let entry: LogEntry = serde_json::from_value(raw.clone()).map_err(|e| e.to_string())?;

    let timestamp = DateTime::parse_from_rfc3339(entry.timestamp.trim())
        .map_err(|e| format!("timestamp '{}': {}", entry.timestamp, e))?
        .with_timezone(&Utc);

    Ok(IdentityEvent {
        id: entry.id,
        event_type: entry.event_type,
        actor_id: entry.actor_id,
        actor_type: entry.actor_type,
        target_id: entry.target_id,
        client: ClientContext {
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            city: entry.city,
            country: entry.country,
            latitude: entry.latitude,
            longitude: entry.longitude,
        },
        outcome: entry.outcome.as_deref().and_then(Outcome::parse),
        timestamp,
        raw,
    })
}

#[async_trait]
impl EventSource for JsonFileEventSource {
    fn name(&self) -> &str {
        "json_file"
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn fetch(&self, since: DateTime<Utc>) -> ConnectorResult<Vec<IdentityEvent>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Event file does not exist, returning empty batch");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let entries: Vec<Value> = serde_json::from_str(&text).map_err(|e| {
            ConnectorError::InvalidResponse(format!("expected a JSON array of events: {}", e))
        })?;

        let mut events = Vec::with_capacity(entries.len());
        for (index, raw) in entries.into_iter().enumerate() {
            match normalize(raw) {
                Ok(event) if event.timestamp < since => {}
                Ok(event) => events.push(event),
                Err(reason) => warn!(index, %reason, "Skipping malformed event entry"),
            }
        }
        events.sort_by(IdentityEvent::chronological);

        debug!(count = events.len(), "Loaded events");
        Ok(events)
    }
}
