//! In-memory event source for tests and dry runs.

use crate::traits::{ConnectorResult, EventSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use iw_core::IdentityEvent;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Event source serving a fixed set of events.
#[derive(Clone, Default)]
pub struct MockEventSource {
    events: Arc<RwLock<Vec<IdentityEvent>>>,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<IdentityEvent>) -> Self {
        Self {
            events: Arc::new(RwLock::new(events)),
        }
    }

    pub async fn push(&self, event: IdentityEvent) {
        self.events.write().await.push(event);
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, since: DateTime<Utc>) -> ConnectorResult<Vec<IdentityEvent>> {
        let mut events: Vec<IdentityEvent> = self
            .events
            .read()
            .await
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect();
        events.sort_by(IdentityEvent::chronological);
        Ok(events)
    }
}
