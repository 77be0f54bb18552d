//! Test doubles for the pipeline.
//!
//! Provides a scripted reasoning capability and event builders so the
//! orchestrator can be driven end to end without a model or a data source.

use crate::event::{IdentityEvent, Outcome};
use crate::reasoning::{extract_json_object, ReasoningCapability, ReasoningError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Marker found in the routing system prompt.
pub const ROUTER_PROMPT: &str = "orchestration router";
/// Marker found in the risk assessment system prompt.
pub const RISK_PROMPT: &str = "security risk analyst";
/// Marker found in the response planning system prompt.
pub const PLANNER_PROMPT: &str = "incident response planner";

/// One recorded call to a [`ScriptedReasoner`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
enum ScriptedReply {
    Text(String),
    Fail(String),
}

#[derive(Debug)]
struct Script {
    marker: String,
    replies: VecDeque<ScriptedReply>,
    last: Option<ScriptedReply>,
}

impl Script {
    /// Pops the next reply, repeating the final one once the queue is drained.
    fn next(&mut self) -> Option<ScriptedReply> {
        match self.replies.pop_front() {
            Some(reply) => {
                self.last = Some(reply.clone());
                Some(reply)
            }
            None => self.last.clone(),
        }
    }
}

/// A reasoning capability that answers from canned replies.
///
/// Replies are keyed by a substring of the system prompt and served in FIFO
/// order; the last reply for a key repeats once its queue is empty. A call that
/// matches no key fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedReasoner {
    scripts: Mutex<Vec<Script>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a JSON reply for prompts containing `marker`.
    pub fn on(self, marker: &str, reply: Value) -> Self {
        self.push(marker, ScriptedReply::Text(reply.to_string()))
    }

    /// Queues a raw text reply for prompts containing `marker`.
    pub fn on_text(self, marker: &str, text: &str) -> Self {
        self.push(marker, ScriptedReply::Text(text.to_string()))
    }

    /// Queues a transport failure for prompts containing `marker`.
    pub fn on_failure(self, marker: &str, message: &str) -> Self {
        self.push(marker, ScriptedReply::Fail(message.to_string()))
    }

    fn push(self, marker: &str, reply: ScriptedReply) -> Self {
        {
            let mut scripts = lock(&self.scripts);
            match scripts.iter_mut().find(|s| s.marker == marker) {
                Some(script) => script.replies.push_back(reply),
                None => scripts.push(Script {
                    marker: marker.to_string(),
                    replies: VecDeque::from([reply]),
                    last: None,
                }),
            }
        }
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls whose system prompt contains `marker`.
    pub fn call_count(&self, marker: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.system.contains(marker))
            .count()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl ReasoningCapability for ScriptedReasoner {
    async fn invoke(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<Map<String, Value>, ReasoningError> {
        lock(&self.calls).push(RecordedCall {
            system: system.to_string(),
            user: user.to_string(),
            temperature,
        });

        let reply = lock(&self.scripts)
            .iter_mut()
            .find(|s| system.contains(&s.marker))
            .and_then(Script::next);

        match reply {
            Some(ScriptedReply::Text(text)) => extract_json_object(&text),
            Some(ScriptedReply::Fail(message)) => Err(ReasoningError::Transport(message)),
            None => Err(ReasoningError::Transport(
                "no scripted reply for prompt".to_string(),
            )),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Fixed reference instant for test events.
pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

/// A failed sign-in for `actor` at `base_time() + minute`.
pub fn failed_login(id: &str, actor: &str, minute: i64) -> IdentityEvent {
    IdentityEvent::new(id, "user.session.start", base_time() + Duration::minutes(minute))
        .with_actor(actor)
        .with_outcome(Outcome::Failure)
}

/// A successful sign-in for `actor` from `country` at `base_time() + minute`.
pub fn login_from(id: &str, actor: &str, minute: i64, country: &str) -> IdentityEvent {
    IdentityEvent::new(id, "user.session.start", base_time() + Duration::minutes(minute))
        .with_actor(actor)
        .with_outcome(Outcome::Success)
        .with_country(country)
}

/// `count` failed sign-ins one minute apart, ids `f0`, `f1`, ...
pub fn failure_burst(actor: &str, count: i64) -> Vec<IdentityEvent> {
    (0..count)
        .map(|i| failed_login(&format!("f{}", i), actor, i))
        .collect()
}
