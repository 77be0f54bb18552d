//! Command template registry for IdP Warden.
//!
//! This module provides the command template trait and the registry that maps
//! canonical response-step ids to templates. Templates only render text; nothing
//! in this crate ever sends a request.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Target-system tag for identity-provider API commands.
pub const OKTA_API_SYSTEM: &str = "okta_api";

/// Redacted authorization header value used in every rendered command.
pub const REDACTED_AUTH: &str = "SSWS <REDACTED_TOKEN>";

/// Note attached to commands that only need identifiers and a token filled in.
pub const SUBSTITUTE_NOTE: &str = "Replace {userId} and token before running.";

/// A read-only command template for one canonical response step.
pub trait CommandTemplate: Send + Sync {
    /// Canonical step id this template implements.
    fn step_id(&self) -> &str;

    /// Human-readable description of what the command does.
    fn description(&self) -> &str;

    /// Renders the command against the identity-provider base URL.
    ///
    /// `base_url` has no trailing slash.
    fn render(&self, base_url: &str) -> String;

    /// Guidance for the analyst running the command.
    fn notes(&self) -> &str {
        SUBSTITUTE_NOTE
    }

    /// Target-system tag.
    fn system(&self) -> &str {
        OKTA_API_SYSTEM
    }
}

/// Registry of command templates keyed by step id.
pub struct CommandRegistry {
    templates: HashMap<String, Arc<dyn CommandTemplate>>,
}

impl CommandRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in identity-provider templates.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::LockAccountTemplate::new()));
        registry.register(Arc::new(crate::ForcePasswordResetTemplate::new()));
        registry.register(Arc::new(crate::RevokeSessionsTemplate::new()));
        registry.register(Arc::new(crate::EnableMfaTemplate::new()));
        registry
    }

    /// Registers a template, replacing any previous one for the same step.
    pub fn register(&mut self, template: Arc<dyn CommandTemplate>) {
        let step_id = template.step_id().to_string();
        debug!("Registering command template: {}", step_id);
        self.templates.insert(step_id, template);
    }

    /// Gets a template by step id.
    pub fn get(&self, step_id: &str) -> Option<Arc<dyn CommandTemplate>> {
        self.templates.get(step_id).cloned()
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.templates.contains_key(step_id)
    }

    /// Lists registered step ids, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Builds a single-line `curl` invocation.
#[derive(Debug, Clone)]
pub(crate) struct Curl {
    method: &'static str,
    url: String,
    headers: Vec<String>,
    body: Option<String>,
}

impl Curl {
    pub(crate) fn new(method: &'static str, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: vec![
                format!("Authorization: {}", REDACTED_AUTH),
                "Accept: application/json".to_string(),
            ],
            body: None,
        }
    }

    /// Adds a JSON body and the matching content type.
    pub(crate) fn json(mut self, body: &str) -> Self {
        self.headers
            .push("Content-Type: application/json".to_string());
        self.body = Some(body.to_string());
        self
    }

    /// Declares a JSON content type without a body.
    pub(crate) fn json_content(mut self) -> Self {
        self.headers
            .push("Content-Type: application/json".to_string());
        self
    }

    pub(crate) fn render(&self) -> String {
        let mut parts = vec![format!("curl -X {} {}", self.method, self.url)];
        parts.extend(self.headers.iter().map(|h| format!("-H '{}'", h)));
        if let Some(body) = &self.body {
            parts.push(format!("-d '{}'", body));
        }
        parts.join(" ")
    }
}
