//! The external reasoning capability (an LLM) and strict reply parsing.
//!
//! Replies are untrusted. Everything handed back to the pipeline must parse as
//! a single JSON object; anything else fails closed with
//! [`ReasoningError::Malformed`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Default sampling temperature for assessment and planning calls.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Sampling temperature for routing calls.
pub const ROUTING_TEMPERATURE: f32 = 0.01;

/// Errors from invoking the reasoning capability.
#[derive(Error, Debug)]
pub enum ReasoningError {
    /// The reply could not be turned into the expected structure.
    #[error("Malformed reasoning output: {0}")]
    Malformed(String),

    /// The capability could not be reached or returned an error status.
    #[error("Reasoning transport error: {0}")]
    Transport(String),
}

/// A source of structured judgments.
#[async_trait]
pub trait ReasoningCapability: Send + Sync {
    /// Sends a system and user instruction and returns one parsed JSON object.
    async fn invoke(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<Map<String, Value>, ReasoningError>;

    /// Name of the underlying model, for logs.
    fn model(&self) -> &str {
        "unknown"
    }
}

/// Extracts a JSON object from raw reply text.
///
/// The trimmed text must be a JSON object, optionally wrapped in exactly one
/// Markdown code fence (with or without a `json` tag). Surrounding prose is not
/// tolerated.
pub fn extract_json_object(content: &str) -> Result<Map<String, Value>, ReasoningError> {
    let body = strip_code_fence(content.trim());
    if body.is_empty() {
        return Err(ReasoningError::Malformed("empty reply".to_string()));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ReasoningError::Malformed(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(ReasoningError::Malformed(format!("invalid JSON: {}", e))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with('{') => body.trim(),
        _ => inner.trim(),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed field accessors over a reply object.
pub(crate) struct Reply<'a> {
    what: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> Reply<'a> {
    pub(crate) fn new(what: &'static str, map: &'a Map<String, Value>) -> Self {
        Self { what, map }
    }

    fn missing(&self, field: &str) -> ReasoningError {
        ReasoningError::Malformed(format!("{}: missing field '{}'", self.what, field))
    }

    fn wrong_type(&self, field: &str, expected: &str, got: &Value) -> ReasoningError {
        ReasoningError::Malformed(format!(
            "{}: field '{}' must be {}, got {}",
            self.what,
            field,
            expected,
            json_type_name(got)
        ))
    }

    pub(crate) fn str(&self, field: &str) -> Result<&'a str, ReasoningError> {
        match self.map.get(field) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(self.wrong_type(field, "a string", other)),
            None => Err(self.missing(field)),
        }
    }

    /// Optional string; `null` counts as absent.
    pub(crate) fn opt_str(&self, field: &str) -> Result<Option<&'a str>, ReasoningError> {
        match self.map.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.wrong_type(field, "a string or null", other)),
        }
    }

    /// A probability in `[0, 1]`. Numeric strings are accepted.
    pub(crate) fn unit_f64(&self, field: &str) -> Result<f64, ReasoningError> {
        let value = match self.map.get(field) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(other) => return Err(self.wrong_type(field, "a number", other)),
            None => return Err(self.missing(field)),
        };
        match value {
            Some(v) if (0.0..=1.0).contains(&v) => Ok(v),
            Some(v) => Err(ReasoningError::Malformed(format!(
                "{}: field '{}' must be between 0.0 and 1.0, got {}",
                self.what, field, v
            ))),
            None => Err(ReasoningError::Malformed(format!(
                "{}: field '{}' is not a number",
                self.what, field
            ))),
        }
    }

    pub(crate) fn opt_bool(&self, field: &str) -> Result<Option<bool>, ReasoningError> {
        match self.map.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.wrong_type(field, "a boolean", other)),
        }
    }

    pub(crate) fn array(&self, field: &str) -> Result<&'a Vec<Value>, ReasoningError> {
        match self.map.get(field) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(self.wrong_type(field, "an array", other)),
            None => Err(self.missing(field)),
        }
    }

    /// Optional array of strings; `null` counts as empty.
    pub(crate) fn str_list(&self, field: &str) -> Result<Vec<String>, ReasoningError> {
        match self.map.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(self.wrong_type(field, "an array of strings", other)),
                })
                .collect(),
            Some(other) => Err(self.wrong_type(field, "an array", other)),
        }
    }
}
