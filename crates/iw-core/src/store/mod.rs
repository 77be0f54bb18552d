//! Append-only record logs for pipeline output.
//!
//! Every pipeline record (findings, incidents, plans, commands) is appended to
//! its own ordered log as soon as it exists. Reading a log back parses each
//! record on its own, so one corrupt record never hides the others.

mod jsonl;
mod memory;

pub use jsonl::JsonlLog;
pub use memory::MemoryLog;

use crate::finding::Finding;
use crate::incident::Incident;
use crate::plan::{CommandRecord, ResponsePlan};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub const FINDINGS_FILE: &str = "findings.jsonl";
pub const INCIDENTS_FILE: &str = "incidents.jsonl";
pub const PLANS_FILE: &str = "plans.jsonl";
pub const COMMANDS_FILE: &str = "commands.jsonl";

/// Errors from record logs.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A single stored record could not be parsed.
    #[error("Malformed record at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// An ordered, append-only log of records of one type.
#[async_trait]
pub trait RecordLog<T: Send + Sync>: Send + Sync {
    /// Appends one record. Concurrent appends never interleave.
    async fn append(&self, record: &T) -> Result<(), StoreError>;

    /// Reads every record in append order, parsing each independently.
    ///
    /// The outer error is reserved for failures reading the log as a whole.
    async fn read_all(&self) -> Result<Vec<Result<T, StoreError>>, StoreError>;
}

/// The four logs the pipeline writes to.
#[derive(Clone)]
pub struct PipelineStore {
    pub findings: Arc<dyn RecordLog<Finding>>,
    pub incidents: Arc<dyn RecordLog<Incident>>,
    pub plans: Arc<dyn RecordLog<ResponsePlan>>,
    pub commands: Arc<dyn RecordLog<CommandRecord>>,
}

impl PipelineStore {
    /// JSON-lines logs under `data_dir`, created on first append.
    pub fn jsonl(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            findings: Arc::new(JsonlLog::new(dir.join(FINDINGS_FILE))),
            incidents: Arc::new(JsonlLog::new(dir.join(INCIDENTS_FILE))),
            plans: Arc::new(JsonlLog::new(dir.join(PLANS_FILE))),
            commands: Arc::new(JsonlLog::new(dir.join(COMMANDS_FILE))),
        }
    }

    /// Volatile in-memory logs.
    pub fn in_memory() -> Self {
        Self {
            findings: Arc::new(MemoryLog::new()),
            incidents: Arc::new(MemoryLog::new()),
            plans: Arc::new(MemoryLog::new()),
            commands: Arc::new(MemoryLog::new()),
        }
    }
}

/// Keeps the successfully parsed records of a read-back, dropping failures.
pub fn valid_records<T>(records: Vec<Result<T, StoreError>>) -> Vec<T> {
    records.into_iter().filter_map(Result::ok).collect()
}
