//! # iw-connectors
//!
//! External integrations for IdP Warden: System Log event sources and the
//! OpenAI-compatible reasoning client.

pub mod file_source;
pub mod llm;
pub mod mock;
pub mod secure_string;
pub mod traits;

pub use file_source::JsonFileEventSource;
pub use llm::{LlmConfig, OpenAiReasoner, JSON_ONLY_SUFFIX};
pub use mock::MockEventSource;
pub use secure_string::SecureString;
pub use traits::{ConnectorError, ConnectorResult, EventSource};
