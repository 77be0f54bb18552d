//! Connector trait definitions for IdP Warden.
//!
//! An event source hands the pipeline a time-bounded, ordered batch of
//! normalized identity events. Sources never run detection themselves.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use iw_core::IdentityEvent;
use thiserror::Error;

/// Errors that can occur in connectors.
#[derive(Error, Debug, Clone)]
pub enum ConnectorError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Supplier of normalized identity events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Returns every event at or after `since`, ordered by timestamp then id.
    ///
    /// A source with no backing data returns an empty batch rather than an error.
    async fn fetch(&self, since: DateTime<Utc>) -> ConnectorResult<Vec<IdentityEvent>>;
}
