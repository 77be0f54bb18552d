//! # iw-observability
//!
//! Logging and metrics for IdP Warden.
//!
//! Structured logging is built on `tracing-subscriber`; pipeline counters go
//! through the `metrics` facade.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_config, LogFormat, LoggingConfig};
pub use metrics::{PipelineMetrics, PipelineTotals};
