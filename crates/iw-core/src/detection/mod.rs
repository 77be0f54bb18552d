//! Deterministic pattern detection over identity events.
//!
//! Detectors are pure: they make no external calls and hold no state between
//! invocations. The same set of events, in any order, always yields the same
//! findings (up to finding ids).

mod failed_login_burst;
mod impossible_travel;

pub use failed_login_burst::FailedLoginBurstDetector;
pub use impossible_travel::ImpossibleTravelDetector;

use crate::event::IdentityEvent;
use crate::finding::Finding;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Invalid detector configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionConfigError {
    #[error("Burst threshold must be at least 1, got {0}")]
    InvalidThreshold(usize),

    #[error("Burst window must be positive, got {0} seconds")]
    InvalidWindow(i64),
}

/// A single detection rule.
pub trait Detector: Send + Sync {
    /// Stable name of the detector, used in logs.
    fn name(&self) -> &str;

    /// Maps a batch of events to findings.
    fn detect(&self, events: &[IdentityEvent]) -> Vec<Finding>;
}

fn default_burst_threshold() -> usize {
    5
}

fn default_burst_window_secs() -> i64 {
    600
}

/// Tunables for the built-in detectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionConfig {
    /// Failures needed inside the window to report a burst.
    #[serde(default = "default_burst_threshold")]
    pub burst_threshold: usize,
    /// Burst window length in seconds.
    #[serde(default = "default_burst_window_secs")]
    pub burst_window_secs: i64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            burst_threshold: default_burst_threshold(),
            burst_window_secs: default_burst_window_secs(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), DetectionConfigError> {
        if self.burst_threshold < 1 {
            return Err(DetectionConfigError::InvalidThreshold(self.burst_threshold));
        }
        if self.burst_window_secs <= 0 {
            return Err(DetectionConfigError::InvalidWindow(self.burst_window_secs));
        }
        Ok(())
    }
}

/// Runs every registered detector over a batch of events.
pub struct DetectionEngine {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectionEngine {
    /// Creates an engine with no detectors.
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Creates an engine with the built-in detectors and default tunables.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_detector(ImpossibleTravelDetector::new())
            .with_detector(FailedLoginBurstDetector::default())
    }

    /// Creates an engine with the built-in detectors tuned by `config`.
    pub fn from_config(config: &DetectionConfig) -> Result<Self, DetectionConfigError> {
        config.validate()?;
        let burst = FailedLoginBurstDetector::new(
            config.burst_threshold,
            Duration::seconds(config.burst_window_secs),
        )?;
        Ok(Self::new()
            .with_detector(ImpossibleTravelDetector::new())
            .with_detector(burst))
    }

    pub fn with_detector(mut self, detector: impl Detector + 'static) -> Self {
        self.detectors.push(Box::new(detector));
        self
    }

    /// Names of the registered detectors, in run order.
    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Runs each detector in registration order and concatenates their findings.
    pub fn detect(&self, events: &[IdentityEvent]) -> Vec<Finding> {
        let mut findings = Vec::new();
        for detector in &self.detectors {
            let found = detector.detect(events);
            debug!(
                detector = detector.name(),
                count = found.len(),
                "Detector finished"
            );
            findings.extend(found);
        }
        findings
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Groups events by actor, dropping events without one, and sorts each group.
///
/// A `BTreeMap` keeps actor iteration order independent of input order.
pub(crate) fn partition_by_actor<'a>(
    events: impl IntoIterator<Item = &'a IdentityEvent>,
) -> BTreeMap<&'a str, Vec<&'a IdentityEvent>> {
    let mut by_actor: BTreeMap<&str, Vec<&IdentityEvent>> = BTreeMap::new();
    for event in events {
        if let Some(actor) = event.actor() {
            by_actor.entry(actor).or_default().push(event);
        }
    }
    for group in by_actor.values_mut() {
        group.sort_by(|a, b| IdentityEvent::chronological(a, b));
    }
    by_actor
}

/// Renders a duration as `1h 2m 3s`, omitting leading zero units.
pub(crate) fn humanize(delta: Duration) -> String {
    let total = delta.num_seconds();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    match (hours, minutes) {
        (0, 0) => format!("{}s", seconds),
        (0, _) => format!("{}m {}s", minutes, seconds),
        _ => format!("{}h {}m {}s", hours, minutes, seconds),
    }
}
