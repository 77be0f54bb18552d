use super::{humanize, partition_by_actor, DetectionConfigError, Detector};
use crate::event::IdentityEvent;
use crate::finding::{Finding, FindingKind};
use chrono::Duration;
use serde_json::json;

/// Reports bursts of failed authentications for a single actor.
///
/// Every start position is examined, so a sustained burst produces overlapping
/// findings: `threshold + 1` failures inside one window yield two.
#[derive(Debug, Clone)]
pub struct FailedLoginBurstDetector {
    threshold: usize,
    window: Duration,
}

impl FailedLoginBurstDetector {
    pub fn new(threshold: usize, window: Duration) -> Result<Self, DetectionConfigError> {
        if threshold < 1 {
            return Err(DetectionConfigError::InvalidThreshold(threshold));
        }
        if window <= Duration::zero() {
            return Err(DetectionConfigError::InvalidWindow(window.num_seconds()));
        }
        Ok(Self { threshold, window })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for FailedLoginBurstDetector {
    fn default() -> Self {
        Self {
            threshold: 5,
            window: Duration::minutes(10),
        }
    }
}

impl Detector for FailedLoginBurstDetector {
    fn name(&self) -> &str {
        "failed_login_burst"
    }

    fn detect(&self, events: &[IdentityEvent]) -> Vec<Finding> {
        let failures = events.iter().filter(|e| e.is_failure());
        let mut findings = Vec::new();

        for (actor, group) in partition_by_actor(failures) {
            for start in 0..group.len() {
                let first = group[start].timestamp;
                // Window bound is inclusive.
                let len = group[start..]
                    .iter()
                    .take_while(|e| e.timestamp - first <= self.window)
                    .count();
                if len < self.threshold {
                    continue;
                }

                let window = &group[start..start + len];
                let last = window[len - 1];
                findings.push(
                    Finding::new(
                        FindingKind::FailedLoginBurst,
                        format!(
                            "{} failed logins for actor {} within {}.",
                            len,
                            actor,
                            humanize(self.window)
                        ),
                        window.iter().map(|e| e.id.clone()).collect(),
                        Some(actor.to_string()),
                        last.timestamp,
                    )
                    .with_metadata("count", json!(len))
                    .with_metadata("window_seconds", json!(self.window.num_seconds())),
                );
            }
        }

        findings
    }
}
