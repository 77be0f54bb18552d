//! Promotion policy: which assessed findings become incidents.

use crate::risk::RiskAssessment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default score at or above which a finding is promoted.
pub const DEFAULT_PROMOTION_THRESHOLD: f64 = 0.6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Promotion threshold must be between 0.0 and 1.0, got {0}")]
    InvalidThreshold(f64),
}

/// Outcome of applying the promotion policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromotionDecision {
    /// The score reached the threshold.
    PromoteByScore,
    /// The severity is high or critical.
    PromoteBySeverity,
    Hold,
}

impl PromotionDecision {
    pub fn is_promoted(&self) -> bool {
        !matches!(self, PromotionDecision::Hold)
    }
}

impl std::fmt::Display for PromotionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromotionDecision::PromoteByScore => write!(f, "Promote (score)"),
            PromotionDecision::PromoteBySeverity => write!(f, "Promote (severity)"),
            PromotionDecision::Hold => write!(f, "Hold"),
        }
    }
}

/// Promotes a finding when its score reaches the threshold (inclusive) or its
/// severity is high or critical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromotionPolicy {
    threshold: f64,
}

impl PromotionPolicy {
    pub fn new(threshold: f64) -> Result<Self, PolicyError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PolicyError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn decide(&self, risk: &RiskAssessment) -> PromotionDecision {
        if risk.score >= self.threshold {
            PromotionDecision::PromoteByScore
        } else if risk.severity.is_escalating() {
            PromotionDecision::PromoteBySeverity
        } else {
            PromotionDecision::Hold
        }
    }

    pub fn promote(&self, risk: &RiskAssessment) -> bool {
        self.decide(risk).is_promoted()
    }
}

impl Default for PromotionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_PROMOTION_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::Severity;
    use uuid::Uuid;

    fn risk(score: f64, severity: Severity) -> RiskAssessment {
        RiskAssessment {
            finding_id: Uuid::new_v4(),
            severity,
            likelihood: 0.5,
            impact: 0.5,
            score,
            rationale: String::new(),
        }
    }

    #[test]
    fn test_promotion_table() {
        let policy = PromotionPolicy::default();
        assert!(!policy.promote(&risk(0.59, Severity::Medium)));
        assert!(policy.promote(&risk(0.59, Severity::High)));
        assert!(policy.promote(&risk(0.6, Severity::Low)));
        assert!(policy.promote(&risk(0.1, Severity::Critical)));
    }

    #[test]
    fn test_decision_reason() {
        let policy = PromotionPolicy::default();
        assert_eq!(
            policy.decide(&risk(0.9, Severity::High)),
            PromotionDecision::PromoteByScore
        );
        assert_eq!(
            policy.decide(&risk(0.2, Severity::High)),
            PromotionDecision::PromoteBySeverity
        );
        assert_eq!(policy.decide(&risk(0.2, Severity::Low)), PromotionDecision::Hold);
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(PromotionPolicy::new(0.0).is_ok());
        assert!(PromotionPolicy::new(1.0).is_ok());
        assert_eq!(
            PromotionPolicy::new(1.2),
            Err(PolicyError::InvalidThreshold(1.2))
        );
        assert!(PromotionPolicy::new(f64::NAN).is_err());
    }
}
