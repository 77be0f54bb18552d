//! Risk assessments for findings.
//!
//! An assessment is produced once per finding by the risk assessor agent and
//! consumed immediately by the promotion policy. It is never persisted on its own;
//! the resulting incident carries its severity and score.

use crate::incident::Severity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity, likelihood, impact and composite score for one finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    /// The finding this assessment applies to.
    pub finding_id: Uuid,
    pub severity: Severity,
    /// Likelihood the pattern is malicious (0.0 - 1.0).
    pub likelihood: f64,
    /// Impact if it is (0.0 - 1.0).
    pub impact: f64,
    /// Composite score (0.0 - 1.0).
    pub score: f64,
    pub rationale: String,
}

impl RiskAssessment {
    /// Checks that every probability-like field lies in `[0, 1]`.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("likelihood", self.likelihood),
            ("impact", self.impact),
            ("score", self.score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 1.0, got {}", name, value));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(score: f64) -> RiskAssessment {
        RiskAssessment {
            finding_id: Uuid::new_v4(),
            severity: Severity::Medium,
            likelihood: 0.5,
            impact: 0.5,
            score,
            rationale: String::new(),
        }
    }

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(assessment(0.0).validate().is_ok());
        assert!(assessment(1.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let err = assessment(1.5).validate().unwrap_err();
        assert!(err.contains("score"));
        assert!(assessment(f64::NAN).validate().is_err());
    }
}
