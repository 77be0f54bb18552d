use crate::finding::Finding;
use crate::incident::Severity;
use crate::reasoning::{ReasoningCapability, ReasoningError, Reply, DEFAULT_TEMPERATURE};
use crate::risk::RiskAssessment;
use std::sync::Arc;
use tracing::{debug, instrument};

const SYSTEM_PROMPT: &str = "You are a security risk analyst for identity-provider authentication \
events. Given a detection finding, you assign severity, likelihood, impact, and a numeric risk \
score between 0 and 1.";

/// Scores findings through the reasoning capability.
pub struct RiskAssessor {
    reasoner: Arc<dyn ReasoningCapability>,
    temperature: f32,
}

impl RiskAssessor {
    pub fn new(reasoner: Arc<dyn ReasoningCapability>) -> Self {
        Self {
            reasoner,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Produces a validated assessment for one finding.
    #[instrument(skip(self, finding), fields(finding_id = %finding.id, kind = %finding.kind))]
    pub async fn assess(&self, finding: &Finding) -> Result<RiskAssessment, ReasoningError> {
        let finding_json = serde_json::to_string_pretty(finding)
            .map_err(|e| ReasoningError::Malformed(format!("finding serialization: {}", e)))?;
        let user = format!(
            r#"Finding (JSON):
{}

Your job:
1. Decide severity: low, medium, high, or critical.
2. Estimate likelihood and impact (0.0-1.0).
3. Compute an overall risk score (0.0-1.0).
4. Explain your reasoning briefly.

Return ONLY JSON:
{{
  "severity": "low|medium|high|critical",
  "likelihood": 0.0,
  "impact": 0.0,
  "score": 0.0,
  "rationale": "string"
}}"#,
            finding_json
        );

        let reply = self
            .reasoner
            .invoke(SYSTEM_PROMPT, &user, self.temperature)
            .await?;
        let assessment = parse_assessment(finding, &reply)?;
        debug!(
            severity = %assessment.severity,
            score = assessment.score,
            "Finding assessed"
        );
        Ok(assessment)
    }
}

fn parse_assessment(
    finding: &Finding,
    reply: &serde_json::Map<String, serde_json::Value>,
) -> Result<RiskAssessment, ReasoningError> {
    let reply = Reply::new("risk assessment", reply);
    let severity_text = reply.str("severity")?;
    let severity = Severity::parse(severity_text).ok_or_else(|| {
        ReasoningError::Malformed(format!("risk assessment: unknown severity '{}'", severity_text))
    })?;

    Ok(RiskAssessment {
        finding_id: finding.id,
        severity,
        likelihood: reply.unit_f64("likelihood")?,
        impact: reply.unit_f64("impact")?,
        score: reply.unit_f64("score")?,
        rationale: reply.str("rationale")?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::FindingKind;
    use crate::testing::{ScriptedReasoner, RISK_PROMPT};
    use chrono::Utc;
    use serde_json::json;

    fn finding() -> Finding {
        Finding::new(
            FindingKind::FailedLoginBurst,
            "5 failed logins",
            vec!["f0".into()],
            Some("00u1".into()),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_assess_parses_reply() {
        let reasoner = Arc::new(ScriptedReasoner::new().on(
            RISK_PROMPT,
            json!({
                "severity": "HIGH",
                "likelihood": 0.8,
                "impact": 0.7,
                "score": 0.72,
                "rationale": "burst against one account"
            }),
        ));
        let finding = finding();
        let assessment = RiskAssessor::new(reasoner.clone())
            .assess(&finding)
            .await
            .unwrap();

        assert_eq!(assessment.finding_id, finding.id);
        assert_eq!(assessment.severity, Severity::High);
        assert_eq!(assessment.score, 0.72);

        let call = &reasoner.calls()[0];
        assert!((call.temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
        assert!(call.user.contains("failed_login_burst"));
    }

    #[tokio::test]
    async fn test_assess_rejects_incomplete_reply() {
        let reasoner = Arc::new(ScriptedReasoner::new().on(
            RISK_PROMPT,
            json!({"severity": "low", "likelihood": 0.1, "impact": 0.1, "score": 0.1}),
        ));
        let err = RiskAssessor::new(reasoner).assess(&finding()).await.unwrap_err();
        assert!(err.to_string().contains("rationale"));
    }

    #[tokio::test]
    async fn test_assess_rejects_unknown_severity_and_range() {
        let reasoner = Arc::new(
            ScriptedReasoner::new()
                .on(
                    RISK_PROMPT,
                    json!({"severity": "severe", "likelihood": 0.1, "impact": 0.1,
                           "score": 0.1, "rationale": "r"}),
                )
                .on(
                    RISK_PROMPT,
                    json!({"severity": "low", "likelihood": 0.1, "impact": 0.1,
                           "score": 7, "rationale": "r"}),
                ),
        );
        let assessor = RiskAssessor::new(reasoner);
        assert!(matches!(
            assessor.assess(&finding()).await,
            Err(ReasoningError::Malformed(_))
        ));
        let err = assessor.assess(&finding()).await.unwrap_err();
        assert!(err.to_string().contains("score"));
    }
}
