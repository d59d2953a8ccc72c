use crate::error::{Result, TriageError};
use crate::taxonomy::{Category, Severity};
use serde::{Deserialize, Serialize};

fn default_environment() -> String {
    "production".into()
}

fn default_source() -> String {
    "manual".into()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageRequest {
    pub alert_text: String,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_source")]
    pub source: String,
}

impl TriageRequest {
    pub fn new(alert_text: impl Into<String>) -> Self {
        Self {
            alert_text: alert_text.into(),
            service_name: None,
            environment: default_environment(),
            source: default_source(),
        }
    }

    pub fn with_service(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.alert_text.trim().is_empty() {
            return Err(TriageError::invalid_input("alert_text cannot be empty"));
        }
        Ok(())
    }

    /// Service name with blank values treated as absent.
    pub fn service(&self) -> Option<&str> {
        self.service_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn environment(&self) -> &str {
        let env = self.environment.trim();
        if env.is_empty() {
            "production"
        } else {
            env
        }
    }
}

/// Stage 1 output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub severity: Severity,
    pub category: Category,
    pub confidence: f64,
    pub summary: String,
    pub root_cause_hypothesis: String,
    pub estimated_impact: String,
    pub escalation_team: String,
    pub escalation_reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunbookStep {
    pub step_number: u32,
    pub action: String,
    pub command: Option<String>,
    pub expected_outcome: Option<String>,
}

/// Assigns 1-based contiguous step numbers in the current order.
pub fn renumber(steps: &mut [RunbookStep]) {
    for (idx, step) in steps.iter_mut().enumerate() {
        step.step_number = idx as u32 + 1;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub severity: Severity,
    pub category: Category,
    pub confidence: f64,
    pub summary: String,
    pub root_cause_hypothesis: String,
    pub runbook_steps: Vec<RunbookStep>,
    pub escalation_team: String,
    pub escalation_reason: String,
    pub estimated_impact: String,
    pub raw_alert: String,
    pub model_used: String,
}

impl TriageResult {
    pub fn assemble(
        classification: Classification,
        runbook_steps: Vec<RunbookStep>,
        raw_alert: String,
        model_used: String,
    ) -> Self {
        Self {
            severity: classification.severity,
            category: classification.category,
            confidence: classification.confidence,
            summary: classification.summary,
            root_cause_hypothesis: classification.root_cause_hypothesis,
            runbook_steps,
            escalation_team: classification.escalation_team,
            escalation_reason: classification.escalation_reason,
            estimated_impact: classification.estimated_impact,
            raw_alert,
            model_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_apply_on_deserialize() {
        let req: TriageRequest =
            serde_json::from_str(r#"{"alert_text":"disk full"}"#).expect("parse");
        assert_eq!(req.environment, "production");
        assert_eq!(req.source, "manual");
        assert_eq!(req.service_name, None);
    }

    #[test]
    fn whitespace_alert_is_rejected() {
        let err = TriageRequest::new(" \n\t ").validate().unwrap_err();
        assert!(matches!(err, TriageError::InvalidInput(_)));
        assert!(TriageRequest::new("cpu high").validate().is_ok());
    }

    #[test]
    fn blank_service_is_absent() {
        let req = TriageRequest::new("x").with_service("  ");
        assert_eq!(req.service(), None);
        let req = TriageRequest::new("x").with_service("checkout-api");
        assert_eq!(req.service(), Some("checkout-api"));
    }

    #[test]
    fn renumber_closes_gaps() {
        let mut steps = vec![
            RunbookStep {
                step_number: 4,
                action: "a".into(),
                command: None,
                expected_outcome: None,
            },
            RunbookStep {
                step_number: 4,
                action: "b".into(),
                command: None,
                expected_outcome: None,
            },
            RunbookStep {
                step_number: 9,
                action: "c".into(),
                command: None,
                expected_outcome: None,
            },
        ];
        renumber(&mut steps);
        let numbers: Vec<u32> = steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(steps[1].action, "b");
    }
}
