use crate::classifier::{Classifier, LlmClassifier, RuleClassifier};
use crate::error::Result;
use crate::llm::{CompletionBackend, LlmConfig, RigBackend};
use crate::mode::Mode;
use crate::models::{TriageRequest, TriageResult};
use crate::runbooks::{LlmRunbookGenerator, RunbookGenerator, TemplateRunbookGenerator};
use std::sync::Arc;

pub const DEMO_MODEL: &str = "demo-mode";

/// Classify, then generate a runbook from that classification, then assemble.
/// Holds no per-request state; share it behind an `Arc`.
pub struct TriagePipeline {
    classifier: Box<dyn Classifier>,
    runbooks: Box<dyn RunbookGenerator>,
    model_used: String,
}

impl TriagePipeline {
    pub fn new(
        classifier: Box<dyn Classifier>,
        runbooks: Box<dyn RunbookGenerator>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            runbooks,
            model_used: model_used.into(),
        }
    }

    pub fn demo() -> Self {
        Self::new(
            Box::new(RuleClassifier),
            Box::new(TemplateRunbookGenerator),
            DEMO_MODEL,
        )
    }

    /// Both stages share one backend; `model_used` reports `model`.
    pub fn with_backend(backend: Arc<dyn CompletionBackend>, model: impl Into<String>) -> Self {
        Self::new(
            Box::new(LlmClassifier::new(backend.clone())),
            Box::new(LlmRunbookGenerator::new(backend)),
            model,
        )
    }

    pub fn live(config: LlmConfig) -> Self {
        let model = config.model.clone();
        Self::with_backend(Arc::new(RigBackend::new(config)), model)
    }

    pub fn for_mode(mode: Mode, config: LlmConfig) -> Self {
        match mode {
            Mode::Live => Self::live(config),
            Mode::Demo => Self::demo(),
        }
    }

    pub fn model_used(&self) -> &str {
        &self.model_used
    }

    pub async fn run(&self, request: &TriageRequest) -> Result<TriageResult> {
        request.validate()?;
        let service = request.service();

        let classification = self
            .classifier
            .classify(&request.alert_text, service, request.environment())
            .await?;
        tracing::debug!(
            severity = %classification.severity,
            category = %classification.category,
            confidence = classification.confidence,
            "alert classified"
        );

        let steps = self
            .runbooks
            .generate(
                classification.severity,
                classification.category,
                &classification.summary,
                &classification.root_cause_hypothesis,
                service,
            )
            .await?;
        tracing::debug!(steps = steps.len(), "runbook generated");

        let result = TriageResult::assemble(
            classification,
            steps,
            request.alert_text.clone(),
            self.model_used.clone(),
        );
        tracing::info!(
            severity = %result.severity,
            category = %result.category,
            steps = result.runbook_steps.len(),
            model_used = %result.model_used,
            source = %request.source,
            "alert triaged"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TriageError;
    use crate::llm::testing::ScriptedBackend;
    use crate::taxonomy::{Category, Severity};
    use futures::executor::block_on;

    fn assert_contiguous(result: &TriageResult) {
        assert!(!result.runbook_steps.is_empty());
        for (idx, step) in result.runbook_steps.iter().enumerate() {
            assert_eq!(step.step_number as usize, idx + 1);
        }
    }

    #[test]
    fn demo_checkout_scenario() {
        let request = TriageRequest::new(
            "checkout service returning 500s, database connections exhausted",
        )
        .with_service("checkout-api");
        let result = block_on(TriagePipeline::demo().run(&request)).expect("triage");

        assert_eq!(result.severity, Severity::P1);
        assert_eq!(result.category, Category::Database);
        assert_eq!(result.escalation_team, "Database");
        assert_eq!(result.model_used, DEMO_MODEL);
        assert_eq!(result.raw_alert, request.alert_text);
        let numbers: Vec<u32> = result.runbook_steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn demo_is_idempotent() {
        let pipeline = TriagePipeline::demo();
        let request = TriageRequest::new("redis latency creeping up").with_service("cart");
        let a = block_on(pipeline.run(&request)).expect("triage");
        let b = block_on(pipeline.run(&request)).expect("triage");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_alert_rejected_in_every_mode() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let live = TriagePipeline::with_backend(backend.clone(), "m");
        for pipeline in [TriagePipeline::demo(), live] {
            let err = block_on(pipeline.run(&TriageRequest::new("   "))).unwrap_err();
            assert!(matches!(err, TriageError::InvalidInput(_)));
        }
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn raw_alert_is_kept_verbatim() {
        let text = "  disk at 91% on build-7\n  (second line)  ";
        let result = block_on(TriagePipeline::demo().run(&TriageRequest::new(text))).expect("triage");
        assert_eq!(result.raw_alert, text);
    }

    #[test]
    fn live_pairing_feeds_fresh_classification_into_runbook() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(r#"{"severity":"P2","category":"infra","summary":"node pressure","root_cause_hypothesis":"noisy neighbour"}"#.into()),
            Ok(r#"{"runbook_steps":[{"step_number":5,"action":"cordon node"},{"step_number":5,"action":"drain node"},{"step_number":9,"action":"verify"}]}"#.into()),
        ]));
        let pipeline = TriagePipeline::with_backend(backend.clone(), "llama3.3-70b-instruct");
        let request = TriageRequest::new("node memory pressure").with_service("batch");
        let result = block_on(pipeline.run(&request)).expect("triage");

        assert_eq!(result.severity, Severity::P2);
        assert_eq!(result.category, Category::Infra);
        assert_eq!(result.escalation_team, "Platform");
        assert_eq!(result.model_used, "llama3.3-70b-instruct");
        assert_contiguous(&result);

        let seen = backend.seen.lock().expect("lock");
        assert_eq!(seen.len(), 2);
        assert!(seen[1].context.contains("- Summary: node pressure"));
        assert!(seen[1].context.contains("- Root Cause Hypothesis: noisy neighbour"));
        assert!(seen[1].context.contains("- Service: batch"));
    }

    #[test]
    fn garbage_enums_never_reach_the_result() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(r#"{"severity":"CRITICAL!!","category":"kernel","confidence":-3}"#.into()),
            Ok(r#"{"runbook_steps":[{"action":"look around"}]}"#.into()),
        ]));
        let pipeline = TriagePipeline::with_backend(backend, "m");
        let result = block_on(pipeline.run(&TriageRequest::new("weird"))).expect("triage");
        assert_eq!(result.severity, Severity::P3);
        assert_eq!(result.category, Category::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert_contiguous(&result);
    }

    #[test]
    fn classification_failure_skips_runbook_stage() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(TriageError::backend(
            "connection reset",
        ))]));
        let pipeline = TriagePipeline::with_backend(backend.clone(), "m");
        let err = block_on(pipeline.run(&TriageRequest::new("db down"))).unwrap_err();
        assert!(matches!(err, TriageError::BackendUnavailable(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[test]
    fn runbook_failure_fails_whole_request() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Ok(r#"{"severity":"P1","category":"app"}"#.into()),
            Ok("<html>502 Bad Gateway</html>".into()),
        ]));
        let pipeline = TriagePipeline::with_backend(backend.clone(), "m");
        let err = block_on(pipeline.run(&TriageRequest::new("api down"))).unwrap_err();
        assert!(matches!(err, TriageError::BackendUnavailable(_)));
        assert_eq!(backend.calls(), 2);
    }

    #[test]
    fn live_without_credential_is_configuration_error() {
        let pipeline = TriagePipeline::for_mode(Mode::Live, LlmConfig::default());
        let err = block_on(pipeline.run(&TriageRequest::new("api down"))).unwrap_err();
        assert!(matches!(err, TriageError::Configuration(_)));
    }
}
