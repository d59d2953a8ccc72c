use crate::error::{Result, TriageError};
use crate::llm::{parse_object, text_field, CompletionBackend, CompletionRequest};
use crate::models::{renumber, RunbookStep};
use crate::taxonomy::{Category, Severity};
use async_trait::async_trait;
use std::sync::Arc;

/// Stage 2: classification to an ordered remediation runbook, numbered 1..N.
#[async_trait]
pub trait RunbookGenerator: Send + Sync {
    async fn generate(
        &self,
        severity: Severity,
        category: Category,
        summary: &str,
        root_cause: &str,
        service_name: Option<&str>,
    ) -> Result<Vec<RunbookStep>>;
}

pub const RUNBOOK_SYSTEM_PROMPT: &str = r#"You are an expert SRE runbook generator. Given an incident classification,
generate concrete, actionable remediation steps.

You MUST respond with valid JSON only.

Response schema:
{
  "runbook_steps": [
    {
      "step_number": 1,
      "action": "description of what to do",
      "command": "optional shell/kubectl/etc command",
      "expected_outcome": "what you should see if this works"
    }
  ]
}

Rules:
- Provide 3-7 steps depending on severity
- Steps must be ordered from immediate triage to full resolution
- Include real commands where applicable (kubectl, psql, curl, etc.)
- P1 steps should focus on mitigation first, then diagnosis
- P2/P3 steps can be more diagnostic
"#;

pub struct LlmRunbookGenerator {
    backend: Arc<dyn CompletionBackend>,
}

impl LlmRunbookGenerator {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl RunbookGenerator for LlmRunbookGenerator {
    async fn generate(
        &self,
        severity: Severity,
        category: Category,
        summary: &str,
        root_cause: &str,
        service_name: Option<&str>,
    ) -> Result<Vec<RunbookStep>> {
        let context = format!(
            "Incident Details:\n\
             - Severity: {severity}\n\
             - Category: {category}\n\
             - Summary: {summary}\n\
             - Root Cause Hypothesis: {root_cause}\n\
             - Service: {}\n\n\
             Generate step-by-step remediation runbook.",
            service_name.unwrap_or("unknown")
        );
        let raw = self
            .backend
            .complete(CompletionRequest {
                system: RUNBOOK_SYSTEM_PROMPT,
                context,
                temperature: 0.2,
                max_tokens: 1024,
                json_output: true,
            })
            .await?;
        parse_runbook(&raw)
    }
}

/// Keeps usable steps in received order and renumbers them; the backend's
/// own numbering is ignored.
pub(crate) fn parse_runbook(raw: &str) -> Result<Vec<RunbookStep>> {
    let obj = parse_object(raw, "runbook")?;
    let mut steps = obj
        .get("runbook_steps")
        .and_then(serde_json::Value::as_array)
        .map(|xs| {
            xs.iter()
                .filter_map(serde_json::Value::as_object)
                .filter_map(|step| {
                    Some(RunbookStep {
                        step_number: 0,
                        action: text_field(step, "action")?,
                        command: text_field(step, "command"),
                        expected_outcome: text_field(step, "expected_outcome"),
                    })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if steps.is_empty() {
        return Err(TriageError::backend("runbook json contained no usable steps"));
    }
    renumber(&mut steps);
    Ok(steps)
}

fn step(action: &str, command: Option<String>, expected_outcome: &str) -> RunbookStep {
    RunbookStep {
        step_number: 0,
        action: action.into(),
        command,
        expected_outcome: Some(expected_outcome.into()),
    }
}

fn triage_preamble(service: &str) -> Vec<RunbookStep> {
    vec![
        step(
            "Acknowledge the alert and open an incident channel",
            None,
            "Responders know someone owns the incident",
        ),
        step(
            &format!("Check dashboards for {service}: error rate, latency and saturation"),
            None,
            "Blast radius and start time of the anomaly are known",
        ),
        step(
            "Check recent deploys and config changes",
            Some(format!("kubectl rollout history deployment/{service}")),
            "Any change that lines up with the start of the anomaly is identified",
        ),
    ]
}

fn database_steps(service: &str) -> Vec<RunbookStep> {
    vec![
        step(
            "Check active connections against the pool limit",
            Some("psql -c \"SELECT count(*), state FROM pg_stat_activity GROUP BY state;\"".into()),
            "Connection count is below max_connections",
        ),
        step(
            "Find long-running queries and lock waits",
            Some(
                "psql -c \"SELECT pid, now() - query_start AS age, query FROM pg_stat_activity WHERE state <> 'idle' ORDER BY age DESC LIMIT 10;\""
                    .into(),
            ),
            "Blocking or runaway queries are identified",
        ),
        step(
            &format!("Restart {service} pods to release leaked connections if the pool is exhausted"),
            Some(format!("kubectl rollout restart deployment/{service}")),
            "Connections drop back to the normal baseline",
        ),
    ]
}

fn infra_steps(service: &str) -> Vec<RunbookStep> {
    vec![
        step(
            "Check node health and resource pressure",
            Some("kubectl top nodes && kubectl get nodes".into()),
            "All nodes Ready with headroom on CPU and memory",
        ),
        step(
            &format!("Inspect {service} pods for restarts, OOMKills and evictions"),
            Some(format!("kubectl get pods -l app={service} -o wide")),
            "Pods are Running without recent restarts",
        ),
        step(
            "Scale out or cordon unhealthy nodes",
            Some(format!("kubectl scale deployment/{service} --replicas=<n>")),
            "Load is spread across healthy capacity",
        ),
    ]
}

fn network_steps(service: &str) -> Vec<RunbookStep> {
    vec![
        step(
            &format!("Verify DNS resolution for {service}"),
            Some(format!("dig +short {service}")),
            "Name resolves to the expected addresses",
        ),
        step(
            "Check load balancer target health",
            None,
            "All targets report healthy",
        ),
        step(
            "Validate TLS certificates and endpoint reachability",
            Some(format!("curl -sv https://{service}/health")),
            "Handshake succeeds and the health endpoint returns 200",
        ),
    ]
}

fn security_steps(service: &str) -> Vec<RunbookStep> {
    vec![
        step(
            "Review access logs for the suspicious source addresses",
            Some(format!("kubectl logs deployment/{service} --since=1h | grep -iE 'denied|unauthorized'")),
            "Offending sources and targeted endpoints are identified",
        ),
        step(
            "Block offending sources at the edge or WAF",
            None,
            "Malicious traffic no longer reaches the service",
        ),
        step(
            "Rotate credentials that may have been exposed",
            None,
            "Old credentials are revoked and services use the new ones",
        ),
    ]
}

fn app_steps(service: &str) -> Vec<RunbookStep> {
    vec![
        step(
            &format!("Tail {service} logs for the dominant error"),
            Some(format!("kubectl logs deployment/{service} --since=15m | grep -i error")),
            "The failing code path or dependency is identified",
        ),
        step(
            "Check the health of downstream dependencies",
            Some(format!("curl -s https://{service}/health")),
            "Dependencies report healthy",
        ),
        step(
            "Roll back the latest deploy if it correlates with the errors",
            Some(format!("kubectl rollout undo deployment/{service}")),
            "Error rate returns to baseline",
        ),
    ]
}

fn category_steps(category: Category, service: &str) -> Vec<RunbookStep> {
    match category {
        Category::Database => database_steps(service),
        Category::Infra => infra_steps(service),
        Category::Network => network_steps(service),
        Category::Security => security_steps(service),
        Category::App | Category::Unknown => app_steps(service),
    }
}

/// Fixed template runbook: triage preamble, three category steps, stakeholder
/// notification, plus a manager page for P1. Cannot fail.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateRunbookGenerator;

impl TemplateRunbookGenerator {
    pub fn build(
        &self,
        severity: Severity,
        category: Category,
        service_name: Option<&str>,
    ) -> Vec<RunbookStep> {
        let service = service_name.unwrap_or("service");
        let mut steps = triage_preamble(service);
        steps.extend(category_steps(category, service));
        steps.push(step(
            "Notify stakeholders with impact, current status and next update time",
            None,
            "Stakeholders and support are informed",
        ));
        if severity.is_critical() {
            steps.push(step(
                "Page the engineering manager on call and escalate to incident command",
                None,
                "Incident commander assigned and leadership aware",
            ));
        }
        renumber(&mut steps);
        steps
    }
}

#[async_trait]
impl RunbookGenerator for TemplateRunbookGenerator {
    async fn generate(
        &self,
        severity: Severity,
        category: Category,
        _summary: &str,
        _root_cause: &str,
        service_name: Option<&str>,
    ) -> Result<Vec<RunbookStep>> {
        Ok(self.build(severity, category, service_name))
    }
}
