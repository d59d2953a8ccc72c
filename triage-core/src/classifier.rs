use crate::error::Result;
use crate::llm::{parse_object, text_field, CompletionBackend, CompletionRequest};
use crate::models::Classification;
use crate::taxonomy::{Category, Severity};
use async_trait::async_trait;
use std::sync::Arc;

/// Stage 1: alert text to a typed classification.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        alert_text: &str,
        service_name: Option<&str>,
        environment: &str,
    ) -> Result<Classification>;
}

pub const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are an expert Site Reliability Engineer (SRE) with 10+ years of experience.
Your job is to analyze raw incident alerts and classify them accurately.

You MUST respond with valid JSON only. No markdown, no explanation outside the JSON.

Response schema:
{
  "severity": "P1" | "P2" | "P3",
  "category": "infra" | "app" | "database" | "network" | "security" | "unknown",
  "confidence": 0.0-1.0,
  "summary": "one-sentence summary of the issue",
  "root_cause_hypothesis": "most likely root cause based on the alert",
  "estimated_impact": "who/what is affected and how severely",
  "escalation_team": "team name (e.g. Platform, Backend, Database, Security, Network)",
  "escalation_reason": "why this team should handle it"
}

Severity guide:
- P1: Production is completely down, revenue impact, data loss risk
- P2: Significant degradation, partial outage, performance severely impacted
- P3: Minor issue, single service degraded, no immediate user impact
"#;

const DEFAULT_CONFIDENCE: f64 = 0.5;

pub struct LlmClassifier {
    backend: Arc<dyn CompletionBackend>,
}

impl LlmClassifier {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(
        &self,
        alert_text: &str,
        service_name: Option<&str>,
        environment: &str,
    ) -> Result<Classification> {
        let context = format!(
            "Service: {}\nEnvironment: {environment}\n\nAlert:\n{alert_text}",
            service_name.unwrap_or("unknown")
        );
        let raw = self
            .backend
            .complete(CompletionRequest {
                system: CLASSIFY_SYSTEM_PROMPT,
                context,
                temperature: 0.1,
                max_tokens: 512,
                json_output: true,
            })
            .await?;
        parse_classification(&raw)
    }
}

/// Normalises a backend reply. Out-of-taxonomy values are defaulted, never
/// propagated.
pub(crate) fn parse_classification(raw: &str) -> Result<Classification> {
    let obj = parse_object(raw, "classification")?;

    let severity = text_field(&obj, "severity")
        .map(|s| Severity::parse_or_default(&s))
        .unwrap_or(Severity::P3);
    let category = text_field(&obj, "category")
        .map(|s| Category::parse_or_default(&s))
        .unwrap_or(Category::Unknown);
    let confidence = obj
        .get("confidence")
        .and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE);

    Ok(Classification {
        severity,
        category,
        confidence,
        summary: text_field(&obj, "summary").unwrap_or_else(|| "No summary provided".into()),
        root_cause_hypothesis: text_field(&obj, "root_cause_hypothesis")
            .unwrap_or_else(|| "Unknown".into()),
        estimated_impact: text_field(&obj, "estimated_impact")
            .unwrap_or_else(|| "Unknown".into()),
        escalation_team: text_field(&obj, "escalation_team")
            .unwrap_or_else(|| category.escalation_team().into()),
        escalation_reason: text_field(&obj, "escalation_reason")
            .unwrap_or_else(|| format!("Default owner for {category} incidents")),
    })
}

const P1_KEYWORDS: &[&str] = &[
    "outage",
    "down",
    "critical",
    "500",
    "503",
    "unavailable",
    "data loss",
    "exhausted",
    "crash",
];

const P2_KEYWORDS: &[&str] = &[
    "timeout",
    "error",
    "degraded",
    "slow",
    "latency",
    "high cpu",
    "memory",
    "failed",
    "retry",
];

/// Checked in order; the first table with a hit decides the category.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Database,
        &[
            "database",
            "postgres",
            "postgresql",
            "mysql",
            "sql",
            "redis",
            "mongo",
            "replica",
            "deadlock",
            "connection pool",
        ],
    ),
    (
        Category::Infra,
        &[
            "cpu",
            "memory",
            "disk",
            "node",
            "kubernetes",
            "k8s",
            "pod",
            "container",
            "oom",
            "oomkilled",
        ],
    ),
    (
        Category::Network,
        &[
            "network",
            "dns",
            "packet",
            "tcp",
            "tls",
            "ssl",
            "certificate",
            "load balancer",
            "connection refused",
        ],
    ),
    (
        Category::Security,
        &[
            "security",
            "unauthorized",
            "breach",
            "attack",
            "ddos",
            "intrusion",
            "vulnerability",
            "brute force",
        ],
    ),
];

const SUMMARY_MAX_CHARS: usize = 120;

/// Deterministic keyword classifier used when no backend is configured.
/// Pure: identical input always yields identical output.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn classify_sync(
        &self,
        alert_text: &str,
        service_name: Option<&str>,
        environment: &str,
    ) -> Classification {
        let lower = alert_text.to_lowercase();
        let words = tokens(&lower);
        let (severity, confidence) = detect_severity(&words);
        let category = detect_category(&words);
        let service = service_name.unwrap_or("the affected service");

        Classification {
            severity,
            category,
            confidence,
            summary: format!("{severity} {category} alert on {service}: {}", headline(alert_text)),
            root_cause_hypothesis: root_cause_for(category).into(),
            estimated_impact: format!("{} in {environment}", impact_for(severity)),
            escalation_team: category.escalation_team().into(),
            escalation_reason: escalation_reason_for(category).into(),
        }
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(
        &self,
        alert_text: &str,
        service_name: Option<&str>,
        environment: &str,
    ) -> Result<Classification> {
        Ok(self.classify_sync(alert_text, service_name, environment))
    }
}

fn detect_severity(words: &[&str]) -> (Severity, f64) {
    if P1_KEYWORDS.iter().any(|k| has_keyword(words, k)) {
        (Severity::P1, 0.85)
    } else if P2_KEYWORDS.iter().any(|k| has_keyword(words, k)) {
        (Severity::P2, 0.75)
    } else {
        (Severity::P3, 0.6)
    }
}

fn detect_category(words: &[&str]) -> Category {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| has_keyword(words, k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::App)
}

fn tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Multi-word keywords must appear as a contiguous run of tokens.
fn has_keyword(words: &[&str], keyword: &str) -> bool {
    let wanted = tokens(keyword);
    if wanted.is_empty() || wanted.len() > words.len() {
        return false;
    }
    words
        .windows(wanted.len())
        .any(|run| run.iter().zip(&wanted).all(|(w, k)| token_matches(w, k)))
}

/// Exact token, a plural `s`, or a numeric keyword with a unit suffix
/// ("500s" matches "500", "5000ms" does not).
fn token_matches(word: &str, keyword: &str) -> bool {
    if word == keyword {
        return true;
    }
    let Some(rest) = word.strip_prefix(keyword) else {
        return false;
    };
    rest == "s"
        || (keyword.ends_with(|c: char| c.is_ascii_digit())
            && rest.chars().all(char::is_alphabetic))
}

fn headline(alert_text: &str) -> String {
    let first = alert_text.trim().lines().next().unwrap_or_default().trim();
    if first.chars().count() <= SUMMARY_MAX_CHARS {
        return first.to_string();
    }
    let cut: String = first.chars().take(SUMMARY_MAX_CHARS).collect();
    format!("{}...", cut.trim_end())
}

fn root_cause_for(category: Category) -> &'static str {
    match category {
        Category::Database => {
            "Database saturation: connection pool exhaustion, slow queries or lock contention"
        }
        Category::Infra => "Resource exhaustion on the underlying hosts or cluster nodes",
        Category::Network => "Connectivity problem: DNS, load balancer or TLS misconfiguration",
        Category::Security => "Suspicious or unauthorized access pattern against the service",
        Category::App | Category::Unknown => {
            "Application regression, most likely introduced by a recent deploy or config change"
        }
    }
}

fn impact_for(severity: Severity) -> &'static str {
    match severity {
        Severity::P1 => "Users are likely unable to complete requests; revenue at risk",
        Severity::P2 => "Users are seeing degraded performance or intermittent failures",
        Severity::P3 => "No immediate user impact expected",
    }
}

fn escalation_reason_for(category: Category) -> &'static str {
    match category {
        Category::Database => "Database team owns connection pools, replication and query tuning",
        Category::Infra => "Platform team owns compute, cluster capacity and node health",
        Category::Network => "Network team owns DNS, load balancers and certificates",
        Category::Security => "Security team must assess possible compromise before remediation",
        Category::App => "Backend team owns the application code and its deploys",
        Category::Unknown => "On-call engineer should route once the owner is identified",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TriageError;
    use crate::llm::testing::ScriptedBackend;
    use futures::executor::block_on;

    fn rules(text: &str) -> Classification {
        RuleClassifier.classify_sync(text, None, "production")
    }

    #[test]
    fn outage_is_p1() {
        let c = rules("Full OUTAGE in eu-west");
        assert_eq!(c.severity, Severity::P1);
        assert_eq!(c.confidence, 0.85);
    }

    #[test]
    fn timeout_without_outage_terms_is_p2() {
        let c = rules("api timeout talking to upstream");
        assert_eq!(c.severity, Severity::P2);
        assert_eq!(c.confidence, 0.75);
    }

    #[test]
    fn unmatched_text_is_p3_app() {
        let c = rules("nightly report job finished late");
        assert_eq!(c.severity, Severity::P3);
        assert_eq!(c.category, Category::App);
        assert_eq!(c.escalation_team, "Backend");
    }

    #[test]
    fn postgres_is_database() {
        let c = rules("postgres replication lag growing");
        assert_eq!(c.category, Category::Database);
        assert_eq!(c.escalation_team, "Database");
    }

    #[test]
    fn severity_and_category_are_independent() {
        let db = rules("outage: postgres primary unreachable");
        let app = rules("outage: checkout handler panics");
        assert_eq!(db.severity, app.severity);
        assert_eq!(db.confidence, app.confidence);
        assert_eq!(db.category, Category::Database);
        assert_eq!(app.category, Category::App);
    }

    #[test]
    fn category_tables_cover_each_team() {
        assert_eq!(rules("kubernetes node NotReady").category, Category::Infra);
        assert_eq!(rules("dns resolution failing").category, Category::Network);
        assert_eq!(rules("brute force login attempts").category, Category::Security);
    }

    #[test]
    fn rule_classifier_is_deterministic() {
        let text = "checkout service returning 500s, database connections exhausted";
        let a = RuleClassifier.classify_sync(text, Some("checkout-api"), "production");
        let b = RuleClassifier.classify_sync(text, Some("checkout-api"), "production");
        assert_eq!(a, b);
    }

    #[test]
    fn keywords_match_whole_tokens_only() {
        for text in [
            "request timeout after 5000ms to payments upstream",
            "p99 latency slowdown on search",
            "artifact download slow from mirror",
            "timeout on shutdown hook",
        ] {
            assert_eq!(rules(text).severity, Severity::P2, "{text}");
        }
        assert_eq!(rules("request timeout after 5000ms").category, Category::App);
    }

    #[test]
    fn numeric_keywords_accept_unit_suffix() {
        let c = rules("checkout service returning 500s, database connections exhausted");
        assert_eq!(c.severity, Severity::P1);
        assert_eq!(c.category, Category::Database);
        assert_eq!(rules("edge returned 503 for /cart").severity, Severity::P1);
    }

    #[test]
    fn multi_word_keywords_need_adjacent_tokens() {
        assert_eq!(rules("possible data loss on replica").severity, Severity::P1);
        assert_eq!(rules("loss of data freshness").severity, Severity::P3);
        assert_eq!(rules("high cpu on batch host").severity, Severity::P2);
        assert_eq!(rules("load balancer 5xx").category, Category::Network);
    }

    #[test]
    fn long_headlines_are_truncated() {
        let text = "x".repeat(300);
        let c = rules(&text);
        assert!(c.summary.ends_with("..."));
        assert!(c.summary.len() < 200);
    }

    #[test]
    fn parse_full_classification() {
        let raw = r#"{
          "severity":"P2",
          "category":"network",
          "confidence":0.9,
          "summary":"LB health checks flapping",
          "root_cause_hypothesis":"expired certificate",
          "estimated_impact":"10% of requests fail",
          "escalation_team":"Network",
          "escalation_reason":"owns the LB"
        }"#;
        let c = parse_classification(raw).expect("parse");
        assert_eq!(c.severity, Severity::P2);
        assert_eq!(c.category, Category::Network);
        assert_eq!(c.confidence, 0.9);
        assert_eq!(c.root_cause_hypothesis, "expired certificate");
    }

    #[test]
    fn parse_defaults_missing_fields() {
        let c = parse_classification("{}").expect("parse");
        assert_eq!(c.severity, Severity::P3);
        assert_eq!(c.category, Category::Unknown);
        assert_eq!(c.confidence, 0.5);
        assert_eq!(c.escalation_team, "On-Call");
    }

    #[test]
    fn parse_coerces_garbage_enums_and_confidence() {
        let raw = r#"{"severity":"SEV0","category":"storage","confidence":"7"}"#;
        let c = parse_classification(raw).expect("parse");
        assert_eq!(c.severity, Severity::P3);
        assert_eq!(c.category, Category::Unknown);
        assert_eq!(c.confidence, 1.0);

        let c = parse_classification(r#"{"severity":1,"confidence":[]}"#).expect("parse");
        assert_eq!(c.severity, Severity::P3);
        assert_eq!(c.confidence, 0.5);
    }

    #[test]
    fn llm_classifier_sends_context_and_normalises() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(
            r#"{"severity":"p1","category":"DATABASE"}"#.into(),
        )]));
        let classifier = LlmClassifier::new(backend.clone());
        let c = block_on(classifier.classify("db down", Some("orders"), "staging"))
            .expect("classify");
        assert_eq!(c.severity, Severity::P1);
        assert_eq!(c.category, Category::Database);

        let seen = backend.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert!(seen[0].context.contains("Service: orders"));
        assert!(seen[0].context.contains("Environment: staging"));
        assert!(seen[0].json_output);
        assert_eq!(seen[0].temperature, 0.1);
    }

    #[test]
    fn llm_classifier_surfaces_malformed_reply() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("sorry, I can't".into())]));
        let classifier = LlmClassifier::new(backend);
        let err = block_on(classifier.classify("x", None, "production")).unwrap_err();
        assert!(matches!(err, TriageError::BackendUnavailable(_)));
    }
}
