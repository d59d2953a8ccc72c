use crate::error::ApiResult;
use crate::routes::run_triage;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use triage_core::{TriageError, TriageRequest, TriageResult};

/// Turns a paging/alerting system's webhook payload into a triage request.
pub trait AlertAdapter: Send + Sync + 'static {
    fn source(&self) -> &'static str;
    fn extract(&self, payload: &serde_json::Value) -> Option<(String, Option<String>)>;

    fn parse(&self, payload: &serde_json::Value) -> Result<TriageRequest, TriageError> {
        let (alert_text, service_name) = self
            .extract(payload)
            .filter(|(text, _)| !text.trim().is_empty())
            .ok_or_else(|| {
                TriageError::invalid_input(format!(
                    "could not extract alert from {} payload",
                    self.source()
                ))
            })?;
        let mut request = TriageRequest::new(alert_text).with_source(self.source());
        request.service_name = service_name.filter(|s| !s.trim().is_empty());
        Ok(request)
    }
}

pub struct PagerDutyAdapter;
pub struct AlertmanagerAdapter;
pub struct GenericAdapter;

fn str_at<'a>(value: &'a serde_json::Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(k).and_then(serde_json::Value::as_str))
        .find(|s| !s.trim().is_empty())
}

impl AlertAdapter for PagerDutyAdapter {
    fn source(&self) -> &'static str {
        "pagerduty"
    }

    fn extract(&self, payload: &serde_json::Value) -> Option<(String, Option<String>)> {
        let incident = payload
            .get("messages")
            .and_then(serde_json::Value::as_array)
            .and_then(|msgs| msgs.first())
            .and_then(|msg| msg.get("incident"))?;
        let text = str_at(incident, &["description", "title"])?;
        let service = incident
            .get("service")
            .and_then(|s| s.get("name"))
            .and_then(serde_json::Value::as_str);
        Some((text.to_string(), service.map(ToString::to_string)))
    }
}

impl AlertAdapter for AlertmanagerAdapter {
    fn source(&self) -> &'static str {
        "alertmanager"
    }

    fn extract(&self, payload: &serde_json::Value) -> Option<(String, Option<String>)> {
        let first = payload
            .get("alerts")
            .and_then(serde_json::Value::as_array)
            .and_then(|a| a.first())?;
        let labels = first.get("labels").cloned().unwrap_or_else(|| serde_json::json!({}));
        let annotations = first
            .get("annotations")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));

        let text = str_at(&annotations, &["summary", "description"])
            .or_else(|| str_at(&labels, &["alertname"]))?;
        let service = str_at(&labels, &["service", "job"]);
        Some((text.to_string(), service.map(ToString::to_string)))
    }
}

impl AlertAdapter for GenericAdapter {
    fn source(&self) -> &'static str {
        "generic"
    }

    fn extract(&self, payload: &serde_json::Value) -> Option<(String, Option<String>)> {
        let text = str_at(payload, &["alert_text", "title", "message"])?;
        let service = str_at(payload, &["service_name", "service"]);
        Some((text.to_string(), service.map(ToString::to_string)))
    }
}

pub fn webhook_router() -> Router<AppState> {
    Router::new()
        .route("/webhook/pagerduty", post(handle_pagerduty))
        .route("/webhook/alertmanager", post(handle_alertmanager))
        .route("/webhook/generic", post(handle_generic))
}

async fn handle_pagerduty(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<TriageResult>> {
    triage_with_adapter(&state, &payload, PagerDutyAdapter).await
}

async fn handle_alertmanager(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<TriageResult>> {
    triage_with_adapter(&state, &payload, AlertmanagerAdapter).await
}

async fn handle_generic(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<TriageResult>> {
    triage_with_adapter(&state, &payload, GenericAdapter).await
}

async fn triage_with_adapter(
    state: &AppState,
    payload: &serde_json::Value,
    adapter: impl AlertAdapter,
) -> ApiResult<Json<TriageResult>> {
    let request = adapter.parse(payload)?;
    tracing::debug!(source = adapter.source(), "webhook payload adapted");
    run_triage(state, request).await
}
