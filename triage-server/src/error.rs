use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use triage_core::TriageError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError(pub TriageError);

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TriageError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TriageError::BackendUnavailable(_) => StatusCode::BAD_GATEWAY,
            TriageError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            TriageError::InvalidInput(msg) => msg.clone(),
            TriageError::BackendUnavailable(msg) => {
                tracing::error!("Backend error: {}", msg);
                "Inference backend unavailable".to_string()
            }
            TriageError::Configuration(msg) => {
                tracing::error!("Configuration error: {}", msg);
                msg.clone()
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
