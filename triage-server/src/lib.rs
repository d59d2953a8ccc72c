pub mod config;
pub mod error;
pub mod routes;
pub mod webhook;

use std::sync::Arc;
use triage_core::{Mode, TriagePipeline};

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TriagePipeline>,
    pub mode: Mode,
}

impl AppState {
    pub fn new(pipeline: TriagePipeline, mode: Mode) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            mode,
        }
    }
}

pub use routes::router;
