//! Alert triage: classify raw alert text, then generate a remediation runbook
//! from that classification.
//!
//! Two oracle pairings sit behind the same traits: an LLM-backed one and a
//! deterministic rule/template one used when no backend credential is set.
//! Callers see the same `TriageResult` shape from either.

pub mod classifier;
pub mod error;
pub mod llm;
pub mod mode;
pub mod models;
pub mod pipeline;
pub mod runbooks;
pub mod taxonomy;

pub use error::{Result, TriageError};
pub use mode::Mode;
pub use models::{Classification, RunbookStep, TriageRequest, TriageResult};
pub use pipeline::TriagePipeline;
pub use taxonomy::{Category, Severity};
