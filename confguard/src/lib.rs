//! ConfGuard: security analysis and minimal autofix for configuration
//! files.
//!
//! The pipeline takes a config file (Dockerfile, Kubernetes manifest,
//! `.env`, nginx, IAM policy), runs deterministic pattern checks plus a
//! hosted LLM audit, reconciles both finding streams into one
//! deduplicated, severity-ordered set with stable display IDs, and then
//! synthesizes a minimally-invasive corrective patch with a unified diff.
//!
//! Layout follows the data flow: [`rules`] and [`llm`] produce findings,
//! [`merge`] reconciles them, [`postprocess`] finalizes them, [`autofix`]
//! consumes them, [`store`] owns the task records in between.

/// Analysis orchestrator.
pub mod analyze;
/// Patch synthesizer.
pub mod autofix;
/// Unified diff construction.
pub mod diff;
/// Finding wire types.
pub mod findings;
/// Generative text gateway (trait, client, prompts, JSON extraction).
pub mod llm;
/// Finding reconciliation.
pub mod merge;
/// Normalization and cluster keys.
pub mod normalize;
/// Line inference, ID assignment, sort and cap.
pub mod postprocess;
/// Provenance envelope hashing.
pub mod provenance;
/// Markdown report generation.
pub mod report;
/// Deterministic pattern checks.
pub mod rules;
/// Runtime settings.
pub mod settings;
/// In-memory task store.
pub mod store;
/// Task records.
pub mod task;
/// Scripted gateway for tests.
pub mod test_utils;

pub use analyze::{analyze_task, AnalysisOutcome, AnalyzeError};
pub use autofix::{autofix_task, AutofixError};
pub use findings::{FileType, Finding, FindingSource, FindingsPayload, LineRange, Severity};
pub use llm::{GeminiClient, GenError, TextGenerator};
pub use report::{generate_report, ReportError};
pub use settings::Settings;
pub use store::{TaskPatch, TaskStore};
pub use task::{AgentTask, TaskInput, TaskState};
