//! Pipeline error types for assembly and execution failures.
//!
//! - [`PipelineSpecError`]: problems found while assembling a pipeline from
//!   configuration (unknown component, missing package, unsatisfied
//!   requirement, bad option value). Always fatal, raised before any
//!   component trains or processes.
//! - [`PipelineRuntimeError`]: failures raised by a component while it
//!   trains, processes, persists or loads.
//! - [`TrainingDataError`]: a malformed annotation in one training example.
//!   Recoverable: it is logged, collected, and the annotation is skipped.
//!
//! Spec and runtime errors carry a stable [`ErrorCode`], a JSON pointer
//! `path` into the configuration (`/pipeline/2` is the third component), a
//! human-readable `message`, and an optional `hint`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error_code::ErrorCode;

/// JSON pointer for the component at `index` in the `pipeline` list.
pub fn component_path(index: usize) -> String {
    format!("/pipeline/{index}")
}

// ─── Spec (build-time) errors ───────────────────────────────────────────────

/// An assembly error found before the pipeline runs.
///
/// ```text
/// [missing_requirement] /pipeline/1: ner_gazetteer requires "tokens", which no earlier component provides
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{code}] {path}: {message}")]
pub struct PipelineSpecError {
    /// Stable error code for programmatic matching.
    pub code: ErrorCode,

    /// JSON pointer into the config (`""` for the root).
    pub path: String,

    /// Human-readable description of the problem.
    pub message: String,

    /// Optional suggestion for how to fix the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl PipelineSpecError {
    pub fn new(code: ErrorCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a hint suggesting how to fix the problem.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ─── Runtime (execution-time) errors ────────────────────────────────────────

/// A failure raised by a component during execution.
///
/// ```text
/// [missing_context] /pipeline/2 (stage: ner_gazetteer): no feature extractor in the pipeline context
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{code}] {path} (stage: {stage}): {message}")]
pub struct PipelineRuntimeError {
    pub code: ErrorCode,

    /// JSON pointer of the failing component, or `""` when unknown.
    pub path: String,

    /// Name of the component that failed.
    pub stage: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl PipelineRuntimeError {
    pub fn new(
        code: ErrorCode,
        path: impl Into<String>,
        stage: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            path: path.into(),
            stage: stage.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Shorthand for errors raised inside a component, before the executor
    /// knows the component's position. See [`Self::at`].
    pub fn stage(code: ErrorCode, stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, "", stage, message)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Fill in the component position if the raising component left it empty.
    pub fn at(mut self, index: usize) -> Self {
        if self.path.is_empty() {
            self.path = component_path(index);
        }
        self
    }
}

// ─── Training data warnings ─────────────────────────────────────────────────

/// A malformed annotation in a single training example.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Invalid entity {entity} in example '{text}': {reason}")]
pub struct TrainingDataError {
    /// Component that rejected the annotation.
    pub component: String,
    /// Index of the example in the training data.
    pub example: usize,
    /// Text of the offending example.
    pub text: String,
    /// Compact rendering of the offending annotation.
    pub entity: String,
    pub reason: String,
}
