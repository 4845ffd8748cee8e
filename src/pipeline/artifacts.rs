//! JSON artifacts written by trainable components.
//!
//! A component that has learned something writes one JSON file into the
//! model directory and records its file name in its metadata payload under
//! a component-specific key. A component with nothing to persist records an
//! explicit `null` under the same key, so loading can tell "no model" apart
//! from a missing payload.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error_code::ErrorCode;
use super::errors::PipelineRuntimeError;
use super::traits::ComponentMetadata;

/// Write `value` (or nothing) and describe it under `key`.
///
/// ```text
/// Some(model) -> {"<key>": "<file>"}   and <model_dir>/<file> written
/// None        -> {"<key>": null}
/// ```
pub fn persist_artifact<T: Serialize>(
    model_dir: &Path,
    stage: &str,
    key: &str,
    file: &str,
    value: Option<&T>,
) -> Result<ComponentMetadata, PipelineRuntimeError> {
    let mut meta = ComponentMetadata::new();
    let Some(value) = value else {
        meta.insert(key.to_string(), serde_json::Value::Null);
        return Ok(meta);
    };

    let path = model_dir.join(file);
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        PipelineRuntimeError::stage(ErrorCode::PersistFailed, stage, format!("cannot encode {file}: {e}"))
    })?;
    std::fs::write(&path, json).map_err(|e| {
        PipelineRuntimeError::stage(
            ErrorCode::PersistFailed,
            stage,
            format!("cannot write '{}': {e}", path.display()),
        )
    })?;
    meta.insert(key.to_string(), serde_json::Value::String(file.to_string()));
    Ok(meta)
}

/// Read the artifact recorded under `key`; `None` when the payload holds
/// `null` or lacks the key.
pub fn load_artifact<T: DeserializeOwned>(
    model_dir: &Path,
    meta: &ComponentMetadata,
    stage: &str,
    key: &str,
) -> Result<Option<T>, PipelineRuntimeError> {
    let Some(file) = meta.get(key).and_then(serde_json::Value::as_str) else {
        return Ok(None);
    };
    let path = model_dir.join(file);
    let json = std::fs::read_to_string(&path).map_err(|e| {
        PipelineRuntimeError::stage(
            ErrorCode::LoadFailed,
            stage,
            format!("cannot read '{}': {e}", path.display()),
        )
    })?;
    serde_json::from_str(&json).map(Some).map_err(|e| {
        PipelineRuntimeError::stage(
            ErrorCode::LoadFailed,
            stage,
            format!("invalid artifact '{}': {e}", path.display()),
        )
    })
}
