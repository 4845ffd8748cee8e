//! The `metadata.json` file describing a persisted model directory.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{NluError, Result};

use super::traits::ComponentMetadata;

/// File name written into every model directory.
pub const METADATA_FILE: &str = "metadata.json";

/// What one component wrote during persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub name: String,
    #[serde(default)]
    pub payload: ComponentMetadata,
}

/// Everything needed to rebuild a trained pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub language: String,
    pub pipeline: Vec<String>,
    pub trained_at: DateTime<Utc>,
    pub version: String,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

impl Metadata {
    pub fn new(language: impl Into<String>, pipeline: Vec<String>) -> Self {
        Self {
            language: language.into(),
            pipeline,
            trained_at: Utc::now(),
            version: crate::VERSION.to_string(),
            components: Vec::new(),
        }
    }

    /// Payload recorded for the component at `index`; empty if none.
    ///
    /// Lookup is positional, so a pipeline that repeats a component restores
    /// each instance from its own record.
    pub fn component_payload(&self, index: usize) -> ComponentMetadata {
        match self.components.get(index) {
            Some(record) if self.pipeline.get(index) == Some(&record.name) => record.payload.clone(),
            _ => ComponentMetadata::new(),
        }
    }

    pub fn load(model_dir: impl AsRef<Path>) -> Result<Self> {
        let path = model_dir.as_ref().join(METADATA_FILE);
        let json = std::fs::read_to_string(&path).map_err(|e| NluError::io(&path, e))?;
        serde_json::from_str(&json).map_err(|e| {
            NluError::serialization(format!("invalid {}: {e}", path.display()))
        })
    }

    pub fn persist(&self, model_dir: impl AsRef<Path>) -> Result<()> {
        let path = model_dir.as_ref().join(METADATA_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| NluError::io(&path, e))
    }
}
