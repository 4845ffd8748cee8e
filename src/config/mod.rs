//! Configuration: a typed option set built from layered sources.
//!
//! [`ConfigLoader`] applies defaults, a JSON file, environment variables and
//! command-line values in increasing precedence, then deserialises the
//! result into [`NluConfig`]. See [`loader`] for the layering rules and
//! [`templates`] for pipeline template expansion.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "language": "en",
//!   "pipeline": "rules",
//!   "path": "models",
//!   "num_threads": 4,
//!   "dimensions": ["city", "time"]
//! }
//! ```

pub mod loader;
pub mod templates;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{NluError, Result};

pub use loader::{resolve, ConfigLoader, DEFAULT_CONFIG_LOCATION, ENV_PREFIX};
pub use templates::{pipeline_template, pipeline_template_names, register_pipeline_template};

/// Effective configuration for one training run or one loaded model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NluConfig {
    /// Optional project name, used as a prefix for model directories
    #[serde(default)]
    pub name: Option<String>,

    /// Language code (e.g. `"en"`, `"zh"`)
    #[serde(default = "default_language")]
    pub language: String,

    /// Ordered component names. A template name is expanded at load time.
    #[serde(default)]
    pub pipeline: Vec<String>,

    /// Root directory for persisted models (absolute after loading)
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Training data file, read by [`Trainer::train_from_config`](crate::Trainer::train_from_config)
    #[serde(default)]
    pub data: Option<PathBuf>,

    /// Response log directory (absolute after loading)
    #[serde(default = "default_response_log")]
    pub response_log: Option<PathBuf>,

    /// Persist into this directory name instead of a timestamped one
    #[serde(default)]
    pub fixed_model_name: Option<String>,

    /// Threads used for batch inference
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,

    /// Entity labels extractors may emit (empty = all)
    #[serde(default)]
    pub dimensions: Vec<String>,

    /// Extra word list for the dictionary segmenter, one word per line
    #[serde(default)]
    pub segmenter_dictionary: Option<PathBuf>,

    /// Options outside the recognised schema, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_path() -> PathBuf {
    PathBuf::from("models")
}

fn default_response_log() -> Option<PathBuf> {
    Some(PathBuf::from("logs"))
}

fn default_num_threads() -> usize {
    1
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            name: None,
            language: default_language(),
            pipeline: Vec::new(),
            path: default_path(),
            data: None,
            response_log: default_response_log(),
            fixed_model_name: None,
            num_threads: default_num_threads(),
            dimensions: Vec::new(),
            segmenter_dictionary: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl NluConfig {
    /// Create a config with default values (paths stay relative)
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate option values that the type system does not constrain
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(NluError::config("num_threads must be > 0"));
        }
        if self.language.trim().is_empty() {
            return Err(NluError::config("language must not be empty"));
        }
        Ok(())
    }

    /// JSON object view of every option, recognised or not.
    pub fn as_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Value of a single option.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.as_map().remove(key)
    }

    /// Replace one option in place.
    ///
    /// The value goes through the same normalisation as a config layer
    /// (list splitting, template expansion, absolute paths) and the result is
    /// re-validated against the schema. On error `self` is unchanged.
    pub fn set(&mut self, key: &str, value: impl Into<serde_json::Value>) -> Result<()> {
        let mut layer = serde_json::Map::new();
        layer.insert(key.to_string(), value.into());
        let mut map = self.as_map();
        loader::apply_layer(&mut map, layer)?;
        *self = loader::finalize(map)?;
        Ok(())
    }

    /// Pretty-printed JSON of the effective configuration.
    pub fn view(&self) -> String {
        serde_json::to_string_pretty(&self.as_map()).unwrap_or_default()
    }

    /// Builder method: set the component list
    pub fn with_pipeline<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pipeline = components.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method: set language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Builder method: set model root directory
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Builder method: persist into a fixed directory name
    pub fn with_fixed_model_name(mut self, name: impl Into<String>) -> Self {
        self.fixed_model_name = Some(name.into());
        self
    }

    /// Builder method: set batch inference thread count
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Builder method: restrict emitted entity labels
    pub fn with_dimensions<I, S>(mut self, dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions = dimensions.into_iter().map(Into::into).collect();
        self
    }
}
