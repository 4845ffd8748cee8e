//! Layered configuration resolution.
//!
//! Layers, lowest precedence first:
//!
//! 1. built-in defaults ([`NluConfig::default`])
//! 2. a JSON config file (explicit, or [`DEFAULT_CONFIG_LOCATION`] if it exists)
//! 3. environment variables containing [`ENV_PREFIX`]
//! 4. command-line values
//!
//! Every layer replaces whole values per key; nothing is merged recursively.
//! After layering, a string `pipeline` is expanded through the template
//! registry and the map is deserialised into the typed [`NluConfig`].

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::templates::{pipeline_template, pipeline_template_names};
use super::NluConfig;
use crate::errors::{NluError, Result};

/// Config file consulted when no explicit file is given.
pub const DEFAULT_CONFIG_LOCATION: &str = "config.json";

/// Namespace marker for environment variables (matched case-insensitively).
pub const ENV_PREFIX: &str = "mynlu_";

/// Keys whose comma-separated string values are split into lists.
const LIST_KEYS: &[&str] = &["pipeline", "dimensions"];

/// Keys whose relative values are made absolute against the working directory.
const PATH_KEYS: &[&str] = &["path", "response_log"];

/// Fluent builder over the four configuration layers.
///
/// ```rust,ignore
/// let cfg = ConfigLoader::new()
///     .with_file("nlu.json")
///     .with_env(std::env::vars())
///     .with_cmdline([("pipeline", Some("rules"))])
///     .load()?;
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    default_location: Option<PathBuf>,
    env: Option<Vec<(String, String)>>,
    cmdline: Option<Vec<(String, Option<String>)>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            default_location: Some(PathBuf::from(DEFAULT_CONFIG_LOCATION)),
            env: None,
            cmdline: None,
        }
    }

    /// Read this config file. It must exist and hold a JSON object.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Change (or with `None`, disable) the fallback file location.
    pub fn with_default_location(mut self, path: Option<PathBuf>) -> Self {
        self.default_location = path;
        self
    }

    /// Environment variables, e.g. `std::env::vars()`.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Parsed command-line options; `None` values were not given and are ignored.
    pub fn with_cmdline<I, K, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.cmdline = Some(
            args.into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        );
        self
    }

    /// Apply all layers and produce the effective configuration.
    pub fn load(&self) -> Result<NluConfig> {
        let defaults = NluConfig::default().as_map();
        let mut layered = Map::new();
        apply_layer(&mut layered, defaults.clone())?;

        let file = self.file.clone().or_else(|| {
            self.default_location
                .as_ref()
                .filter(|p| p.is_file())
                .cloned()
        });
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "Reading configuration file");
            apply_layer(&mut layered, read_file_layer(&path)?)?;
        }

        if let Some(env) = &self.env {
            apply_layer(&mut layered, env_layer(env, &defaults))?;
        }

        if let Some(cmdline) = &self.cmdline {
            apply_layer(&mut layered, cmdline_layer(cmdline, &defaults))?;
        }

        finalize(layered)
    }
}

/// Resolve configuration from up to three override sources.
///
/// Equivalent to [`ConfigLoader`] with the same inputs.
pub fn resolve(
    file: Option<&Path>,
    env: Option<&[(String, String)]>,
    cmdline: Option<&[(String, Option<String>)]>,
) -> Result<NluConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(file) = file {
        loader = loader.with_file(file);
    }
    if let Some(env) = env {
        loader = loader.with_env(env.iter().cloned());
    }
    if let Some(cmdline) = cmdline {
        loader = loader.with_cmdline(cmdline.iter().cloned());
    }
    loader.load()
}

// ─── Layers ─────────────────────────────────────────────────────────────────

fn read_file_layer(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        NluError::config(format!(
            "Failed to read configuration file '{}'. Error: {e}",
            path.display()
        ))
    })?;
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(NluError::config(format!(
            "Failed to read configuration file '{}'. Error: expected a JSON object, found {}",
            path.display(),
            json_kind(&other)
        ))),
        Err(e) => Err(NluError::config(format!(
            "Failed to read configuration file '{}'. Error: {e}",
            path.display()
        ))),
    }
}

fn env_layer(vars: &[(String, String)], defaults: &Map<String, Value>) -> Map<String, Value> {
    let mut layer = Map::new();
    for (name, raw) in vars {
        let lowered = name.to_ascii_lowercase();
        let Some(pos) = lowered.find(ENV_PREFIX) else {
            continue;
        };
        let key = &lowered[pos + ENV_PREFIX.len()..];
        if key.is_empty() {
            continue;
        }
        layer.insert(key.to_string(), coerce_scalar(key, raw, defaults));
    }
    layer
}

fn cmdline_layer(
    args: &[(String, Option<String>)],
    defaults: &Map<String, Value>,
) -> Map<String, Value> {
    args.iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|raw| (key.clone(), coerce_scalar(key, raw, defaults)))
        })
        .collect()
}

/// Strings for keys whose default is a number or boolean are parsed as JSON
/// scalars. Anything else, or a failed parse, stays a string.
fn coerce_scalar(key: &str, raw: &str, defaults: &Map<String, Value>) -> Value {
    match defaults.get(key) {
        Some(Value::Number(_)) | Some(Value::Bool(_)) => serde_json::from_str::<Value>(raw.trim())
            .ok()
            .filter(|v| v.is_number() || v.is_boolean())
            .unwrap_or_else(|| Value::String(raw.to_string())),
        _ => Value::String(raw.to_string()),
    }
}

/// Normalise `layer` and lay it over `target`, key by key.
pub(crate) fn apply_layer(target: &mut Map<String, Value>, mut layer: Map<String, Value>) -> Result<()> {
    split_lists(&mut layer);
    make_paths_absolute(&mut layer)?;
    for (key, value) in layer {
        target.insert(key, value);
    }
    Ok(())
}

/// Expand the pipeline template and deserialise into the typed config.
pub(crate) fn finalize(mut map: Map<String, Value>) -> Result<NluConfig> {
    expand_pipeline(&mut map)?;
    let config: NluConfig = serde_json::from_value(Value::Object(map))
        .map_err(|e| NluError::config(format!("Invalid option value: {e}")))?;
    config.validate()?;
    Ok(config)
}

fn split_lists(layer: &mut Map<String, Value>) {
    for key in LIST_KEYS {
        let Some(Value::String(joined)) = layer.get(*key) else {
            continue;
        };
        let mut parts: Vec<String> = joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let value = if *key == "pipeline" && parts.len() == 1 {
            Value::String(parts.remove(0))
        } else {
            Value::Array(parts.into_iter().map(Value::String).collect())
        };
        layer.insert(key.to_string(), value);
    }
}

fn make_paths_absolute(layer: &mut Map<String, Value>) -> Result<()> {
    for key in PATH_KEYS {
        let Some(Value::String(raw)) = layer.get(*key) else {
            continue;
        };
        let path = Path::new(raw);
        if raw.is_empty() || path.is_absolute() {
            continue;
        }
        let cwd = std::env::current_dir().map_err(|e| {
            NluError::config(format!("Cannot resolve relative {key} '{raw}': {e}"))
        })?;
        let absolute = cwd.join(path).to_string_lossy().into_owned();
        layer.insert(key.to_string(), Value::String(absolute));
    }
    Ok(())
}

fn expand_pipeline(map: &mut Map<String, Value>) -> Result<()> {
    let Some(Value::String(name)) = map.get("pipeline") else {
        return Ok(());
    };
    match pipeline_template(name) {
        Some(components) => {
            tracing::debug!(template = %name, ?components, "Expanded pipeline template");
            let list = components.into_iter().map(Value::String).collect();
            map.insert("pipeline".to_string(), Value::Array(list));
            Ok(())
        }
        None => Err(NluError::config(format!(
            "No pipeline specified and unknown pipeline template '{name}' passed. \
             Known pipeline templates: {}",
            pipeline_template_names().join(", ")
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
