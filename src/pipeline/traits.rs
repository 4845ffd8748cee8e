//! The component contract.
//!
//! Every pipeline stage implements [`Component`] (the per-instance lifecycle)
//! and [`ComponentFactory`] (static metadata plus construction and restore).
//! Components are driven as trait objects so a pipeline can be assembled
//! from names at runtime.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► provide_context ──► train ──► persist          (training run)
//! load   ──► provide_context ──► process, process, ...      (inference)
//! ```
//!
//! # Contract
//!
//! - `train` may annotate every example in the [`TrainingData`] in place;
//!   later components in the same pass observe those annotations.
//! - `process` takes `&self`: trained state is read-only at inference, so one
//!   loaded pipeline can serve concurrent calls on different messages.
//! - `persist` returns a small JSON payload describing what was written
//!   (an explicit `null` for "no artifact"); `load` receives it back.

use std::any::Any;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::config::NluConfig;
use crate::message::Message;
use crate::pipeline::errors::{PipelineRuntimeError, PipelineSpecError, TrainingDataError};
use crate::training_data::TrainingData;
use crate::types::{Entity, Token};

/// Payload a component returns from `persist` and receives in `load`.
pub type ComponentMetadata = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// ComponentSpec: static capability declaration
// ============================================================================

/// Static capabilities of a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSpec {
    /// Unique registry name, e.g. `"tokenizer_whitespace"`.
    pub name: &'static str,
    /// Message keys this component guarantees to set.
    pub provides: &'static [&'static str],
    /// Message keys that must be set by earlier components.
    pub requires: &'static [&'static str],
    /// External packages that must be available before the pipeline runs.
    pub required_packages: &'static [&'static str],
}

impl ComponentSpec {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            provides: &[],
            requires: &[],
            required_packages: &[],
        }
    }

    pub const fn provides(mut self, keys: &'static [&'static str]) -> Self {
        self.provides = keys;
        self
    }

    pub const fn requires(mut self, keys: &'static [&'static str]) -> Self {
        self.requires = keys;
        self
    }

    pub const fn required_packages(mut self, packages: &'static [&'static str]) -> Self {
        self.required_packages = packages;
        self
    }
}

// ============================================================================
// PipelineContext: handles shared between components
// ============================================================================

/// Keyword context accumulated from earlier components.
///
/// Holds shared handles (e.g. a feature extractor) that are not per-message
/// annotations. Values are reference counted and immutable once inserted.
#[derive(Clone, Default)]
pub struct PipelineContext {
    entries: FxHashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Arc::new(value));
    }

    /// Typed lookup; `None` if absent or of a different type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("PipelineContext").field("keys", &keys).finish()
    }
}

// ============================================================================
// TrainingReport: recoverable problems found while training
// ============================================================================

/// Warnings collected during one training run.
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub warnings: Vec<TrainingDataError>,
}

impl TrainingReport {
    /// Record a skipped annotation and log it.
    pub fn warn(&mut self, err: TrainingDataError) {
        tracing::warn!(component = %err.component, example = err.example, "Example skipped: {err}");
        self.warnings.push(err);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

// ============================================================================
// Component: per-instance lifecycle
// ============================================================================

/// A pipeline stage.
pub trait Component: fmt::Debug + Send + Sync {
    /// Static capabilities of this component.
    fn spec(&self) -> ComponentSpec;

    fn name(&self) -> &'static str {
        self.spec().name
    }

    /// Add shared handles for later components. Called before `train` and
    /// again after `load`.
    fn provide_context(&self, _ctx: &mut PipelineContext) {}

    /// Learn from `data`. May annotate examples in place.
    fn train(
        &mut self,
        _data: &mut TrainingData,
        _cfg: &NluConfig,
        _ctx: &PipelineContext,
        _report: &mut TrainingReport,
    ) -> Result<(), PipelineRuntimeError> {
        Ok(())
    }

    /// Annotate one message.
    fn process(&self, message: &mut Message, ctx: &PipelineContext) -> Result<(), PipelineRuntimeError>;

    /// Write trained state into `model_dir` and describe what was written.
    fn persist(&self, _model_dir: &Path) -> Result<ComponentMetadata, PipelineRuntimeError> {
        Ok(ComponentMetadata::new())
    }
}

/// Construction and restore for a component type.
pub trait ComponentFactory: Component + Sized + 'static {
    const SPEC: ComponentSpec;

    /// A fresh, untrained instance.
    fn create(cfg: &NluConfig) -> Result<Self, PipelineSpecError>;

    /// Restore from the payload `persist` returned. Components without
    /// trained state just create a fresh instance.
    fn load(
        _model_dir: &Path,
        _meta: &ComponentMetadata,
        cfg: &NluConfig,
    ) -> Result<Self, PipelineRuntimeError> {
        Self::create(cfg).map_err(|e| {
            PipelineRuntimeError::stage(
                e.code,
                Self::SPEC.name,
                format!("cannot recreate component: {}", e.message),
            )
        })
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Splits text into [`Token`]s located in the original input.
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    /// Attach tokens to every training example.
    fn tokenize_examples(&self, data: &mut TrainingData) {
        for example in &mut data.training_examples {
            let tokens = self.tokenize(example.text());
            example.set_tokens(tokens);
        }
    }
}

/// Produces [`Entity`] annotations.
pub trait EntityExtractor: Component {
    /// Stamp the extractor name on freshly extracted entities.
    fn add_extractor_name(&self, entities: Vec<Entity>) -> Vec<Entity> {
        entities
            .into_iter()
            .map(|e| e.with_extractor(self.name()))
            .collect()
    }
}

/// Map an entity's character span onto token indices `[start, end)`.
///
/// The span must begin at a token offset and finish at a token end;
/// otherwise the reason is returned.
pub fn align_entity(entity: &Entity, tokens: &[Token]) -> Result<(usize, usize), &'static str> {
    let start = tokens
        .iter()
        .position(|t| t.offset == entity.start)
        .ok_or("entities must span whole tokens. Wrong entity start.")?;
    let end = tokens
        .iter()
        .position(|t| t.end == entity.end)
        .ok_or("entities must span whole tokens. Wrong entity end.")?;
    if end < start {
        return Err("entities must span whole tokens. Wrong entity end.");
    }
    Ok((start, end + 1))
}
