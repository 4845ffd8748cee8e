//! Component lookup by name, and external package availability.

use std::fmt;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::classifiers::KeywordIntentClassifier;
use crate::config::NluConfig;
use crate::extractors::{GazetteerExtractor, SynonymMapper};
#[cfg(feature = "segmenter")]
use crate::nlp::JiebaTokenizer;
#[cfg(not(feature = "segmenter"))]
use crate::nlp::JIEBA_TOKENIZER;
use crate::nlp::{FeatureProvider, RuleTokenizer, WhitespaceTokenizer};

use super::error_code::ErrorCode;
use super::errors::{PipelineRuntimeError, PipelineSpecError};
use super::traits::{Component, ComponentFactory, ComponentMetadata, ComponentSpec};

type CreateFn = fn(&NluConfig) -> Result<Box<dyn Component>, PipelineSpecError>;
type LoadFn =
    fn(&Path, &ComponentMetadata, &NluConfig) -> Result<Box<dyn Component>, PipelineRuntimeError>;

fn create_boxed<T: ComponentFactory>(cfg: &NluConfig) -> Result<Box<dyn Component>, PipelineSpecError> {
    T::create(cfg).map(|c| Box::new(c) as Box<dyn Component>)
}

fn load_boxed<T: ComponentFactory>(
    model_dir: &Path,
    meta: &ComponentMetadata,
    cfg: &NluConfig,
) -> Result<Box<dyn Component>, PipelineRuntimeError> {
    T::load(model_dir, meta, cfg).map(|c| Box::new(c) as Box<dyn Component>)
}

const NOT_COMPILED: &str = "component is not compiled into this build";

fn create_unavailable(_cfg: &NluConfig) -> Result<Box<dyn Component>, PipelineSpecError> {
    Err(PipelineSpecError::new(ErrorCode::MissingPackage, "", NOT_COMPILED))
}

fn load_unavailable(
    _model_dir: &Path,
    _meta: &ComponentMetadata,
    _cfg: &NluConfig,
) -> Result<Box<dyn Component>, PipelineRuntimeError> {
    Err(PipelineRuntimeError::new(ErrorCode::MissingPackage, "", "", NOT_COMPILED))
}

/// Type-erased constructors for one component type.
#[derive(Clone, Copy)]
pub struct ComponentEntry {
    pub spec: ComponentSpec,
    create: CreateFn,
    load: LoadFn,
}

impl ComponentEntry {
    pub fn of<T: ComponentFactory>() -> Self {
        Self {
            spec: T::SPEC,
            create: create_boxed::<T>,
            load: load_boxed::<T>,
        }
    }

    /// A known component whose implementation is compiled out. Validation
    /// still sees its spec; constructing it fails with `missing_package`.
    pub fn unavailable(spec: ComponentSpec) -> Self {
        Self {
            spec,
            create: create_unavailable,
            load: load_unavailable,
        }
    }

    pub fn create(&self, cfg: &NluConfig) -> Result<Box<dyn Component>, PipelineSpecError> {
        (self.create)(cfg)
    }

    pub fn load(
        &self,
        model_dir: &Path,
        meta: &ComponentMetadata,
        cfg: &NluConfig,
    ) -> Result<Box<dyn Component>, PipelineRuntimeError> {
        (self.load)(model_dir, meta, cfg)
    }
}

impl fmt::Debug for ComponentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentEntry").field("spec", &self.spec).finish()
    }
}

/// Name → component constructors.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    entries: FxHashMap<&'static str, ComponentEntry>,
}

impl ComponentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every component shipped with this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<WhitespaceTokenizer>();
        registry.register::<RuleTokenizer>();
        #[cfg(feature = "segmenter")]
        registry.register::<JiebaTokenizer>();
        #[cfg(not(feature = "segmenter"))]
        registry.insert(ComponentEntry::unavailable(JIEBA_TOKENIZER));
        registry.register::<FeatureProvider>();
        registry.register::<GazetteerExtractor>();
        registry.register::<SynonymMapper>();
        registry.register::<KeywordIntentClassifier>();
        registry
    }

    /// Add (or replace) a component type under its spec name.
    pub fn register<T: ComponentFactory>(&mut self) -> &mut Self {
        self.insert(ComponentEntry::of::<T>())
    }

    /// Add (or replace) an entry under its spec name.
    pub fn insert(&mut self, entry: ComponentEntry) -> &mut Self {
        self.entries.insert(entry.spec.name, entry);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ComponentEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

// ─── External packages ──────────────────────────────────────────────────────

/// Answers whether an external package is usable in this process.
pub trait PackageAvailability: Send + Sync {
    fn is_available(&self, package: &str) -> bool;
}

/// Packages compiled into this build, one cargo feature each.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompiledPackages;

impl PackageAvailability for CompiledPackages {
    fn is_available(&self, package: &str) -> bool {
        match package {
            "segmenter" => cfg!(feature = "segmenter"),
            _ => false,
        }
    }
}

impl<F> PackageAvailability for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_available(&self, package: &str) -> bool {
        self(package)
    }
}
