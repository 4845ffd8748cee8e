//! Inference mode: restore a persisted pipeline and annotate messages.

use std::path::Path;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::NluConfig;
use crate::errors::Result;
use crate::message::{Message, ENTITIES, INTENT};

use super::builder::PipelineBuilder;
use super::errors::PipelineRuntimeError;
use super::metadata::Metadata;
use super::observer::{NoopObserver, PipelineObserver, StageClock, StagePhase};
use super::traits::{Component, PipelineContext};

/// Pool for `parse_batch`, built once per interpreter. `None` runs batches
/// on the caller's thread (one thread) or on rayon's global pool (build
/// failure).
fn batch_pool(num_threads: usize) -> Option<ThreadPool> {
    if num_threads <= 1 {
        return None;
    }
    match ThreadPoolBuilder::new().num_threads(num_threads).build() {
        Ok(pool) => Some(pool),
        Err(err) => {
            tracing::warn!("Failed to build a {num_threads}-thread pool ({err}), using the global pool");
            None
        }
    }
}

/// A loaded pipeline, ready to process messages.
///
/// `process` borrows the interpreter immutably, so one instance can serve
/// many threads at once.
#[derive(Debug)]
pub struct Interpreter {
    components: Vec<Box<dyn Component>>,
    context: PipelineContext,
    config: NluConfig,
    pool: Option<ThreadPool>,
}

impl Interpreter {
    /// Wrap already constructed components; rebuilds the shared context.
    pub fn new(components: Vec<Box<dyn Component>>, config: NluConfig) -> Self {
        let mut context = PipelineContext::new();
        for component in &components {
            component.provide_context(&mut context);
        }
        let pool = batch_pool(config.num_threads);
        Self {
            components,
            context,
            config,
            pool,
        }
    }

    /// Restore the model in `model_dir` with the built-in components.
    pub fn load(model_dir: impl AsRef<Path>, config: &NluConfig) -> Result<Self> {
        Self::load_with_builder(model_dir, config, &PipelineBuilder::new())
    }

    /// Restore the model in `model_dir`.
    ///
    /// The recorded pipeline is re-validated, then each component is
    /// restored from its persisted payload in training order. The recorded
    /// language and pipeline replace the ones in `config`.
    pub fn load_with_builder(
        model_dir: impl AsRef<Path>,
        config: &NluConfig,
        builder: &PipelineBuilder,
    ) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let metadata = Metadata::load(model_dir)?;

        let mut cfg = config.clone();
        cfg.language = metadata.language.clone();
        cfg.pipeline = metadata.pipeline.clone();
        builder.check(&cfg.pipeline, &cfg)?;

        let mut components = Vec::with_capacity(cfg.pipeline.len());
        for (idx, name) in cfg.pipeline.iter().enumerate() {
            let entry = builder.entry(idx, name)?;
            let payload = metadata.component_payload(idx);
            let component = entry
                .load(model_dir, &payload, &cfg)
                .map_err(|e| e.at(idx))?;
            components.push(component);
        }
        tracing::info!(
            path = %model_dir.display(),
            trained_at = %metadata.trained_at,
            components = components.len(),
            "Loaded model"
        );
        Ok(Self::new(components, cfg))
    }

    pub fn config(&self) -> &NluConfig {
        &self.config
    }

    /// Threads `parse_batch` spreads work over.
    pub fn batch_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None if self.config.num_threads <= 1 => 1,
            None => rayon::current_num_threads(),
        }
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    pub fn process(&self, message: &mut Message) -> std::result::Result<(), PipelineRuntimeError> {
        self.process_with_observer(message, &mut NoopObserver)
    }

    /// Run every component on `message` in order.
    ///
    /// Stops at the first failing component; the message keeps whatever
    /// earlier components set.
    pub fn process_with_observer(
        &self,
        message: &mut Message,
        observer: &mut impl PipelineObserver,
    ) -> std::result::Result<(), PipelineRuntimeError> {
        for (idx, component) in self.components.iter().enumerate() {
            let name = component.name();
            trace_stage!(name);
            observer.on_stage_start(name, StagePhase::Process);
            let clock = StageClock::start();
            let outcome = component.process(message, &self.context);
            observer.on_stage_end(&clock.finish(name, StagePhase::Process, outcome.is_ok()));
            outcome.map_err(|e| e.at(idx))?;
        }
        Ok(())
    }

    /// Annotate a fresh message built from `text`.
    pub fn parse(&self, text: &str) -> Result<Message> {
        let mut message = Message::new(text);
        self.process(&mut message)?;
        Ok(message)
    }

    /// JSON result of [`Interpreter::parse`]: `text`, every output key, and
    /// `intent: null` / `entities: []` when nothing set them.
    pub fn parse_output(&self, text: &str) -> Result<serde_json::Value> {
        let message = self.parse(text)?;
        let mut output = message.as_output();
        if let serde_json::Value::Object(map) = &mut output {
            map.entry(INTENT).or_insert(serde_json::Value::Null);
            map.entry(ENTITIES)
                .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        }
        Ok(output)
    }

    /// Parse independent texts, concurrently when `num_threads > 1`.
    ///
    /// Results keep input order; one failing text does not affect others.
    pub fn parse_batch<S>(&self, texts: &[S]) -> Vec<Result<Message>>
    where
        S: AsRef<str> + Sync,
    {
        if self.config.num_threads <= 1 {
            return texts.iter().map(|t| self.parse(t.as_ref())).collect();
        }
        let run = || texts.par_iter().map(|t| self.parse(t.as_ref())).collect();
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}
