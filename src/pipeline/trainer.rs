//! Training mode: run every component's `train` in order, then persist.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::config::NluConfig;
use crate::errors::{NluError, Result};
use crate::training_data::TrainingData;

use super::builder::PipelineBuilder;
use super::interpreter::Interpreter;
use super::metadata::{ComponentRecord, Metadata};
use super::observer::{NoopObserver, PipelineObserver, StageClock, StagePhase};
use super::traits::{Component, PipelineContext, TrainingReport};

/// Owns a freshly built pipeline until it has been trained.
#[derive(Debug)]
pub struct Trainer {
    config: NluConfig,
    components: Vec<Box<dyn Component>>,
}

impl Trainer {
    /// Build `config.pipeline` with the default builder.
    pub fn new(config: NluConfig) -> Result<Self> {
        Self::with_builder(config, &PipelineBuilder::new())
    }

    pub fn with_builder(config: NluConfig, builder: &PipelineBuilder) -> Result<Self> {
        config.validate()?;
        let components = builder.build(&config.pipeline, &config)?;
        Ok(Self { config, components })
    }

    pub fn config(&self) -> &NluConfig {
        &self.config
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    pub fn train(self, data: &mut TrainingData) -> Result<TrainedPipeline> {
        self.train_with_observer(data, &mut NoopObserver)
    }

    /// Train on the file named by the `data` option.
    pub fn train_from_config(self) -> Result<TrainedPipeline> {
        let Some(path) = self.config.data.clone() else {
            return Err(NluError::config(
                "no training data configured; set \"data\" to a training data file",
            ));
        };
        tracing::info!(path = %path.display(), "Reading training data");
        let mut data = TrainingData::load(&path)?;
        self.train(&mut data)
    }

    /// Train every component in pipeline order.
    ///
    /// Each component first contributes to the shared context, then trains
    /// on `data`; annotations it attaches to the examples are visible to
    /// the components after it.
    pub fn train_with_observer(
        mut self,
        data: &mut TrainingData,
        observer: &mut impl PipelineObserver,
    ) -> Result<TrainedPipeline> {
        let mut context = PipelineContext::new();
        let mut report = TrainingReport::default();
        tracing::info!(
            examples = data.len(),
            components = self.components.len(),
            "Training pipeline"
        );

        for (idx, component) in self.components.iter_mut().enumerate() {
            let name = component.name();
            trace_stage!(name);
            observer.on_stage_start(name, StagePhase::Train);
            let clock = StageClock::start();

            tracing::info!("Starting to train component {name}");
            component.provide_context(&mut context);
            let outcome = component.train(data, &self.config, &context, &mut report);
            observer.on_stage_end(&clock.finish(name, StagePhase::Train, outcome.is_ok()));
            outcome.map_err(|e| e.at(idx))?;
            tracing::info!("Finished training component {name}");
        }

        if !report.is_clean() {
            tracing::warn!(
                skipped = report.warnings.len(),
                "Training finished with skipped annotations"
            );
        }
        Ok(TrainedPipeline {
            config: self.config,
            components: self.components,
            report,
        })
    }
}

/// A trained, in-memory pipeline.
#[derive(Debug)]
pub struct TrainedPipeline {
    config: NluConfig,
    components: Vec<Box<dyn Component>>,
    report: TrainingReport,
}

impl TrainedPipeline {
    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    pub fn config(&self) -> &NluConfig {
        &self.config
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Directory name a persist call would create under the model root.
    pub fn model_dir_name(&self) -> String {
        if let Some(fixed) = &self.config.fixed_model_name {
            return fixed.clone();
        }
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        match &self.config.name {
            Some(project) => format!("{project}_model_{stamp}"),
            None => format!("model_{stamp}"),
        }
    }

    /// Persist every component and `metadata.json`.
    ///
    /// Writes under `path`, or under the configured model root when `None`.
    /// Returns the created model directory.
    pub fn persist(&self, path: Option<&Path>) -> Result<PathBuf> {
        self.persist_with_observer(path, &mut NoopObserver)
    }

    pub fn persist_with_observer(
        &self,
        path: Option<&Path>,
        observer: &mut impl PipelineObserver,
    ) -> Result<PathBuf> {
        let root = path.map_or_else(|| self.config.path.clone(), Path::to_path_buf);
        let dir = root.join(self.model_dir_name());
        std::fs::create_dir_all(&dir).map_err(|e| NluError::io(&dir, e))?;

        let mut metadata = Metadata::new(&self.config.language, self.config.pipeline.clone());
        for (idx, component) in self.components.iter().enumerate() {
            let name = component.name();
            trace_stage!(name);
            observer.on_stage_start(name, StagePhase::Persist);
            let clock = StageClock::start();
            let outcome = component.persist(&dir);
            observer.on_stage_end(&clock.finish(name, StagePhase::Persist, outcome.is_ok()));
            let payload = outcome.map_err(|e| e.at(idx))?;
            metadata.components.push(ComponentRecord {
                name: name.to_string(),
                payload,
            });
        }
        metadata.persist(&dir)?;
        tracing::info!(path = %dir.display(), "Persisted model");
        Ok(dir)
    }

    /// Serve the trained components directly, without a disk round trip.
    pub fn interpreter(self) -> Interpreter {
        Interpreter::new(self.components, self.config)
    }
}
