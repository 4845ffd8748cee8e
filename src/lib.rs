//! # mynlu
//!
//! Composable natural-language-understanding pipelines.
//!
//! A pipeline is an ordered list of named components (tokenizers, entity
//! extractors, intent classifiers) resolved from layered configuration.
//! The same list is trained on labelled examples, persisted to a model
//! directory, reloaded, and run on new utterances.
//!
//! ## Features
//!
//! - **Checked assembly**: every component's required keys must be provided
//!   by an earlier component, or the pipeline is rejected before it runs
//! - **Layered configuration**: defaults, JSON file, `MYNLU_*` environment
//!   variables and command-line values, later layers winning
//! - **Offset-exact tokens**: token offsets always index the original text
//! - **Concurrent inference**: loaded pipelines are `Send + Sync`
//!
//! ```rust,ignore
//! use mynlu::{ConfigLoader, Interpreter, Trainer, TrainingData};
//!
//! let cfg = ConfigLoader::new().with_file("config.json").load()?;
//! let mut data = TrainingData::load("data/examples.json")?;
//! let model_dir = Trainer::new(cfg.clone())?.train(&mut data)?.persist(None)?;
//!
//! let interpreter = Interpreter::load(&model_dir, &cfg)?;
//! println!("{}", interpreter.parse_output("fly to berlin")?);
//! ```

pub mod classifiers;
pub mod config;
pub mod errors;
pub mod extractors;
pub mod message;
pub mod nlp;
pub mod pipeline;
pub mod training_data;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigLoader, NluConfig};
pub use errors::{NluError, Result};
pub use message::{Annotation, Message};
pub use training_data::TrainingData;
pub use types::{Entity, Intent, Token};

pub use pipeline::error_code::ErrorCode;
pub use pipeline::errors::{PipelineRuntimeError, PipelineSpecError, TrainingDataError};
pub use pipeline::validation::{ValidationEngine, ValidationReport};
pub use pipeline::{
    Component, ComponentFactory, ComponentRegistry, ComponentSpec, Interpreter, PipelineBuilder,
    PipelineContext, TrainedPipeline, Trainer,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
