//! Pipeline assembly, validation, and execution.
//!
//! ## Submodules
//!
//! - [`artifacts`]: JSON files written by trainable components
//! - [`traits`]: the component contract and shared context
//! - [`registry`]: name → component constructors, package probing
//! - [`validation`]: rule engine producing a [`ValidationReport`]
//! - [`builder`]: validate and instantiate a component list
//! - [`trainer`]: training mode and persistence
//! - [`interpreter`]: loading and inference
//! - [`metadata`]: the on-disk model description
//! - [`observer`]: per-stage logging and timing hooks

/// Enter a tracing span for one component invocation.
macro_rules! trace_stage {
    ($name:expr) => {
        let _span = tracing::info_span!("pipeline_stage", stage = $name).entered();
    };
}

pub mod artifacts;
pub mod builder;
pub mod error_code;
pub mod errors;
pub mod interpreter;
pub mod metadata;
pub mod observer;
pub mod registry;
pub mod trainer;
pub mod traits;
pub mod validation;

pub use builder::PipelineBuilder;
pub use error_code::ErrorCode;
pub use errors::{PipelineRuntimeError, PipelineSpecError, TrainingDataError};
pub use interpreter::Interpreter;
pub use metadata::{ComponentRecord, Metadata, METADATA_FILE};
pub use observer::{NoopObserver, PipelineObserver, StagePhase, StageReport, StageTimingObserver};
pub use registry::{CompiledPackages, ComponentEntry, ComponentRegistry, PackageAvailability};
pub use trainer::{TrainedPipeline, Trainer};
pub use traits::{
    align_entity, Component, ComponentFactory, ComponentMetadata, ComponentSpec, EntityExtractor,
    PipelineContext, Tokenizer, TrainingReport,
};
pub use validation::{Severity, ValidationEngine, ValidationReport, ValidationRule};
