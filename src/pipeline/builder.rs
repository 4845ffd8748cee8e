//! Assemble a component pipeline from names.

use std::fmt;

use crate::config::NluConfig;

use super::error_code::ErrorCode;
use super::errors::{component_path, PipelineSpecError};
use super::registry::{CompiledPackages, ComponentEntry, ComponentRegistry, PackageAvailability};
use super::traits::Component;
use super::validation::{PipelinePlan, ValidationEngine, ValidationReport};

/// Validates a component list and instantiates it.
///
/// Validation runs before any component is constructed, so a rejected
/// pipeline has no side effects.
pub struct PipelineBuilder {
    registry: ComponentRegistry,
    packages: Box<dyn PackageAvailability>,
    engine: ValidationEngine,
}

impl PipelineBuilder {
    /// Built-in components, compiled-in packages, default rules.
    pub fn new() -> Self {
        Self {
            registry: ComponentRegistry::with_builtins(),
            packages: Box::new(CompiledPackages),
            engine: ValidationEngine::with_defaults(),
        }
    }

    pub fn with_registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_packages(mut self, packages: impl PackageAvailability + 'static) -> Self {
        self.packages = Box::new(packages);
        self
    }

    pub fn with_engine(mut self, engine: ValidationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Every diagnostic for `components` under `cfg`.
    pub fn validate(&self, components: &[String], cfg: &NluConfig) -> ValidationReport {
        let plan = PipelinePlan {
            components,
            config: cfg,
            registry: &self.registry,
            packages: self.packages.as_ref(),
        };
        self.engine.validate(&plan)
    }

    /// Validate, then construct fresh instances in order.
    ///
    /// Warnings are logged. The first error (by component position) rejects
    /// the whole pipeline.
    pub fn build(
        &self,
        components: &[String],
        cfg: &NluConfig,
    ) -> Result<Vec<Box<dyn Component>>, PipelineSpecError> {
        self.check(components, cfg)?;
        components
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let entry = self.entry(idx, name)?;
                entry.create(cfg).map_err(|e| at_component(e, idx))
            })
            .collect()
    }

    /// Validate only; log warnings and return the first error.
    pub fn check(&self, components: &[String], cfg: &NluConfig) -> Result<(), PipelineSpecError> {
        let report = self.validate(components, cfg);
        for warning in report.warnings() {
            tracing::warn!(code = %warning.code, path = %warning.path, "{}", warning.message);
        }
        match report.first_error() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub(crate) fn entry(
        &self,
        idx: usize,
        name: &str,
    ) -> Result<&ComponentEntry, PipelineSpecError> {
        self.registry.get(name).ok_or_else(|| {
            PipelineSpecError::new(
                ErrorCode::UnknownComponent,
                component_path(idx),
                format!("unknown component \"{name}\""),
            )
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("components", &self.registry.names())
            .field("rules", &self.engine.rule_names())
            .finish()
    }
}

fn at_component(mut err: PipelineSpecError, idx: usize) -> PipelineSpecError {
    if err.path.is_empty() {
        err.path = component_path(idx);
    }
    err
}
