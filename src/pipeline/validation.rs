//! Validation engine for pipeline assembly.
//!
//! The engine runs all registered [`ValidationRule`]s against a
//! [`PipelinePlan`] (component names, config, registry, package availability) and
//! collects every diagnostic into a [`ValidationReport`]. It never
//! short-circuits, so a report lists every problem at once; the builder then
//! rejects the pipeline with the first error.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use mynlu::pipeline::validation::{PipelinePlan, ValidationEngine};
//!
//! let engine = ValidationEngine::with_defaults();
//! let report = engine.validate(&plan);
//! for err in report.errors() {
//!     eprintln!("{err}");
//! }
//! ```

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::config::NluConfig;

use super::error_code::ErrorCode;
use super::errors::{component_path, PipelineSpecError};
use super::registry::{ComponentRegistry, PackageAvailability};

// ─── Severity ───────────────────────────────────────────────────────────────

/// Whether a diagnostic is a hard error or a soft warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

// ─── Diagnostic ─────────────────────────────────────────────────────────────

/// A single validation finding.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: Severity,
    #[serde(flatten)]
    pub error: PipelineSpecError,
}

impl ValidationDiagnostic {
    pub fn error(err: PipelineSpecError) -> Self {
        Self {
            severity: Severity::Error,
            error: err,
        }
    }

    pub fn warning(err: PipelineSpecError) -> Self {
        Self {
            severity: Severity::Warning,
            error: err,
        }
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Collected diagnostics from running all validation rules.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &PipelineSpecError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| &d.error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &PipelineSpecError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| &d.error)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// No errors (warnings are acceptable).
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The error to reject a pipeline with: the one at the earliest
    /// component, in rule order for ties.
    pub fn first_error(&self) -> Option<&PipelineSpecError> {
        self.errors().min_by_key(|e| component_index(&e.path))
    }
}

/// Component position encoded in a `/pipeline/{i}` path; root-level paths
/// sort first.
fn component_index(path: &str) -> usize {
    path.strip_prefix("/pipeline/")
        .and_then(|rest| rest.split('/').next())
        .and_then(|idx| idx.parse::<usize>().ok())
        .map_or(0, |idx| idx + 1)
}

// ─── Plan ───────────────────────────────────────────────────────────────────

/// Everything a rule may inspect.
pub struct PipelinePlan<'a> {
    pub components: &'a [String],
    pub config: &'a NluConfig,
    pub registry: &'a ComponentRegistry,
    pub packages: &'a dyn PackageAvailability,
}

// ─── Rule trait ─────────────────────────────────────────────────────────────

/// A single validation rule that inspects a [`PipelinePlan`] and returns
/// zero or more diagnostics.
///
/// Rules are stateless and must be `Send + Sync` so they can be shared
/// across threads.
pub trait ValidationRule: Send + Sync {
    /// Short, stable identifier for this rule (e.g., `"requirement_chain"`).
    fn name(&self) -> &str;

    fn validate(&self, plan: &PipelinePlan<'_>) -> Vec<ValidationDiagnostic>;
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Runs a set of [`ValidationRule`]s against a [`PipelinePlan`].
pub struct ValidationEngine {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ValidationEngine {
    /// An engine with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// An engine pre-loaded with the default rule set.
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Box::new(EmptyPipelineRule));
        engine.add_rule(Box::new(KnownComponentsRule));
        engine.add_rule(Box::new(RequiredPackagesRule));
        engine.add_rule(Box::new(RequirementChainRule));
        engine.add_rule(Box::new(DuplicateComponentRule));
        engine.add_rule(Box::new(UnknownFieldsRule));
        engine
    }

    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run all rules against `plan` and return the collected report.
    pub fn validate(&self, plan: &PipelinePlan<'_>) -> ValidationReport {
        let mut report = ValidationReport::default();
        for rule in &self.rules {
            report.diagnostics.extend(rule.validate(plan));
        }
        report
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Concrete rules
// ═══════════════════════════════════════════════════════════════════════════

// ─── 1. an empty pipeline does nothing ──────────────────────────────────────

struct EmptyPipelineRule;

impl ValidationRule for EmptyPipelineRule {
    fn name(&self) -> &str {
        "empty_pipeline"
    }

    fn validate(&self, plan: &PipelinePlan<'_>) -> Vec<ValidationDiagnostic> {
        if !plan.components.is_empty() {
            return Vec::new();
        }
        vec![ValidationDiagnostic::warning(
            PipelineSpecError::new(ErrorCode::InvalidValue, "/pipeline", "pipeline has no components")
                .with_hint("Name a pipeline template or list components explicitly"),
        )]
    }
}

// ─── 2. every name must be registered ───────────────────────────────────────

struct KnownComponentsRule;

impl ValidationRule for KnownComponentsRule {
    fn name(&self) -> &str {
        "known_components"
    }

    fn validate(&self, plan: &PipelinePlan<'_>) -> Vec<ValidationDiagnostic> {
        plan.components
            .iter()
            .enumerate()
            .filter(|(_, name)| !plan.registry.contains(name))
            .map(|(idx, name)| {
                ValidationDiagnostic::error(
                    PipelineSpecError::new(
                        ErrorCode::UnknownComponent,
                        component_path(idx),
                        format!("unknown component \"{name}\""),
                    )
                    .with_hint(format!(
                        "Known components: {}",
                        plan.registry.names().join(", ")
                    )),
                )
            })
            .collect()
    }
}

// ─── 3. required packages must be importable ────────────────────────────────

struct RequiredPackagesRule;

impl ValidationRule for RequiredPackagesRule {
    fn name(&self) -> &str {
        "required_packages"
    }

    fn validate(&self, plan: &PipelinePlan<'_>) -> Vec<ValidationDiagnostic> {
        let mut out = Vec::new();
        for (idx, name) in plan.components.iter().enumerate() {
            let Some(entry) = plan.registry.get(name) else {
                continue;
            };
            for package in entry.spec.required_packages {
                if !plan.packages.is_available(package) {
                    out.push(ValidationDiagnostic::error(
                        PipelineSpecError::new(
                            ErrorCode::MissingPackage,
                            component_path(idx),
                            format!("{name} needs package \"{package}\", which is not available"),
                        )
                        .with_hint(format!("Build with the \"{package}\" feature enabled")),
                    ));
                }
            }
        }
        out
    }
}

// ─── 4. requires ⊆ provides of earlier components ───────────────────────────

struct RequirementChainRule;

impl ValidationRule for RequirementChainRule {
    fn name(&self) -> &str {
        "requirement_chain"
    }

    fn validate(&self, plan: &PipelinePlan<'_>) -> Vec<ValidationDiagnostic> {
        let mut provided: FxHashSet<&str> = FxHashSet::default();
        let mut out = Vec::new();
        for (idx, name) in plan.components.iter().enumerate() {
            let Some(entry) = plan.registry.get(name) else {
                continue;
            };
            for required in entry.spec.requires {
                if !provided.contains(required) {
                    out.push(ValidationDiagnostic::error(
                        PipelineSpecError::new(
                            ErrorCode::MissingRequirement,
                            component_path(idx),
                            format!(
                                "{name} requires \"{required}\", which no earlier component provides"
                            ),
                        )
                        .with_hint(format!(
                            "Add a component that provides \"{required}\" before {name}"
                        )),
                    ));
                }
            }
            provided.extend(entry.spec.provides.iter().copied());
        }
        out
    }
}

// ─── 5. repeated components (warning) ───────────────────────────────────────

struct DuplicateComponentRule;

impl ValidationRule for DuplicateComponentRule {
    fn name(&self) -> &str {
        "duplicate_component"
    }

    fn validate(&self, plan: &PipelinePlan<'_>) -> Vec<ValidationDiagnostic> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        plan.components
            .iter()
            .enumerate()
            .filter(|(_, name)| !seen.insert(name.as_str()))
            .map(|(idx, name)| {
                ValidationDiagnostic::warning(
                    PipelineSpecError::new(
                        ErrorCode::DuplicateComponent,
                        component_path(idx),
                        format!("{name} appears more than once"),
                    )
                    .with_hint("Later instances overwrite annotations of earlier ones"),
                )
            })
            .collect()
    }
}

// ─── 6. unrecognised config keys (warning) ──────────────────────────────────

struct UnknownFieldsRule;

impl ValidationRule for UnknownFieldsRule {
    fn name(&self) -> &str {
        "unknown_fields"
    }

    fn validate(&self, plan: &PipelinePlan<'_>) -> Vec<ValidationDiagnostic> {
        let mut keys: Vec<&String> = plan.config.extra.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                ValidationDiagnostic::warning(
                    PipelineSpecError::new(
                        ErrorCode::UnknownField,
                        format!("/{key}"),
                        format!("unrecognized field \"{key}\""),
                    )
                    .with_hint("Check spelling or remove this field"),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::registry::CompiledPackages;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run(components: &[&str], config: &NluConfig, packages: &dyn PackageAvailability) -> ValidationReport {
        let registry = ComponentRegistry::with_builtins();
        let components = names(components);
        let plan = PipelinePlan {
            components: &components,
            config,
            registry: &registry,
            packages,
        };
        ValidationEngine::with_defaults().validate(&plan)
    }

    #[test]
    fn test_template_pipelines_are_valid() {
        let cfg = NluConfig::default();
        let report = run(
            &["nlp_features", "tokenizer_rule", "ner_gazetteer", "ner_synonyms", "intent_classifier_keyword"],
            &cfg,
            &CompiledPackages,
        );
        assert!(report.is_valid(), "{:?}", report.diagnostics);
        assert!(report.is_empty());
    }

    #[test]
    fn test_unknown_component_is_error() {
        let cfg = NluConfig::default();
        let report = run(&["tokenizer_whitespace", "ner_magic"], &cfg, &CompiledPackages);
        let err = report.first_error().unwrap();
        assert_eq!(err.code, ErrorCode::UnknownComponent);
        assert_eq!(err.path, "/pipeline/1");
    }

    #[test]
    fn test_requirement_before_provider_fails() {
        let cfg = NluConfig::default();
        let report = run(&["intent_classifier_keyword", "tokenizer_whitespace"], &cfg, &CompiledPackages);
        let err = report.first_error().unwrap();
        assert_eq!(err.code, ErrorCode::MissingRequirement);
        assert_eq!(err.path, "/pipeline/0");
        assert!(err.message.contains("\"tokens\""));
    }

    #[test]
    fn test_first_error_is_earliest_component() {
        let cfg = NluConfig::default();
        // index 0 misses tokens (chain rule), index 1 is unknown (earlier rule)
        let report = run(&["ner_gazetteer", "ner_magic"], &cfg, &CompiledPackages);
        assert_eq!(report.errors().count(), 2);
        assert_eq!(report.first_error().unwrap().path, "/pipeline/0");
    }

    #[test]
    fn test_missing_package_is_error() {
        let cfg = NluConfig::default().with_language("zh");
        let nothing = |_: &str| false;
        let report = run(&["tokenizer_jieba"], &cfg, &nothing);
        let err = report.first_error().unwrap();
        assert_eq!(err.code, ErrorCode::MissingPackage);
        assert!(err.message.contains("segmenter"));
    }

    #[test]
    fn test_duplicates_and_unknown_fields_are_warnings() {
        let mut cfg = NluConfig::default();
        cfg.extra.insert("emulate".into(), serde_json::json!("wit"));
        let report = run(&["tokenizer_whitespace", "tokenizer_whitespace"], &cfg, &CompiledPackages);
        assert!(report.is_valid());
        let codes: Vec<ErrorCode> = report.warnings().map(|w| w.code).collect();
        assert_eq!(codes, [ErrorCode::DuplicateComponent, ErrorCode::UnknownField]);
    }

    #[test]
    fn test_empty_pipeline_warns() {
        let report = run(&[], &NluConfig::default(), &CompiledPackages);
        assert!(report.is_valid());
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_report_serializes_with_severity() {
        let report = run(&["ner_magic"], &NluConfig::default(), &CompiledPackages);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["diagnostics"][0]["severity"], "error");
        assert_eq!(json["diagnostics"][0]["code"], "unknown_component");
    }

    #[test]
    fn test_custom_rule() {
        struct NoJieba;
        impl ValidationRule for NoJieba {
            fn name(&self) -> &str {
                "no_jieba"
            }
            fn validate(&self, plan: &PipelinePlan<'_>) -> Vec<ValidationDiagnostic> {
                plan.components
                    .iter()
                    .filter(|c| c.as_str() == "tokenizer_jieba")
                    .map(|_| {
                        ValidationDiagnostic::error(PipelineSpecError::new(
                            ErrorCode::InvalidValue,
                            "",
                            "jieba disabled",
                        ))
                    })
                    .collect()
            }
        }
        let mut engine = ValidationEngine::new();
        engine.add_rule(Box::new(NoJieba));
        assert_eq!(engine.rule_names(), ["no_jieba"]);

        let registry = ComponentRegistry::with_builtins();
        let components = names(&["tokenizer_jieba"]);
        let cfg = NluConfig::default();
        let plan = PipelinePlan {
            components: &components,
            config: &cfg,
            registry: &registry,
            packages: &CompiledPackages,
        };
        assert!(engine.validate(&plan).has_errors());
    }
}
