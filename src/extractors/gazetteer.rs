//! Token-sequence gazetteer entity extractor (`ner_gazetteer`).
//!
//! Training collects the normalised token sequence of every labelled entity.
//! Processing scans the message left to right and emits the longest known
//! sequence at each position.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::NluConfig;
use crate::message::{Message, ENTITIES, TOKENS};
use crate::nlp::features::{FeatureExtractor, FEATURE_EXTRACTOR};
use crate::pipeline::artifacts::{load_artifact, persist_artifact};
use crate::pipeline::error_code::ErrorCode;
use crate::pipeline::errors::{PipelineRuntimeError, PipelineSpecError, TrainingDataError};
use crate::pipeline::traits::{
    align_entity, Component, ComponentFactory, ComponentMetadata, ComponentSpec, EntityExtractor,
    PipelineContext, TrainingReport,
};
use crate::training_data::TrainingData;
use crate::types::{char_slice, Entity, Token};

const MODEL_KEY: &str = "entity_extractor_file";
const MODEL_FILE: &str = "entity_extractor.json";
const DIMENSIONS_KEY: &str = "dimensions";

/// One known surface form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerEntry {
    /// Normalised tokens.
    pub tokens: Vec<String>,
    pub entity: String,
    /// Number of training annotations that agreed on this label.
    pub count: usize,
}

/// Entries ordered longest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerModel {
    pub entries: Vec<GazetteerEntry>,
}

impl GazetteerModel {
    /// Build from `(tokens, label)` observations. A surface form seen with
    /// several labels keeps the most frequent one (ties: smallest label).
    fn from_observations<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (Vec<String>, String)>,
    {
        let mut grouped: BTreeMap<Vec<String>, BTreeMap<String, usize>> = BTreeMap::new();
        for (tokens, label) in observations {
            *grouped.entry(tokens).or_default().entry(label).or_default() += 1;
        }

        let mut entries: Vec<GazetteerEntry> = grouped
            .into_iter()
            .filter_map(|(tokens, labels)| {
                let (entity, count) = labels
                    .into_iter()
                    .max_by(|(la, ca), (lb, cb)| ca.cmp(cb).then_with(|| lb.cmp(la)))?;
                Some(GazetteerEntry {
                    tokens,
                    entity,
                    count,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.tokens
                .len()
                .cmp(&a.tokens.len())
                .then_with(|| a.tokens.cmp(&b.tokens))
        });
        Self { entries }
    }

    /// Longest entry matching `normalized` at position `i`.
    fn match_at(&self, normalized: &[String], i: usize) -> Option<&GazetteerEntry> {
        self.entries.iter().find(|entry| {
            !entry.tokens.is_empty()
                && normalized
                    .get(i..i + entry.tokens.len())
                    .is_some_and(|window| window == entry.tokens.as_slice())
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GazetteerExtractor {
    model: Option<GazetteerModel>,
    dimensions: Vec<String>,
}

impl GazetteerExtractor {
    fn new(cfg: &NluConfig) -> Self {
        Self {
            model: None,
            dimensions: cfg.dimensions.clone(),
        }
    }

    pub fn model(&self) -> Option<&GazetteerModel> {
        self.model.as_ref()
    }

    fn allows(&self, label: &str) -> bool {
        self.dimensions.is_empty() || self.dimensions.iter().any(|d| d == label)
    }

    fn features<'c>(ctx: &'c PipelineContext) -> Result<&'c FeatureExtractor, PipelineRuntimeError> {
        ctx.get::<FeatureExtractor>(FEATURE_EXTRACTOR).ok_or_else(|| {
            PipelineRuntimeError::stage(
                ErrorCode::MissingContext,
                Self::SPEC.name,
                "no feature extractor in the pipeline context",
            )
            .with_hint("Add nlp_features before ner_gazetteer")
        })
    }

    fn extract(&self, model: &GazetteerModel, text: &str, tokens: &[Token], features: &FeatureExtractor) -> Vec<Entity> {
        let normalized: Vec<String> = tokens.iter().map(|t| features.normalize(&t.text)).collect();
        let mut found = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let Some(entry) = model.match_at(&normalized, i) else {
                i += 1;
                continue;
            };
            let first = &tokens[i];
            let last = &tokens[i + entry.tokens.len() - 1];
            if self.allows(&entry.entity) {
                let value = char_slice(text, first.offset, last.end).unwrap_or(&first.text);
                found.push(Entity::new(first.offset, last.end, value, entry.entity.clone()));
            }
            i += entry.tokens.len();
        }
        found
    }
}

impl EntityExtractor for GazetteerExtractor {}

impl Component for GazetteerExtractor {
    fn spec(&self) -> ComponentSpec {
        Self::SPEC
    }

    fn train(
        &mut self,
        data: &mut TrainingData,
        _cfg: &NluConfig,
        ctx: &PipelineContext,
        report: &mut TrainingReport,
    ) -> Result<(), PipelineRuntimeError> {
        let features = Self::features(ctx)?;
        let mut observations = Vec::new();

        for (idx, example) in data.training_examples.iter().enumerate() {
            let tokens = example.tokens().unwrap_or(&[]);
            for entity in example.entities() {
                match align_entity(entity, tokens) {
                    Ok((start, end)) => {
                        let key: Vec<String> = tokens[start..end]
                            .iter()
                            .map(|t| features.normalize(&t.text))
                            .collect();
                        observations.push((key, entity.entity.clone()));
                    }
                    Err(reason) => report.warn(TrainingDataError {
                        component: Self::SPEC.name.to_string(),
                        example: idx,
                        text: example.text().to_string(),
                        entity: entity.describe(),
                        reason: reason.to_string(),
                    }),
                }
            }
        }

        if observations.is_empty() {
            tracing::info!("No usable entity examples, ner_gazetteer stays untrained");
            self.model = None;
            return Ok(());
        }
        let model = GazetteerModel::from_observations(observations);
        tracing::debug!(entries = model.len(), "Trained gazetteer");
        self.model = Some(model);
        Ok(())
    }

    fn process(&self, message: &mut Message, ctx: &PipelineContext) -> Result<(), PipelineRuntimeError> {
        let features = Self::features(ctx)?;
        let found = match &self.model {
            Some(model) => {
                let tokens = message.tokens().unwrap_or(&[]);
                self.extract(model, message.text(), tokens, features)
            }
            None => Vec::new(),
        };
        message.append_entities(self.add_extractor_name(found));
        Ok(())
    }

    fn persist(&self, model_dir: &Path) -> Result<ComponentMetadata, PipelineRuntimeError> {
        let mut meta = persist_artifact(model_dir, Self::SPEC.name, MODEL_KEY, MODEL_FILE, self.model.as_ref())?;
        meta.insert(DIMENSIONS_KEY.to_string(), serde_json::json!(self.dimensions));
        Ok(meta)
    }
}

impl ComponentFactory for GazetteerExtractor {
    const SPEC: ComponentSpec = ComponentSpec::new("ner_gazetteer")
        .provides(&[ENTITIES])
        .requires(&[TOKENS]);

    fn create(cfg: &NluConfig) -> Result<Self, PipelineSpecError> {
        Ok(Self::new(cfg))
    }

    /// Restores the model and the `dimensions` it was trained with; the
    /// caller's config does not change what a trained model emits.
    fn load(model_dir: &Path, meta: &ComponentMetadata, _cfg: &NluConfig) -> Result<Self, PipelineRuntimeError> {
        let dimensions = match meta.get(DIMENSIONS_KEY) {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                PipelineRuntimeError::stage(
                    ErrorCode::LoadFailed,
                    Self::SPEC.name,
                    format!("invalid \"{DIMENSIONS_KEY}\" in metadata: {e}"),
                )
            })?,
            None => Vec::new(),
        };
        Ok(Self {
            model: load_artifact(model_dir, meta, Self::SPEC.name, MODEL_KEY)?,
            dimensions,
        })
    }
}
