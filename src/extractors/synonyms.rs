//! Entity value normalisation (`ner_synonyms`).

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::NluConfig;
use crate::message::{Message, ENTITIES};
use crate::pipeline::artifacts::{load_artifact, persist_artifact};
use crate::pipeline::errors::{PipelineRuntimeError, PipelineSpecError};
use crate::pipeline::traits::{
    Component, ComponentFactory, ComponentMetadata, ComponentSpec, PipelineContext, TrainingReport,
};
use crate::training_data::TrainingData;

const MODEL_KEY: &str = "synonyms_file";
const MODEL_FILE: &str = "entity_synonyms.json";

/// Replaces extracted entity values with their canonical form.
///
/// Mappings come from the explicit `entity_synonyms` section of the
/// training data and from annotations whose value differs from the text
/// they cover. Lookup is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct SynonymMapper {
    /// Lower-cased surface form → canonical value.
    synonyms: BTreeMap<String, String>,
}

impl SynonymMapper {
    pub fn new<I, K, V>(synonyms: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut mapper = Self::default();
        for (surface, canonical) in synonyms {
            mapper.add(surface.as_ref(), canonical);
        }
        mapper
    }

    fn add(&mut self, surface: &str, canonical: impl Into<String>) {
        let surface = surface.to_lowercase();
        let canonical = canonical.into();
        if let Some(previous) = self.synonyms.get(&surface) {
            if *previous != canonical {
                tracing::warn!(
                    "Synonym '{surface}' maps to '{previous}' and '{canonical}', keeping '{canonical}'"
                );
            }
        }
        self.synonyms.insert(surface, canonical);
    }

    pub fn canonical(&self, value: &str) -> Option<&str> {
        self.synonyms.get(&value.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.synonyms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synonyms.is_empty()
    }
}

impl Component for SynonymMapper {
    fn spec(&self) -> ComponentSpec {
        Self::SPEC
    }

    fn train(
        &mut self,
        data: &mut TrainingData,
        _cfg: &NluConfig,
        _ctx: &PipelineContext,
        _report: &mut TrainingReport,
    ) -> Result<(), PipelineRuntimeError> {
        for (surface, canonical) in &data.entity_synonyms {
            self.add(surface, canonical.clone());
        }
        let implicit: Vec<(String, String)> = data.implicit_synonyms().collect();
        for (surface, canonical) in implicit {
            self.add(&surface, canonical);
        }
        tracing::debug!(synonyms = self.synonyms.len(), "Collected entity synonyms");
        Ok(())
    }

    fn process(&self, message: &mut Message, _ctx: &PipelineContext) -> Result<(), PipelineRuntimeError> {
        let Some(entities) = message.entities_mut() else {
            return Ok(());
        };
        for entity in entities.iter_mut() {
            let Some(canonical) = self.canonical(&entity.value) else {
                continue;
            };
            if canonical != entity.value {
                entity.value = canonical.to_string();
                entity.processors.push(Self::SPEC.name.to_string());
            }
        }
        Ok(())
    }

    fn persist(&self, model_dir: &Path) -> Result<ComponentMetadata, PipelineRuntimeError> {
        let synonyms = (!self.synonyms.is_empty()).then_some(&self.synonyms);
        persist_artifact(model_dir, Self::SPEC.name, MODEL_KEY, MODEL_FILE, synonyms)
    }
}

impl ComponentFactory for SynonymMapper {
    const SPEC: ComponentSpec = ComponentSpec::new("ner_synonyms").provides(&[ENTITIES]);

    fn create(_cfg: &NluConfig) -> Result<Self, PipelineSpecError> {
        Ok(Self::default())
    }

    fn load(model_dir: &Path, meta: &ComponentMetadata, _cfg: &NluConfig) -> Result<Self, PipelineRuntimeError> {
        let synonyms: Option<BTreeMap<String, String>> =
            load_artifact(model_dir, meta, Self::SPEC.name, MODEL_KEY)?;
        Ok(Self {
            synonyms: synonyms.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entity;

    fn data() -> TrainingData {
        TrainingData::new(vec![TrainingData::example(
            "fly to NYC",
            None,
            vec![Entity::new(7, 10, "new york city", "city")],
        )])
        .with_synonyms([("BER", "berlin")])
    }

    fn trained() -> SynonymMapper {
        let cfg = NluConfig::default();
        let mut mapper = SynonymMapper::create(&cfg).unwrap();
        mapper
            .train(&mut data(), &cfg, &PipelineContext::new(), &mut TrainingReport::default())
            .unwrap();
        mapper
    }

    #[test]
    fn test_learns_explicit_and_implicit() {
        let mapper = trained();
        assert_eq!(mapper.canonical("ber"), Some("berlin"));
        assert_eq!(mapper.canonical("Nyc"), Some("new york city"));
        assert_eq!(mapper.canonical("paris"), None);
    }

    #[test]
    fn test_process_replaces_values() {
        let mapper = trained();
        let mut msg = Message::new("from BER to paris");
        msg.set_entities(vec![
            Entity::new(5, 8, "BER", "city"),
            Entity::new(12, 17, "paris", "city"),
        ]);
        mapper.process(&mut msg, &PipelineContext::new()).unwrap();
        let entities = msg.entities();
        assert_eq!(entities[0].value, "berlin");
        assert_eq!(entities[0].processors, ["ner_synonyms"]);
        assert_eq!(entities[1].value, "paris");
        assert!(entities[1].processors.is_empty());
    }

    #[test]
    fn test_process_without_entities_is_noop() {
        let mut msg = Message::new("hello");
        trained().process(&mut msg, &PipelineContext::new()).unwrap();
        assert!(msg.entities().is_empty());
    }

    #[test]
    fn test_persist_round_trip_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = NluConfig::default();

        let meta = trained().persist(dir.path()).unwrap();
        let loaded = SynonymMapper::load(dir.path(), &meta, &cfg).unwrap();
        assert_eq!(loaded.canonical("BER"), Some("berlin"));

        let empty_meta = SynonymMapper::default().persist(dir.path()).unwrap();
        assert_eq!(empty_meta[MODEL_KEY], serde_json::Value::Null);
        assert!(SynonymMapper::load(dir.path(), &empty_meta, &cfg).unwrap().is_empty());
    }
}
