//! Labelled training examples.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "nlu_data": {
//!     "common_examples": [
//!       {
//!         "text": "fly to berlin",
//!         "intent": "book_flight",
//!         "entities": [{ "start": 7, "end": 13, "value": "berlin", "entity": "city" }]
//!       }
//!     ],
//!     "entity_synonyms": [{ "value": "berlin", "synonyms": ["BER", "berlin city"] }]
//!   }
//! }
//! ```
//!
//! Entity offsets are character offsets into `text`.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::errors::{NluError, Result};
use crate::message::Message;
use crate::types::{char_len, char_slice, Entity, Intent};

#[derive(Debug, Deserialize)]
struct TrainingFile {
    nlu_data: NluData,
}

#[derive(Debug, Deserialize)]
struct NluData {
    #[serde(default)]
    common_examples: Vec<RawExample>,
    #[serde(default)]
    entity_synonyms: Vec<RawSynonyms>,
}

#[derive(Debug, Deserialize)]
struct RawExample {
    text: String,
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct RawSynonyms {
    value: String,
    synonyms: Vec<String>,
}

/// An ordered collection of labelled examples.
///
/// Each example is a [`Message`] whose `entities` / `intent` keys hold the
/// ground truth. Components may attach further annotations (tokens) while
/// training; those stay on the example for the rest of the pass.
#[derive(Debug, Clone, Default)]
pub struct TrainingData {
    pub training_examples: Vec<Message>,
    /// Lower-cased surface form → canonical value.
    pub entity_synonyms: FxHashMap<String, String>,
}

impl TrainingData {
    pub fn new(training_examples: Vec<Message>) -> Self {
        Self {
            training_examples,
            entity_synonyms: FxHashMap::default(),
        }
    }

    /// Builder method: add synonym mappings (`surface` → `canonical`).
    pub fn with_synonyms<I, K, V>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (surface, canonical) in synonyms {
            self.entity_synonyms
                .insert(surface.as_ref().to_lowercase(), canonical.into());
        }
        self
    }

    /// Build one labelled example.
    pub fn example(text: &str, intent: Option<&str>, entities: Vec<Entity>) -> Message {
        let mut msg = Message::new(text);
        if let Some(intent) = intent {
            msg.set_intent(Intent::new(intent, 1.0));
        }
        if !entities.is_empty() {
            msg.set_entities(entities);
        }
        msg
    }

    /// Parse the JSON training format.
    ///
    /// Entities whose span falls outside the example text are dropped with a
    /// warning; alignment with token boundaries is checked later by the
    /// components that care about it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: TrainingFile = serde_json::from_str(json)
            .map_err(|e| NluError::invalid_training_data(e.to_string()))?;

        let mut examples = Vec::with_capacity(file.nlu_data.common_examples.len());
        for (idx, raw) in file.nlu_data.common_examples.into_iter().enumerate() {
            let len = char_len(&raw.text);
            let entities: Vec<Entity> = raw
                .entities
                .into_iter()
                .filter(|e| {
                    let in_bounds = e.start < e.end && e.end <= len;
                    if !in_bounds {
                        tracing::warn!(
                            example = idx,
                            "Entity {} is outside of example '{}', skipped",
                            e.describe(),
                            raw.text
                        );
                    }
                    in_bounds
                })
                .collect();
            examples.push(Self::example(&raw.text, raw.intent.as_deref(), entities));
        }

        let mut data = Self::new(examples);
        for group in file.nlu_data.entity_synonyms {
            for surface in group.synonyms {
                data.entity_synonyms
                    .insert(surface.to_lowercase(), group.value.clone());
            }
        }
        tracing::debug!(
            examples = data.training_examples.len(),
            synonyms = data.entity_synonyms.len(),
            "Loaded training data"
        );
        Ok(data)
    }

    /// Read and parse a training data file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| NluError::io(path, e))?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.training_examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.training_examples.is_empty()
    }

    /// Examples with at least one entity annotation.
    pub fn entity_examples(&self) -> impl Iterator<Item = &Message> {
        self.training_examples
            .iter()
            .filter(|ex| !ex.entities().is_empty())
    }

    /// Examples with an intent label.
    pub fn intent_examples(&self) -> impl Iterator<Item = &Message> {
        self.training_examples
            .iter()
            .filter(|ex| ex.intent().is_some())
    }

    /// Sorted, de-duplicated intent labels.
    pub fn intents(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .intent_examples()
            .filter_map(|ex| ex.intent().map(|i| i.name.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Surface forms whose annotated value differs from the covered text.
    ///
    /// These are implicit synonyms: `"NYC"` annotated with value
    /// `"new york city"` maps `nyc` → `new york city`.
    pub fn implicit_synonyms(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.entity_examples().flat_map(|ex| {
            ex.entities().iter().filter_map(move |e| {
                let surface = char_slice(ex.text(), e.start, e.end)?;
                (surface != e.value).then(|| (surface.to_lowercase(), e.value.clone()))
            })
        })
    }
}
