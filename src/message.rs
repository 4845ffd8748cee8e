//! The shared annotation record passed through a pipeline.
//!
//! One [`Message`] exists per utterance. Components read the keys earlier
//! components set and add their own; keys are set, not removed. During
//! training the same records live inside
//! [`TrainingData`](crate::training_data::TrainingData), so annotations a
//! tokenizer attaches are visible to every later component in the same pass.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::types::{Entity, Intent, Token};

/// Key written by tokenizers.
pub const TOKENS: &str = "tokens";
/// Key written by entity extractors (and holding ground truth in training).
pub const ENTITIES: &str = "entities";
/// Key written by intent classifiers (and holding ground truth in training).
pub const INTENT: &str = "intent";
/// Key holding the full ranked list of intents.
pub const INTENT_RANKING: &str = "intent_ranking";

/// A value stored under a [`Message`] key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Annotation {
    Tokens(Vec<Token>),
    Entities(Vec<Entity>),
    Intent(Intent),
    IntentRanking(Vec<Intent>),
    /// Anything a component wants to pass along that has no typed slot.
    Value(serde_json::Value),
}

/// A mutable key → annotation record for one utterance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    text: String,
    data: FxHashMap<String, Annotation>,
    /// Keys included in [`Message::as_output`], in first-set order.
    output_properties: Vec<String>,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// The original, unmodified input text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Set `key`, replacing any previous value.
    ///
    /// With `add_to_output`, the key is included in [`Message::as_output`].
    pub fn set(&mut self, key: impl Into<String>, value: Annotation, add_to_output: bool) {
        let key = key.into();
        if add_to_output && !self.output_properties.contains(&key) {
            self.output_properties.push(key.clone());
        }
        self.data.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&Annotation> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Keys currently set, in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    // ─── Typed accessors ──────────────────────────────────────────────

    pub fn tokens(&self) -> Option<&[Token]> {
        match self.data.get(TOKENS) {
            Some(Annotation::Tokens(tokens)) => Some(tokens),
            _ => None,
        }
    }

    pub fn set_tokens(&mut self, tokens: Vec<Token>) {
        self.set(TOKENS, Annotation::Tokens(tokens), false);
    }

    /// Entities set so far; empty when none have been set.
    pub fn entities(&self) -> &[Entity] {
        match self.data.get(ENTITIES) {
            Some(Annotation::Entities(entities)) => entities,
            _ => &[],
        }
    }

    pub fn entities_mut(&mut self) -> Option<&mut Vec<Entity>> {
        match self.data.get_mut(ENTITIES) {
            Some(Annotation::Entities(entities)) => Some(entities),
            _ => None,
        }
    }

    /// Replace the entity list (used for ground truth).
    pub fn set_entities(&mut self, entities: Vec<Entity>) {
        self.set(ENTITIES, Annotation::Entities(entities), true);
    }

    /// Append to the entity list, keeping what earlier extractors found.
    pub fn append_entities(&mut self, extracted: Vec<Entity>) {
        match self.entities_mut() {
            Some(existing) => {
                existing.extend(extracted);
                if !self.output_properties.iter().any(|k| k == ENTITIES) {
                    self.output_properties.push(ENTITIES.to_string());
                }
            }
            None => self.set_entities(extracted),
        }
    }

    pub fn intent(&self) -> Option<&Intent> {
        match self.data.get(INTENT) {
            Some(Annotation::Intent(intent)) => Some(intent),
            _ => None,
        }
    }

    pub fn set_intent(&mut self, intent: Intent) {
        self.set(INTENT, Annotation::Intent(intent), true);
    }

    pub fn intent_ranking(&self) -> Option<&[Intent]> {
        match self.data.get(INTENT_RANKING) {
            Some(Annotation::IntentRanking(ranking)) => Some(ranking),
            _ => None,
        }
    }

    // ─── Output ───────────────────────────────────────────────────────

    /// JSON object with `text` plus every key flagged for output.
    pub fn as_output(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        out.insert("text".into(), serde_json::Value::String(self.text.clone()));
        for key in &self.output_properties {
            if let Some(value) = self.data.get(key) {
                let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                out.insert(key.clone(), json);
            }
        }
        serde_json::Value::Object(out)
    }
}
