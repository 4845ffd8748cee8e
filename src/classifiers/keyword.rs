//! Bag-of-words intent classifier (`intent_classifier_keyword`).
//!
//! Multinomial naive Bayes with Laplace smoothing over token features.
//! When `nlp_features` runs earlier in the pipeline, tokens are reduced to
//! stems (numbers to shapes); otherwise they are lower-cased.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::NluConfig;
use crate::message::{Annotation, Message, INTENT, INTENT_RANKING, TOKENS};
use crate::nlp::features::{FeatureExtractor, FEATURE_EXTRACTOR};
use crate::pipeline::artifacts::{load_artifact, persist_artifact};
use crate::pipeline::errors::{PipelineRuntimeError, PipelineSpecError};
use crate::pipeline::traits::{
    Component, ComponentFactory, ComponentMetadata, ComponentSpec, PipelineContext, TrainingReport,
};
use crate::training_data::TrainingData;
use crate::types::{Intent, Token};

const MODEL_KEY: &str = "classifier_file";
const MODEL_FILE: &str = "intent_classifier.json";

/// Number of intents kept in `intent_ranking`.
pub const INTENT_RANKING_LENGTH: usize = 10;

/// Per-intent statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentStats {
    pub name: String,
    /// Training examples labelled with this intent.
    pub examples: usize,
    /// Feature → occurrence count.
    pub counts: BTreeMap<String, usize>,
    /// Sum of `counts`.
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    pub intents: Vec<IntentStats>,
    pub vocabulary_size: usize,
}

impl NaiveBayesModel {
    fn fit<'a, I>(labelled: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, Vec<String>)>,
    {
        let mut by_intent: BTreeMap<String, IntentStats> = BTreeMap::new();
        let mut vocabulary = std::collections::BTreeSet::new();
        for (intent, features) in labelled {
            let stats = by_intent.entry(intent.to_string()).or_insert_with(|| IntentStats {
                name: intent.to_string(),
                examples: 0,
                counts: BTreeMap::new(),
                total: 0,
            });
            stats.examples += 1;
            for feature in features {
                *stats.counts.entry(feature.clone()).or_default() += 1;
                stats.total += 1;
                vocabulary.insert(feature);
            }
        }
        if by_intent.is_empty() {
            return None;
        }
        Some(Self {
            intents: by_intent.into_values().collect(),
            vocabulary_size: vocabulary.len(),
        })
    }

    /// Intents with normalised probabilities, best first (ties by name).
    pub fn rank(&self, features: &[String]) -> Vec<Intent> {
        let total_examples: usize = self.intents.iter().map(|s| s.examples).sum();
        let vocabulary = self.vocabulary_size.max(1) as f64;

        let log_scores: Vec<f64> = self
            .intents
            .iter()
            .map(|stats| {
                let prior = (stats.examples as f64 / total_examples.max(1) as f64).ln();
                let denominator = stats.total as f64 + vocabulary;
                features.iter().fold(prior, |acc, feature| {
                    let count = stats.counts.get(feature).copied().unwrap_or(0) as f64;
                    acc + ((count + 1.0) / denominator).ln()
                })
            })
            .collect();

        let max = log_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = log_scores.iter().map(|s| (s - max).exp()).collect();
        let norm: f64 = exp.iter().sum();

        let mut ranking: Vec<Intent> = self
            .intents
            .iter()
            .zip(exp)
            .map(|(stats, e)| Intent::new(stats.name.clone(), e / norm))
            .collect();
        ranking.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.name.cmp(&b.name))
        });
        ranking
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordIntentClassifier {
    model: Option<NaiveBayesModel>,
}

impl KeywordIntentClassifier {
    pub fn model(&self) -> Option<&NaiveBayesModel> {
        self.model.as_ref()
    }

    fn featurize(tokens: &[Token], ctx: &PipelineContext) -> Vec<String> {
        match ctx.get::<FeatureExtractor>(FEATURE_EXTRACTOR) {
            Some(features) => tokens.iter().map(|t| features.token_feature(&t.text)).collect(),
            None => tokens.iter().map(|t| t.text.to_lowercase()).collect(),
        }
    }
}

impl Component for KeywordIntentClassifier {
    fn spec(&self) -> ComponentSpec {
        Self::SPEC
    }

    fn train(
        &mut self,
        data: &mut TrainingData,
        _cfg: &NluConfig,
        ctx: &PipelineContext,
        _report: &mut TrainingReport,
    ) -> Result<(), PipelineRuntimeError> {
        let labelled = data.intent_examples().filter_map(|example| {
            let intent = example.intent()?;
            let features = Self::featurize(example.tokens().unwrap_or(&[]), ctx);
            Some((intent.name.as_str(), features))
        });
        self.model = NaiveBayesModel::fit(labelled);
        match &self.model {
            Some(model) => tracing::debug!(
                intents = model.intents.len(),
                vocabulary = model.vocabulary_size,
                "Trained intent classifier"
            ),
            None => tracing::info!("No intent examples, intent_classifier_keyword stays untrained"),
        }
        Ok(())
    }

    fn process(&self, message: &mut Message, ctx: &PipelineContext) -> Result<(), PipelineRuntimeError> {
        let Some(model) = &self.model else {
            return Ok(());
        };
        let features = Self::featurize(message.tokens().unwrap_or(&[]), ctx);
        let mut ranking = model.rank(&features);
        ranking.truncate(INTENT_RANKING_LENGTH);
        if let Some(best) = ranking.first() {
            message.set_intent(best.clone());
        }
        message.set(INTENT_RANKING, Annotation::IntentRanking(ranking), true);
        Ok(())
    }

    fn persist(&self, model_dir: &Path) -> Result<ComponentMetadata, PipelineRuntimeError> {
        persist_artifact(model_dir, Self::SPEC.name, MODEL_KEY, MODEL_FILE, self.model.as_ref())
    }
}

impl ComponentFactory for KeywordIntentClassifier {
    const SPEC: ComponentSpec = ComponentSpec::new("intent_classifier_keyword")
        .provides(&[INTENT, INTENT_RANKING])
        .requires(&[TOKENS]);

    fn create(_cfg: &NluConfig) -> Result<Self, PipelineSpecError> {
        Ok(Self::default())
    }

    fn load(model_dir: &Path, meta: &ComponentMetadata, _cfg: &NluConfig) -> Result<Self, PipelineRuntimeError> {
        Ok(Self {
            model: load_artifact(model_dir, meta, Self::SPEC.name, MODEL_KEY)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::features::FeatureProvider;
    use crate::nlp::tokenizer::WhitespaceTokenizer;
    use crate::pipeline::traits::Tokenizer;

    fn data() -> TrainingData {
        let mut data = TrainingData::new(vec![
            TrainingData::example("hello there", Some("greet"), vec![]),
            TrainingData::example("hi hello", Some("greet"), vec![]),
            TrainingData::example("book 2 tickets", Some("book"), vec![]),
            TrainingData::example("booking a table", Some("book"), vec![]),
            TrainingData::example("no label here", None, vec![]),
        ]);
        WhitespaceTokenizer.tokenize_examples(&mut data);
        data
    }

    fn train(ctx: &PipelineContext) -> KeywordIntentClassifier {
        let cfg = NluConfig::default();
        let mut classifier = KeywordIntentClassifier::create(&cfg).unwrap();
        classifier
            .train(&mut data(), &cfg, ctx, &mut TrainingReport::default())
            .unwrap();
        classifier
    }

    fn classify(classifier: &KeywordIntentClassifier, text: &str, ctx: &PipelineContext) -> Message {
        let mut msg = Message::new(text);
        msg.set_tokens(WhitespaceTokenizer.tokenize(text));
        classifier.process(&mut msg, ctx).unwrap();
        msg
    }

    #[test]
    fn test_classifies_and_ranks() {
        let ctx = PipelineContext::new();
        let classifier = train(&ctx);
        let msg = classify(&classifier, "Hello", &ctx);
        let intent = msg.intent().unwrap();
        assert_eq!(intent.name, "greet");
        assert!(intent.confidence > 0.5);

        let ranking = msg.intent_ranking().unwrap();
        assert_eq!(ranking.len(), 2);
        let total: f64 = ranking.iter().map(|i| i.confidence).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(msg.as_output().get("intent_ranking").is_some());
    }

    #[test]
    fn test_feature_extractor_generalises() {
        let mut ctx = PipelineContext::new();
        FeatureProvider::create(&NluConfig::default())
            .unwrap()
            .provide_context(&mut ctx);
        let classifier = train(&ctx);
        // "booked" and "5" only match through stems and shapes
        let msg = classify(&classifier, "booked 5", &ctx);
        assert_eq!(msg.intent().unwrap().name, "book");
    }

    #[test]
    fn test_no_intents_means_no_model() {
        let cfg = NluConfig::default();
        let mut data = TrainingData::new(vec![TrainingData::example("hello", None, vec![])]);
        let mut classifier = KeywordIntentClassifier::create(&cfg).unwrap();
        classifier
            .train(&mut data, &cfg, &PipelineContext::new(), &mut TrainingReport::default())
            .unwrap();
        assert!(classifier.model().is_none());

        let msg = classify(&classifier, "hello", &PipelineContext::new());
        assert!(msg.intent().is_none());
    }

    #[test]
    fn test_persist_round_trip_scores_identically() {
        let ctx = PipelineContext::new();
        let classifier = train(&ctx);
        let dir = tempfile::tempdir().unwrap();
        let meta = classifier.persist(dir.path()).unwrap();
        assert_eq!(meta[MODEL_KEY], MODEL_FILE);

        let loaded = KeywordIntentClassifier::load(dir.path(), &meta, &NluConfig::default()).unwrap();
        for text in ["hi", "table for two", "unknown words"] {
            assert_eq!(
                classify(&classifier, text, &ctx).intent_ranking(),
                classify(&loaded, text, &ctx).intent_ranking()
            );
        }
    }
}
