//! Intent classifiers.

pub mod keyword;

pub use keyword::{KeywordIntentClassifier, NaiveBayesModel, INTENT_RANKING_LENGTH};
