//! Tokenizers and shared text features.

pub mod features;
#[cfg(feature = "segmenter")]
pub mod segmenter;
pub mod tokenizer;

use crate::message::TOKENS;
use crate::pipeline::traits::ComponentSpec;

pub use features::{FeatureExtractor, FeatureProvider, FEATURE_EXTRACTOR};
#[cfg(feature = "segmenter")]
pub use segmenter::{DictionarySegmenter, JiebaTokenizer};
pub use tokenizer::{locate_tokens, RuleTokenizer, WhitespaceTokenizer};

/// Capabilities of `tokenizer_jieba`. Declared here so the name stays
/// known (and reported as a missing package) in builds without `segmenter`.
pub const JIEBA_TOKENIZER: ComponentSpec = ComponentSpec::new("tokenizer_jieba")
    .provides(&[TOKENS])
    .required_packages(&["segmenter"]);
