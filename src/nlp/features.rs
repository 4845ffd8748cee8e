//! Shared token normalisation, published to the pipeline context.

use crate::config::NluConfig;
use crate::message::Message;
use crate::pipeline::errors::{PipelineRuntimeError, PipelineSpecError};
use crate::pipeline::traits::{Component, ComponentFactory, ComponentSpec, PipelineContext};

/// Context key under which [`FeatureProvider`] publishes a [`FeatureExtractor`].
pub const FEATURE_EXTRACTOR: &str = "feature_extractor";

/// Language-level token features: normalised form, word shape, and a light
/// suffix-stripping stem.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    language: String,
}

impl FeatureExtractor {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Lower-cased form with typographic apostrophes folded to `'`.
    pub fn normalize(&self, token: &str) -> String {
        token
            .chars()
            .map(|c| if c == '\u{2019}' { '\'' } else { c })
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Word shape: `X` upper, `x` lower, `d` digit, other characters kept;
    /// runs longer than four collapse (`Berlin2024` → `Xxxxxdddd`).
    pub fn shape(&self, token: &str) -> String {
        let mut shape = String::new();
        let mut last = None;
        let mut run = 0;
        for c in token.chars() {
            let class = if c.is_uppercase() {
                'X'
            } else if c.is_lowercase() {
                'x'
            } else if c.is_numeric() {
                'd'
            } else {
                c
            };
            if Some(class) == last {
                run += 1;
            } else {
                last = Some(class);
                run = 1;
            }
            if run <= 4 {
                shape.push(class);
            }
        }
        shape
    }

    /// Normalised form with common English inflections removed.
    ///
    /// Non-English languages only get [`FeatureExtractor::normalize`].
    pub fn stem(&self, token: &str) -> String {
        let lower = self.normalize(token);
        if !self.language.starts_with("en") || !lower.is_ascii() {
            return lower;
        }

        if lower.ends_with("ies") && lower.len() > 4 {
            return format!("{}y", &lower[..lower.len() - 3]);
        }
        if lower.ends_with("es") && lower.len() > 3 {
            let stem = &lower[..lower.len() - 2];
            if stem.ends_with("ss")
                || stem.ends_with("sh")
                || stem.ends_with("ch")
                || stem.ends_with('x')
            {
                return stem.to_string();
            }
        }
        if lower.ends_with('s') && lower.len() > 3 && !lower.ends_with("ss") {
            return lower[..lower.len() - 1].to_string();
        }
        if lower.ends_with("ing") && lower.len() > 5 {
            return undouble(&lower[..lower.len() - 3]).to_string();
        }
        if lower.ends_with("ed") && lower.len() > 4 {
            return undouble(&lower[..lower.len() - 2]).to_string();
        }
        lower
    }

    /// Feature used for bag-of-words models: the shape for numbers, else the stem.
    pub fn token_feature(&self, token: &str) -> String {
        if !token.is_empty() && token.chars().all(char::is_numeric) {
            self.shape(token)
        } else {
            self.stem(token)
        }
    }
}

/// `runn` → `run`.
fn undouble(stem: &str) -> &str {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n >= 2 && bytes[n - 1] == bytes[n - 2] && bytes[n - 1].is_ascii_alphabetic() {
        &stem[..n - 1]
    } else {
        stem
    }
}

// ============================================================================
// nlp_features
// ============================================================================

/// Publishes a [`FeatureExtractor`] for later components; annotates nothing.
#[derive(Debug, Clone)]
pub struct FeatureProvider {
    extractor: FeatureExtractor,
}

impl Component for FeatureProvider {
    fn spec(&self) -> ComponentSpec {
        Self::SPEC
    }

    fn provide_context(&self, ctx: &mut PipelineContext) {
        ctx.insert(FEATURE_EXTRACTOR, self.extractor.clone());
    }

    fn process(&self, _message: &mut Message, _ctx: &PipelineContext) -> Result<(), PipelineRuntimeError> {
        Ok(())
    }
}

impl ComponentFactory for FeatureProvider {
    const SPEC: ComponentSpec = ComponentSpec::new("nlp_features");

    fn create(cfg: &NluConfig) -> Result<Self, PipelineSpecError> {
        Ok(Self {
            extractor: FeatureExtractor::new(cfg.language.clone()),
        })
    }
}
