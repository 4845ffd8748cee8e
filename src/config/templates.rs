//! Named pipeline templates.
//!
//! A template is a shorthand for an explicit ordered component list. The
//! registry is process-wide and read-mostly: it is seeded from
//! [`BUILTIN_TEMPLATES`] on first use, and
//! [`register_pipeline_template`] may add entries before pipelines are
//! built.

use std::sync::{OnceLock, RwLock};

use rustc_hash::FxHashMap;

/// Templates available in every process.
pub const BUILTIN_TEMPLATES: &[(&str, &[&str])] = &[
    ("keyword", &["tokenizer_whitespace", "intent_classifier_keyword"]),
    (
        "rules",
        &[
            "nlp_features",
            "tokenizer_rule",
            "ner_gazetteer",
            "ner_synonyms",
            "intent_classifier_keyword",
        ],
    ),
    (
        "jieba",
        &[
            "nlp_features",
            "tokenizer_jieba",
            "ner_gazetteer",
            "ner_synonyms",
            "intent_classifier_keyword",
        ],
    ),
];

type TemplateMap = FxHashMap<String, Vec<String>>;

static TEMPLATES: OnceLock<RwLock<TemplateMap>> = OnceLock::new();

fn registry() -> &'static RwLock<TemplateMap> {
    TEMPLATES.get_or_init(|| {
        let map = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, components)| {
                (
                    name.to_string(),
                    components.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect();
        RwLock::new(map)
    })
}

/// The component list for template `name`, if registered.
pub fn pipeline_template(name: &str) -> Option<Vec<String>> {
    let map = registry().read().unwrap_or_else(|e| e.into_inner());
    map.get(name).cloned()
}

/// All registered template names, sorted.
pub fn pipeline_template_names() -> Vec<String> {
    let map = registry().read().unwrap_or_else(|e| e.into_inner());
    let mut names: Vec<String> = map.keys().cloned().collect();
    names.sort();
    names
}

/// Register (or replace) a template. Call before building pipelines.
pub fn register_pipeline_template<I, S>(name: impl Into<String>, components: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let name = name.into();
    let components: Vec<String> = components.into_iter().map(Into::into).collect();
    tracing::debug!(template = %name, ?components, "Registering pipeline template");
    let mut map = registry().write().unwrap_or_else(|e| e.into_inner());
    map.insert(name, components);
}
