//! Entity extractors and entity post-processors.

pub mod gazetteer;
pub mod synonyms;

pub use gazetteer::{GazetteerEntry, GazetteerExtractor, GazetteerModel};
pub use synonyms::SynonymMapper;
