//! Core annotation types for mynlu
//!
//! Tokens, entities and intents are the values components write into a
//! [`Message`](crate::message::Message). All offsets are **character**
//! offsets into the original, unmodified input text.

use serde::{Deserialize, Serialize};

// ============================================================================
// Character offsets
// ============================================================================

/// Number of characters (Unicode scalar values) in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Slice `text` by character offsets `[start, end)`.
///
/// Returns `None` when the range is inverted or runs past the end of `text`.
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
    let byte_start = indices.by_ref().nth(start)?;
    let byte_end = if end == start {
        byte_start
    } else {
        indices.nth(end - start - 1)?
    };
    Some(&text[byte_start..byte_end])
}

// ============================================================================
// Token
// ============================================================================

/// An atomic lexical unit located in the original input.
///
/// Invariant: `char_slice(original, offset, end) == Some(text)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// Surface text, exactly as it appears in the input
    pub text: String,
    /// Character offset where `text` begins
    pub offset: usize,
    /// Character offset one past the last character of `text`
    pub end: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, offset: usize) -> Self {
        let text = text.into();
        let end = offset + char_len(&text);
        Self { text, offset, end }
    }

    /// Number of characters covered by this token
    pub fn len(&self) -> usize {
        self.end - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.offset
    }
}

// ============================================================================
// Entity
// ============================================================================

/// A labelled span of the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Character offset of the first character
    pub start: usize,
    /// Character offset one past the last character
    pub end: usize,
    /// Value of the entity; the covered text unless a synonym replaced it
    pub value: String,
    /// Entity label, e.g. `"city"`
    pub entity: String,
    /// Component that produced this entity (absent on ground truth)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,
    /// Components that rewrote this entity after extraction
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processors: Vec<String>,
}

impl Entity {
    pub fn new(start: usize, end: usize, value: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            start,
            end,
            value: value.into(),
            entity: entity.into(),
            extractor: None,
            processors: Vec::new(),
        }
    }

    /// Builder method: record the producing component
    pub fn with_extractor(mut self, extractor: impl Into<String>) -> Self {
        self.extractor = Some(extractor.into());
        self
    }

    /// Compact form used in log lines and training warnings
    pub fn describe(&self) -> String {
        format!(
            "{{start: {}, end: {}, value: {:?}, entity: {:?}}}",
            self.start, self.end, self.value, self.entity
        )
    }
}

// ============================================================================
// Intent
// ============================================================================

/// A predicted (or labelled) intent with its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    pub confidence: f64,
}

impl Intent {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}
