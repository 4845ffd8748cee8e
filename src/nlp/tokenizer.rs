//! Tokenizers for space-delimited languages
//!
//! Every tokenizer produces a list of words and hands it to
//! [`locate_tokens`], which recovers the character offset of each word in
//! the original input. Offsets are therefore always consistent with the
//! text, whatever the splitting rule.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::NluConfig;
use crate::message::{Message, TOKENS};
use crate::pipeline::errors::{PipelineRuntimeError, PipelineSpecError};
use crate::pipeline::traits::{
    Component, ComponentFactory, ComponentSpec, PipelineContext, Tokenizer, TrainingReport,
};
use crate::training_data::TrainingData;
use crate::types::Token;

/// Locate `words` in `text`, left to right.
///
/// A cursor starts at 0; each word is searched for at or after the cursor,
/// its offset is recorded in characters, and the cursor moves past it.
/// Words that cannot be found are skipped.
pub fn locate_tokens<I>(text: &str, words: I) -> Vec<Token>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut tokens = Vec::new();
    let mut cursor_byte = 0;
    let mut cursor_char = 0;

    for word in words {
        let word = word.as_ref();
        if word.is_empty() {
            continue;
        }
        match text[cursor_byte..].find(word) {
            Some(rel) => {
                let start_byte = cursor_byte + rel;
                let offset = cursor_char + text[cursor_byte..start_byte].chars().count();
                let token = Token::new(word, offset);
                cursor_byte = start_byte + word.len();
                cursor_char = token.end;
                tokens.push(token);
            }
            None => {
                tracing::debug!("Token '{word}' not found after offset {cursor_char}, skipped");
            }
        }
    }
    tokens
}

// ============================================================================
// Whitespace
// ============================================================================

/// Splits on Unicode whitespace; punctuation stays attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        locate_tokens(text, text.split_whitespace())
    }
}

impl Component for WhitespaceTokenizer {
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
        self.tokenize_examples(data);
        Ok(())
    }

    fn process(&self, message: &mut Message, _ctx: &PipelineContext) -> Result<(), PipelineRuntimeError> {
        let tokens = self.tokenize(message.text());
        message.set_tokens(tokens);
        Ok(())
    }
}

impl ComponentFactory for WhitespaceTokenizer {
    const SPEC: ComponentSpec = ComponentSpec::new("tokenizer_whitespace").provides(&[TOKENS]);

    fn create(_cfg: &NluConfig) -> Result<Self, PipelineSpecError> {
        Ok(Self)
    }
}

// ============================================================================
// Rule based (UAX #29)
// ============================================================================

/// English contraction suffixes split off their host word.
const CLITICS: &[&str] = &["s", "re", "ve", "ll", "d", "m", "t"];

/// UAX #29 word segmentation with contraction splitting.
///
/// Whitespace is dropped, punctuation becomes its own token, and clitics
/// are separated (`how're` → `how`, `'re`; `can't` → `ca`, `n't`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleTokenizer;

impl RuleTokenizer {
    pub fn words<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut words = Vec::new();
        for segment in text.split_word_bounds() {
            if segment.chars().all(char::is_whitespace) {
                continue;
            }
            split_clitic(segment, &mut words);
        }
        words
    }
}

fn is_apostrophe(c: char) -> bool {
    c == '\'' || c == '\u{2019}'
}

fn split_clitic<'a>(segment: &'a str, out: &mut Vec<&'a str>) {
    if let Some(pos) = segment.rfind(is_apostrophe) {
        let (head, tail) = segment.split_at(pos);
        let apostrophe_len = tail.chars().next().map_or(1, char::len_utf8);
        let suffix = tail[apostrophe_len..].to_lowercase();

        if !head.is_empty() && CLITICS.contains(&suffix.as_str()) {
            if suffix != "t" {
                out.push(head);
                out.push(tail);
                return;
            }
            // n't: the n belongs to the clitic
            if head.len() > 1 && (head.ends_with('n') || head.ends_with('N')) {
                let split = head.len() - 1;
                out.push(&segment[..split]);
                out.push(&segment[split..]);
                return;
            }
        }
    }
    out.push(segment);
}

impl Tokenizer for RuleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        locate_tokens(text, self.words(text))
    }
}

impl Component for RuleTokenizer {
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
        self.tokenize_examples(data);
        Ok(())
    }

    fn process(&self, message: &mut Message, _ctx: &PipelineContext) -> Result<(), PipelineRuntimeError> {
        let tokens = self.tokenize(message.text());
        message.set_tokens(tokens);
        Ok(())
    }
}

impl ComponentFactory for RuleTokenizer {
    const SPEC: ComponentSpec = ComponentSpec::new("tokenizer_rule").provides(&[TOKENS]);

    fn create(_cfg: &NluConfig) -> Result<Self, PipelineSpecError> {
        Ok(Self)
    }
}
