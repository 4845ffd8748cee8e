//! Dictionary segmentation for Chinese text
//!
//! Forward maximum matching: at each position inside a run of CJK
//! ideographs, take the longest dictionary word starting there, or a single
//! character if none matches. Runs of Latin letters and digits stay
//! together, whitespace is dropped, and any other character stands alone.

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::config::NluConfig;
use crate::message::Message;
use crate::pipeline::artifacts::{load_artifact, persist_artifact};
use crate::pipeline::error_code::ErrorCode;
use crate::pipeline::errors::{PipelineRuntimeError, PipelineSpecError};
use crate::pipeline::traits::{
    Component, ComponentFactory, ComponentMetadata, ComponentSpec, PipelineContext, Tokenizer,
    TrainingReport,
};
use crate::training_data::TrainingData;
use crate::types::Token;

use super::tokenizer::locate_tokens;
use super::JIEBA_TOKENIZER;

const DICTIONARY_KEY: &str = "dictionary_file";
const DICTIONARY_FILE: &str = "segmenter_dictionary.json";

/// Words every segmenter knows.
const BUILTIN_LEXICON: &[&str] = &[
    "你好", "您好", "谢谢", "再见", "我们", "你们", "他们", "什么", "怎么", "哪里", "为什么",
    "可以", "没有", "今天", "明天", "昨天", "现在", "天气", "下雨", "北京", "上海", "广州",
    "深圳", "兰州", "拉面", "中国", "餐厅", "饭店", "附近", "预订", "机票", "火车", "火车站",
    "飞机", "电影", "音乐", "喜欢", "帮忙", "帮我", "时间", "地址", "电话", "多少", "价格",
    "便宜", "早上", "晚上", "中午", "咖啡", "外卖",
];

/// Check if a character is CJK
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |   // CJK Unified Ideographs
        '\u{3400}'..='\u{4DBF}' |   // CJK Extension A
        '\u{20000}'..='\u{2A6DF}' | // CJK Extension B
        '\u{2A700}'..='\u{2B73F}' | // CJK Extension C
        '\u{2B740}'..='\u{2B81F}' | // CJK Extension D
        '\u{F900}'..='\u{FAFF}' |   // CJK Compatibility
        '\u{3040}'..='\u{309F}' |   // Hiragana
        '\u{30A0}'..='\u{30FF}' |   // Katakana
        '\u{AC00}'..='\u{D7AF}'     // Hangul
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Ideograph,
    Alnum,
    Other,
}

fn classify(c: char) -> CharClass {
    if c.is_whitespace() {
        CharClass::Space
    } else if is_cjk(c) {
        CharClass::Ideograph
    } else if c.is_alphanumeric() {
        CharClass::Alnum
    } else {
        CharClass::Other
    }
}

/// A forward-maximum-matching word segmenter.
#[derive(Debug, Clone)]
pub struct DictionarySegmenter {
    words: FxHashSet<String>,
    /// Longest dictionary entry, in characters.
    max_len: usize,
}

impl Default for DictionarySegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionarySegmenter {
    /// A segmenter with the built-in lexicon.
    pub fn new() -> Self {
        let mut segmenter = Self {
            words: FxHashSet::default(),
            max_len: 1,
        };
        segmenter.extend(BUILTIN_LEXICON.iter().copied());
        segmenter
    }

    /// Add words to the lexicon.
    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for word in words {
            let word: String = word.into();
            if word.is_empty() {
                continue;
            }
            self.max_len = self.max_len.max(word.chars().count());
            self.words.insert(word);
        }
    }

    /// Read a user dictionary: one entry per line, first whitespace
    /// separated field is the word (frequency and tag columns are ignored).
    /// Returns the words read, in file order.
    pub fn load_dictionary(&mut self, path: &Path) -> std::io::Result<Vec<String>> {
        let content = std::fs::read_to_string(path)?;
        let words: Vec<String> = content
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect();
        self.extend(words.iter().cloned());
        Ok(words)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Split `text` into words (substrings of `text`, in order).
    pub fn cut<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let byte_at = |i: usize| chars.get(i).map_or(text.len(), |(b, _)| *b);
        let mut words = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let class = classify(chars[i].1);
            match class {
                CharClass::Space => i += 1,
                CharClass::Other => {
                    words.push(&text[byte_at(i)..byte_at(i + 1)]);
                    i += 1;
                }
                CharClass::Alnum => {
                    let start = i;
                    while i < chars.len() && classify(chars[i].1) == CharClass::Alnum {
                        i += 1;
                    }
                    words.push(&text[byte_at(start)..byte_at(i)]);
                }
                CharClass::Ideograph => {
                    let mut run_end = i;
                    while run_end < chars.len() && classify(chars[run_end].1) == CharClass::Ideograph {
                        run_end += 1;
                    }
                    while i < run_end {
                        let longest = (run_end - i).min(self.max_len);
                        let len = (2..=longest)
                            .rev()
                            .find(|&n| self.contains(&text[byte_at(i)..byte_at(i + n)]))
                            .unwrap_or(1);
                        words.push(&text[byte_at(i)..byte_at(i + len)]);
                        i += len;
                    }
                }
            }
        }
        words
    }
}

// ============================================================================
// tokenizer_jieba
// ============================================================================

/// Tokenizer for Chinese built on [`DictionarySegmenter`].
///
/// Words from the user dictionary are persisted with the model, so a loaded
/// tokenizer segments exactly like the trained one.
#[derive(Debug, Clone)]
pub struct JiebaTokenizer {
    segmenter: DictionarySegmenter,
    user_words: Vec<String>,
}

impl JiebaTokenizer {
    pub fn new(segmenter: DictionarySegmenter) -> Self {
        Self {
            segmenter,
            user_words: Vec::new(),
        }
    }

    /// The built-in lexicon plus `words`.
    pub fn with_user_words(words: Vec<String>) -> Self {
        let mut segmenter = DictionarySegmenter::new();
        segmenter.extend(words.iter().cloned());
        Self {
            segmenter,
            user_words: words,
        }
    }

    pub fn segmenter(&self) -> &DictionarySegmenter {
        &self.segmenter
    }

    pub fn user_words(&self) -> &[String] {
        &self.user_words
    }
}

impl Tokenizer for JiebaTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        locate_tokens(text, self.segmenter.cut(text))
    }
}

impl Component for JiebaTokenizer {
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

    fn persist(&self, model_dir: &Path) -> Result<ComponentMetadata, PipelineRuntimeError> {
        let words = (!self.user_words.is_empty()).then_some(&self.user_words);
        persist_artifact(model_dir, Self::SPEC.name, DICTIONARY_KEY, DICTIONARY_FILE, words)
    }
}

impl ComponentFactory for JiebaTokenizer {
    const SPEC: ComponentSpec = JIEBA_TOKENIZER;

    fn create(cfg: &NluConfig) -> Result<Self, PipelineSpecError> {
        if !cfg.language.to_lowercase().starts_with("zh") {
            return Err(PipelineSpecError::new(
                ErrorCode::InvalidValue,
                "",
                format!(
                    "tokenizer_jieba only segments Chinese, but language is \"{}\"",
                    cfg.language
                ),
            )
            .with_hint("Set language to \"zh\" or pick another tokenizer"));
        }

        let mut segmenter = DictionarySegmenter::new();
        let mut user_words = Vec::new();
        if let Some(path) = &cfg.segmenter_dictionary {
            user_words = segmenter.load_dictionary(path).map_err(|e| {
                PipelineSpecError::new(
                    ErrorCode::InvalidValue,
                    "/segmenter_dictionary",
                    format!("cannot read dictionary '{}': {e}", path.display()),
                )
            })?;
            tracing::debug!(path = %path.display(), words = user_words.len(), "Loaded segmenter dictionary");
        }
        Ok(Self {
            segmenter,
            user_words,
        })
    }

    /// Rebuilds the lexicon from the persisted user words only.
    fn load(model_dir: &Path, meta: &ComponentMetadata, _cfg: &NluConfig) -> Result<Self, PipelineRuntimeError> {
        let words: Option<Vec<String>> = load_artifact(model_dir, meta, Self::SPEC.name, DICTIONARY_KEY)?;
        Ok(Self::with_user_words(words.unwrap_or_default()))
    }
}
