//! Property-based tests using proptest

use proptest::prelude::*;
#[cfg(feature = "segmenter")]
use mynlu::nlp::{DictionarySegmenter, JiebaTokenizer};
use mynlu::nlp::{locate_tokens, RuleTokenizer, WhitespaceTokenizer};
use mynlu::pipeline::{ErrorCode, Tokenizer};
use mynlu::types::char_slice;
use mynlu::*;

/// Mixed-script utterances: ASCII words, punctuation, accents, clitics and CJK.
const TEXT: &str = "[a-zA-Z0-9 ,.!?'’éüß\t兰州拉面我想去吃附近有吗]{0,40}";

fn assert_offsets(text: &str, tokens: &[Token]) -> std::result::Result<(), TestCaseError> {
    let mut previous_end = 0;
    for token in tokens {
        prop_assert!(!token.text.is_empty());
        prop_assert_eq!(char_slice(text, token.offset, token.end), Some(token.text.as_str()));
        prop_assert!(token.offset >= previous_end, "tokens overlap in {:?}", text);
        previous_end = token.end;
    }
    Ok(())
}

fn component_names() -> Vec<&'static str> {
    ComponentRegistry::with_builtins().names()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_whitespace_offsets_index_text(text in TEXT) {
        let tokens = WhitespaceTokenizer.tokenize(&text);
        assert_offsets(&text, &tokens)?;
        prop_assert_eq!(tokens.len(), text.split_whitespace().count());
    }

    #[test]
    fn test_rule_offsets_index_text(text in TEXT) {
        assert_offsets(&text, &RuleTokenizer.tokenize(&text))?;
    }

    #[cfg(feature = "segmenter")]
    #[test]
    fn test_jieba_offsets_index_text(text in TEXT) {
        let tokenizer = JiebaTokenizer::new(DictionarySegmenter::new());
        assert_offsets(&text, &tokenizer.tokenize(&text))?;
    }

    #[test]
    fn test_locate_tokens_skips_foreign_words(
        text in TEXT,
        words in prop::collection::vec("[a-z兰州]{1,4}", 0..10)
    ) {
        // arbitrary words, most of them absent from the text
        assert_offsets(&text, &locate_tokens(&text, &words))?;
    }

    #[test]
    fn test_later_config_layer_wins(
        file_language in "[a-z]{2}",
        env_language in proptest::option::of("[a-z]{2}"),
        cmd_language in proptest::option::of("[a-z]{2}"),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.json");
        std::fs::write(&file, serde_json::json!({ "language": file_language }).to_string()).unwrap();

        let env: Vec<(String, String)> = env_language
            .iter()
            .map(|lang| ("MYNLU_LANGUAGE".to_string(), lang.clone()))
            .collect();
        let cfg = ConfigLoader::new()
            .with_default_location(None)
            .with_file(&file)
            .with_env(env)
            .with_cmdline([("language", cmd_language.clone())])
            .load()
            .unwrap();

        let expected = cmd_language.or(env_language).unwrap_or(file_language);
        prop_assert_eq!(cfg.language, expected);
    }

    #[test]
    fn test_builder_enforces_requirement_chain(
        picks in prop::collection::vec(0usize..16, 0..6)
    ) {
        let registry = ComponentRegistry::with_builtins();
        let names = component_names();
        let pipeline: Vec<String> = picks
            .iter()
            .map(|&i| names[i % names.len()].to_string())
            .collect();

        let mut provided: Vec<&str> = Vec::new();
        let mut first_offender = None;
        for (idx, name) in pipeline.iter().enumerate() {
            let spec = registry.get(name).unwrap().spec;
            if spec.requires.iter().any(|req| !provided.contains(req)) {
                first_offender = Some(idx);
                break;
            }
            provided.extend(spec.provides.iter().copied());
        }

        let result = PipelineBuilder::new().check(&pipeline, &NluConfig::default());
        match first_offender {
            None => {
                prop_assert!(result.is_ok(), "{:?} rejected: {:?}", pipeline, result);
            }
            Some(idx) => {
                let err = result.unwrap_err();
                prop_assert_eq!(err.code, ErrorCode::MissingRequirement);
                prop_assert_eq!(err.path, format!("/pipeline/{idx}"));
            }
        }
    }
}
