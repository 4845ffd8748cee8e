//! Integration tests for mynlu

use mynlu::pipeline::{ErrorCode, Metadata, StagePhase, StageTimingObserver};
use mynlu::*;

/// Sample training data in the JSON training format
const TRAINING_JSON: &str = r#"{
  "nlu_data": {
    "common_examples": [
      { "text": "hello there", "intent": "greet" },
      { "text": "hi, how are you?", "intent": "greet" },
      { "text": "good morning", "intent": "greet" },
      {
        "text": "I want to fly to Berlin",
        "intent": "book_flight",
        "entities": [{ "start": 17, "end": 23, "value": "Berlin", "entity": "city" }]
      },
      {
        "text": "book a flight to new york",
        "intent": "book_flight",
        "entities": [{ "start": 17, "end": 25, "value": "new york", "entity": "city" }]
      },
      {
        "text": "flights to NYC please",
        "intent": "book_flight",
        "entities": [{ "start": 11, "end": 14, "value": "new york", "entity": "city" }]
      },
      {
        "text": "fly to paris on monday",
        "intent": "book_flight",
        "entities": [
          { "start": 7, "end": 12, "value": "paris", "entity": "city" },
          { "start": 16, "end": 22, "value": "monday", "entity": "date" },
          { "start": 8, "end": 12, "value": "aris", "entity": "city" }
        ]
      }
    ],
    "entity_synonyms": [{ "value": "berlin", "synonyms": ["BER"] }]
  }
}"#;

/// Route pipeline logs to the test harness; `RUST_LOG=mynlu=debug` shows stage spans.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn training_data() -> TrainingData {
    TrainingData::from_json_str(TRAINING_JSON).unwrap()
}

fn rules_config(model_root: &std::path::Path) -> NluConfig {
    let mut cfg = NluConfig::default().with_fixed_model_name("model");
    cfg.set("pipeline", "rules").unwrap();
    cfg.set("path", model_root.to_string_lossy().to_string()).unwrap();
    cfg
}

#[test]
fn test_full_round_trip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = rules_config(dir.path());

    let mut data = training_data();
    let trained = Trainer::new(cfg.clone()).unwrap().train(&mut data).unwrap();

    // the misaligned "aris" annotation is skipped, everything else trains
    assert_eq!(trained.report().warnings.len(), 1);
    assert_eq!(trained.report().warnings[0].example, 6);

    let model_dir = trained.persist(None).unwrap();
    assert_eq!(model_dir, dir.path().join("model"));
    for file in ["metadata.json", "entity_extractor.json", "entity_synonyms.json", "intent_classifier.json"] {
        assert!(model_dir.join(file).exists(), "missing {file}");
    }

    let in_memory = trained.interpreter();
    let loaded = Interpreter::load(&model_dir, &cfg).unwrap();
    assert_eq!(loaded.component_names(), in_memory.component_names());

    for text in [
        "I want to fly to NYC",
        "hello",
        "fly to NYC on monday",
        "nothing to see",
    ] {
        let a = in_memory.parse_output(text).unwrap();
        let b = loaded.parse_output(text).unwrap();
        assert_eq!(a, b, "outputs differ for {text:?}");
    }

    let output = loaded.parse_output("fly to NYC on monday").unwrap();
    assert_eq!(output["intent"]["name"], "book_flight");
    let entities = output["entities"].as_array().unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0]["entity"], "city");
    assert_eq!(entities[0]["value"], "new york");
    assert_eq!(entities[0]["processors"][0], "ner_synonyms");
    assert_eq!(entities[1]["value"], "monday");
}

#[test]
fn test_loaded_model_ignores_caller_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = rules_config(dir.path()).with_dimensions(["date"]);

    let mut data = training_data();
    let trained = Trainer::new(cfg).unwrap().train(&mut data).unwrap();
    let model_dir = trained.persist(None).unwrap();
    let in_memory = trained.interpreter();

    // the loading config has no dimensions, the trained model keeps "date" only
    let loaded = Interpreter::load(&model_dir, &NluConfig::default()).unwrap();
    for text in ["fly to berlin on monday", "book a flight to new york", "hello"] {
        assert_eq!(
            in_memory.parse_output(text).unwrap(),
            loaded.parse_output(text).unwrap(),
            "outputs differ for {text:?}"
        );
    }
    let message = loaded.parse("fly to berlin on monday").unwrap();
    let labels: Vec<&str> = message.entities().iter().map(|e| e.entity.as_str()).collect();
    assert_eq!(labels, ["date"]);
}

#[cfg(feature = "segmenter")]
#[test]
fn test_loaded_jieba_model_keeps_user_dictionary() {
    let dir = tempfile::tempdir().unwrap();
    let dictionary = dir.path().join("user.dict");
    std::fs::write(&dictionary, "兰州拉面 3 n\n").unwrap();
    let mut cfg = NluConfig::default()
        .with_language("zh")
        .with_fixed_model_name("zh");
    cfg.set("pipeline", "jieba").unwrap();
    cfg.set("path", dir.path().to_string_lossy().to_string()).unwrap();
    cfg.segmenter_dictionary = Some(dictionary.clone());

    let mut data = TrainingData::new(vec![
        TrainingData::example(
            "我想去吃兰州拉面",
            Some("restaurant_search"),
            vec![Entity::new(4, 8, "兰州拉面", "food")],
        ),
        TrainingData::example("你好", Some("greet"), vec![]),
    ]);
    let trained = Trainer::new(cfg).unwrap().train(&mut data).unwrap();
    let model_dir = trained.persist(None).unwrap();
    let in_memory = trained.interpreter();

    std::fs::remove_file(&dictionary).unwrap();
    let loaded = Interpreter::load(&model_dir, &NluConfig::default()).unwrap();

    let text = "附近有兰州拉面吗";
    let a = in_memory.parse(text).unwrap();
    let b = loaded.parse(text).unwrap();
    assert_eq!(a.tokens(), b.tokens());
    let words: Vec<&str> = b.tokens().unwrap().iter().map(|t| t.text.as_str()).collect();
    assert!(words.contains(&"兰州拉面"), "{words:?}");
    assert_eq!(
        in_memory.parse_output(text).unwrap(),
        loaded.parse_output(text).unwrap()
    );
}

#[cfg(not(feature = "segmenter"))]
#[test]
fn test_jieba_template_needs_segmenter_feature() {
    let mut cfg = NluConfig::default().with_language("zh");
    cfg.set("pipeline", "jieba").unwrap();
    match Trainer::new(cfg).unwrap_err() {
        NluError::Spec(err) => {
            assert_eq!(err.code, ErrorCode::MissingPackage);
            assert_eq!(err.path, "/pipeline/1");
        }
        other => panic!("expected a spec error, got {other:?}"),
    }
}

#[test]
fn test_metadata_describes_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = rules_config(dir.path());
    let model_dir = Trainer::new(cfg.clone())
        .unwrap()
        .train(&mut training_data())
        .unwrap()
        .persist(None)
        .unwrap();

    let metadata = Metadata::load(&model_dir).unwrap();
    assert_eq!(metadata.pipeline, cfg.pipeline);
    assert_eq!(metadata.language, "en");
    assert_eq!(metadata.version, VERSION);
    assert_eq!(
        metadata.component_payload(2)["entity_extractor_file"],
        "entity_extractor.json"
    );
}

#[test]
fn test_no_entity_examples_persist_null_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = rules_config(dir.path());
    let mut data = TrainingData::new(vec![
        TrainingData::example("hello", Some("greet"), vec![]),
        TrainingData::example("bye", Some("goodbye"), vec![]),
    ]);

    let trained = Trainer::new(cfg.clone()).unwrap().train(&mut data).unwrap();
    assert!(trained.report().is_clean());
    let model_dir = trained.persist(None).unwrap();
    assert!(!model_dir.join("entity_extractor.json").exists());

    let metadata = Metadata::load(&model_dir).unwrap();
    assert!(metadata.component_payload(2)["entity_extractor_file"].is_null());

    let interpreter = Interpreter::load(&model_dir, &cfg).unwrap();
    let output = interpreter.parse_output("hello berlin").unwrap();
    assert_eq!(output["entities"], serde_json::json!([]));
    assert_eq!(output["intent"]["name"], "greet");
}

#[test]
fn test_missing_context_fails_only_that_call() {
    let cfg = NluConfig::default();
    let components = PipelineBuilder::new()
        .build(
            &["tokenizer_whitespace".to_string(), "ner_gazetteer".to_string()],
            &cfg,
        )
        .unwrap();
    let interpreter = Interpreter::new(components, cfg);

    let mut message = Message::new("fly to berlin");
    let err = interpreter.process(&mut message).unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingContext);
    assert_eq!(err.path, "/pipeline/1");
    // the tokenizer ran before the failure
    assert_eq!(message.tokens().unwrap().len(), 3);

    match interpreter.parse("another message").unwrap_err() {
        NluError::Runtime(err) => assert_eq!(err.stage, "ner_gazetteer"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_unknown_template_lists_known_ones() {
    let err = NluConfig::default().set("pipeline", "spacy_sklearn").unwrap_err();
    assert!(err.is_config());
    let message = err.to_string();
    assert!(message.contains("spacy_sklearn"));
    for known in ["jieba", "keyword", "rules"] {
        assert!(message.contains(known), "{message}");
    }
}

#[test]
fn test_builder_rejects_before_training() {
    let cfg = NluConfig::default().with_pipeline(["ner_gazetteer", "tokenizer_whitespace"]);
    match Trainer::new(cfg).unwrap_err() {
        NluError::Spec(err) => {
            assert_eq!(err.code, ErrorCode::MissingRequirement);
            assert_eq!(err.path, "/pipeline/0");
            assert!(err.hint.is_some());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_config_file_env_and_cmdline() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("nlu.json");
    std::fs::write(
        &file,
        r#"{ "pipeline": "keyword", "language": "de", "num_threads": 2 }"#,
    )
    .unwrap();

    let cfg = ConfigLoader::new()
        .with_default_location(None)
        .with_file(&file)
        .with_env([("MYNLU_LANGUAGE", "fr"), ("HOME", "/root")])
        .with_cmdline([("num_threads", Some("4")), ("fixed_model_name", None)])
        .load()
        .unwrap();
    assert_eq!(cfg.pipeline, ["tokenizer_whitespace", "intent_classifier_keyword"]);
    assert_eq!(cfg.language, "fr");
    assert_eq!(cfg.num_threads, 4);
    assert!(cfg.fixed_model_name.is_none());
    assert!(cfg.path.is_absolute());
}

#[cfg(feature = "segmenter")]
#[test]
fn test_chinese_pipeline() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = NluConfig::default()
        .with_language("zh")
        .with_fixed_model_name("zh");
    cfg.set("pipeline", "jieba").unwrap();
    cfg.set("path", dir.path().to_string_lossy().to_string()).unwrap();

    let mut data = TrainingData::new(vec![
        TrainingData::example(
            "我想去吃兰州拉面",
            Some("restaurant_search"),
            vec![Entity::new(4, 8, "兰州拉面", "food")],
        ),
        TrainingData::example("你好", Some("greet"), vec![]),
    ]);
    let model_dir = Trainer::new(cfg.clone())
        .unwrap()
        .train(&mut data)
        .unwrap()
        .persist(None)
        .unwrap();

    let interpreter = Interpreter::load(&model_dir, &cfg).unwrap();
    let message = interpreter.parse("附近有兰州拉面吗").unwrap();
    assert_eq!(message.intent().unwrap().name, "restaurant_search");
    let entities = message.entities();
    assert_eq!(entities.len(), 1);
    assert_eq!((entities[0].start, entities[0].end), (3, 7));
    assert_eq!(entities[0].value, "兰州拉面");
}

#[test]
fn test_observer_sees_every_stage() {
    let cfg = NluConfig::default().with_pipeline(["tokenizer_whitespace", "intent_classifier_keyword"]);
    let mut observer = StageTimingObserver::new();
    let trained = Trainer::new(cfg)
        .unwrap()
        .train_with_observer(
            &mut TrainingData::new(vec![TrainingData::example("hi", Some("greet"), vec![])]),
            &mut observer,
        )
        .unwrap();
    let interpreter = trained.interpreter();
    let mut message = Message::new("hi");
    interpreter
        .process_with_observer(&mut message, &mut observer)
        .unwrap();

    let phases: Vec<StagePhase> = observer.reports.iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        [StagePhase::Train, StagePhase::Train, StagePhase::Process, StagePhase::Process]
    );
    assert!(observer.reports.iter().all(|r| r.ok));
}

#[test]
fn test_parse_batch_concurrent() {
    let cfg = NluConfig::default()
        .with_pipeline(["tokenizer_whitespace", "intent_classifier_keyword"])
        .with_num_threads(4);
    let mut data = training_data();
    let interpreter = Trainer::new(cfg).unwrap().train(&mut data).unwrap().interpreter();

    let texts: Vec<String> = (0..64)
        .map(|i| if i % 2 == 0 { "hello there".to_string() } else { "fly to paris".to_string() })
        .collect();
    let results = interpreter.parse_batch(texts.as_slice());
    assert_eq!(results.len(), texts.len());
    for (i, result) in results.into_iter().enumerate() {
        let expected = if i % 2 == 0 { "greet" } else { "book_flight" };
        assert_eq!(result.unwrap().intent().unwrap().name, expected);
    }
}
