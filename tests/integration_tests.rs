//! Integration tests for phonembed: train, save, load and compare.

use phonembed::{
    pipeline, Config, Corpus, EmbeddingComposer, LanguageModels, LexiconTranscriber, ModelKind, ModelStore,
    Normalizer, PhonembedError, TextConfig, TrainingConfig, TrainingObjective, Transcriber, WordComparator, WordQuery,
};
use std::fs;
use tempfile::tempdir;

const ENGLISH_LEXICON: &str = "\
hello\th ə l oʊ
cat\tk æ t
dog\td ɔ g
the\tð ə
and\tæ n d
computer\tk ə m p j u t ɚ
";

const POLISH_LEXICON: &str = "\
kot\tk ɔ t
pies\tp j ɛ s
i\ti
komputer\tk ɔ m p u t ɛ r
cześć\tt͡ʂ ɛ ɕ t͡ɕ
";

/// Creates a simple English word corpus.
fn english_sentences() -> Vec<&'static str> {
    vec![
        "Hello, the cat and the dog.",
        "The dog and the cat.",
        "Hello computer.",
        "The computer and the cat.",
        "Hello dog, hello cat.",
    ]
}

/// Creates a simple Polish word corpus.
fn polish_sentences() -> Vec<&'static str> {
    vec!["Cześć kot i pies.", "Pies i kot.", "Cześć komputer.", "Komputer i kot."]
}

fn small_config() -> TrainingConfig {
    TrainingConfig {
        embedding_dim: 8,
        window_size: 2,
        epochs: 5,
        batch_size: 16,
        learning_rate: 0.1,
        seed: Some(7),
        ..TrainingConfig::default()
    }
}

/// Writes lexicons and trains both languages into `store`.
fn train_both(store: &ModelStore) -> (LanguageModels, LanguageModels) {
    let normalizer = Normalizer::default();
    let config = small_config();

    let mut lexicon = LexiconTranscriber::new();
    for (language, raw) in [("en", ENGLISH_LEXICON), ("pl", POLISH_LEXICON)] {
        fs::create_dir_all(store.data_dir().join(language)).unwrap();
        fs::write(store.lexicon_path(language), raw).unwrap();
        lexicon.load_file(language, store.lexicon_path(language)).unwrap();
    }

    let en = pipeline::train_language(
        store,
        "en",
        &lexicon.phoneme_corpus("en"),
        &Corpus::from_text_lines(english_sentences(), &normalizer),
        &config,
    )
    .unwrap();
    let pl = pipeline::train_language(
        store,
        "pl",
        &lexicon.phoneme_corpus("pl"),
        &Corpus::from_text_lines(polish_sentences(), &normalizer),
        &config,
    )
    .unwrap();

    (en, pl)
}

#[test]
fn test_end_to_end_training_and_comparison() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    train_both(&store);

    let transcriber = LexiconTranscriber::load(&store, &["en", "pl"]).unwrap();
    let comparator = WordComparator::load(&store, &["en", "pl"])
        .unwrap()
        .with_transcriber(transcriber);

    assert_eq!(comparator.primary_language(), "en");
    assert_eq!(comparator.dim(), 8);

    let result = comparator.compare_words("cat", "en", "kot", "pl").unwrap();
    assert_eq!(result.phonemes1, vec!["k", "æ", "t"]);
    assert_eq!(result.phonemes2, vec!["k", "ɔ", "t"]);
    assert!(result.cosine_similarity.is_finite());
    assert!((-1.0..=1.0).contains(&result.cosine_similarity));
    assert!(result.euclidean_distance >= 0.0);

    let same = comparator.compare_words("computer", "en", "computer", "en").unwrap();
    assert!((same.cosine_similarity - 1.0).abs() < 1e-5);
    assert!(same.euclidean_distance.abs() < 1e-6);
}

#[test]
fn test_save_load_is_bit_identical() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let (en, _) = train_both(&store);

    for kind in ModelKind::ALL {
        let loaded = store.load("en", kind).unwrap();
        let trained = match kind {
            ModelKind::Phoneme => en.phoneme(),
            ModelKind::Word => en.word(),
        };
        assert_eq!(loaded.vocabulary(), trained.vocabulary());
        assert_eq!(loaded.metadata(), trained.metadata());
        let bits = |m: &phonembed::TrainedModel| -> Vec<u32> {
            m.matrix().as_slice().iter().map(|v| v.to_bits()).collect()
        };
        assert_eq!(bits(&loaded), bits(trained));
    }
}

#[test]
fn test_training_is_reproducible_across_runs() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let (en_a, _) = train_both(&ModelStore::new(a.path()));
    let (en_b, _) = train_both(&ModelStore::new(b.path()));

    assert_eq!(en_a.word(), en_b.word());
    assert_eq!(en_a.phoneme(), en_b.phoneme());

    let bytes_a = fs::read(a.path().join("en").join("word.pemb")).unwrap();
    let bytes_b = fs::read(b.path().join("en").join("word.pemb")).unwrap();
    assert_eq!(bytes_a, bytes_b);
}

#[test]
fn test_discover_lists_trained_models() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    train_both(&store);

    let keys: Vec<String> = store.discover().unwrap().iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["en/phoneme", "en/word", "pl/phoneme", "pl/word"]);
    assert_eq!(store.complete_languages().unwrap(), vec!["en", "pl"]);
}

#[test]
fn test_unloaded_language() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    train_both(&store);

    let comparator = WordComparator::load(&store, &["en"]).unwrap();
    match comparator.compare_words("cat", "en", "kot", "pl") {
        Err(PhonembedError::LanguageNotLoaded { language }) => assert_eq!(language, "pl"),
        other => panic!("expected LanguageNotLoaded, got {:?}", other),
    }
}

#[test]
fn test_loading_missing_language_fails_whole_construction() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    train_both(&store);

    match WordComparator::load(&store, &["en", "fr"]) {
        Err(PhonembedError::ModelNotFound { language, kind }) => {
            assert_eq!(language, "fr");
            assert_eq!(kind, ModelKind::Phoneme);
        }
        other => panic!("expected ModelNotFound, got {:?}", other),
    }

    let none: [&str; 0] = [];
    assert!(matches!(WordComparator::load(&store, &none), Err(PhonembedError::Config(_))));
}

#[test]
fn test_dimension_mismatch_between_languages() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    train_both(&store);

    let normalizer = Normalizer::default();
    let wide = TrainingConfig {
        embedding_dim: 4,
        ..small_config()
    };
    pipeline::train_language(
        &store,
        "de",
        &Corpus::from_phoneme_lines(["h aʊ s", "k a t s ə"], &normalizer),
        &Corpus::from_text_lines(["Das Haus und die Katze."], &normalizer),
        &wide,
    )
    .unwrap();

    assert!(matches!(
        WordComparator::load(&store, &["en", "de"]),
        Err(PhonembedError::DimensionMismatch { expected: 8, found: 4, .. })
    ));

    // The mismatch is reported as soon as "de" loads, before "fr" is looked up.
    match WordComparator::load(&store, &["en", "de", "fr"]) {
        Err(PhonembedError::DimensionMismatch { model, expected, found }) => {
            assert_eq!(model, "de/word");
            assert_eq!((expected, found), (8, 4));
        }
        other => panic!("expected DimensionMismatch, got {:?}", other),
    }
}

#[test]
fn test_corrupt_model_file() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    train_both(&store);

    let path = store.path_for("pl", ModelKind::Word);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    match WordComparator::load(&store, &["en", "pl"]) {
        Err(PhonembedError::ModelCorrupt {
            path: reported,
            language,
            kind,
            ..
        }) => {
            assert_eq!(reported, path);
            assert_eq!(language, "pl");
            assert_eq!(kind, ModelKind::Word);
        }
        other => panic!("expected ModelCorrupt, got {:?}", other),
    }
}

#[test]
fn test_word_not_in_lexicon() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    train_both(&store);

    let comparator = WordComparator::load(&store, &["en", "pl"])
        .unwrap()
        .with_transcriber(LexiconTranscriber::load(&store, &["en", "pl"]).unwrap());
    assert!(matches!(
        comparator.compare_words("zebra", "en", "kot", "pl"),
        Err(PhonembedError::WordNotTranscribed { .. })
    ));
}

#[test]
fn test_combined_embedding_layout() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let (en, _) = train_both(&store);
    let comparator = WordComparator::from_models(vec![en.clone()]).unwrap();

    let phonemes = ["h", "ə", "l", "oʊ"];
    let combined = comparator.get_combined_embedding("hello", &phonemes).unwrap();
    assert_eq!(combined.len(), 16);

    let (word_half, phoneme_half) = EmbeddingComposer::split(&combined);
    assert_eq!(word_half, en.word().embedding("hello"));

    let mut mean = vec![0.0f32; 8];
    for p in phonemes {
        for (m, v) in mean.iter_mut().zip(en.phoneme().embedding(p)) {
            *m += v;
        }
    }
    for (m, v) in mean.iter().zip(phoneme_half) {
        assert!((m / 4.0 - v).abs() < 1e-6);
    }

    // Deterministic.
    assert_eq!(combined, comparator.get_combined_embedding("hello", &phonemes).unwrap());
}

#[test]
fn test_out_of_vocabulary_word_uses_unknown_row() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let (en, _) = train_both(&store);
    let comparator = WordComparator::from_models(vec![en.clone()]).unwrap();

    let q = WordQuery::new("xylophone", "en", &["z", "aɪ"]);
    let combined = comparator.combined_embedding(&q.word, &q.language, &q.phonemes).unwrap();
    let unknown = en.word().matrix().row(en.word().vocabulary().unknown_id());
    assert_eq!(&combined[..8], unknown);
}

#[test]
fn test_case_sensitive_models_keep_case_at_lookup() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let cased = Normalizer::new(TextConfig {
        lowercase_words: false,
        ..TextConfig::default()
    });

    fs::create_dir_all(store.data_dir().join("pl")).unwrap();
    fs::write(store.lexicon_path("pl"), "Kot\tk ɔ t\nPies\tp j ɛ s\ni\ti\n").unwrap();
    let lexicon = LexiconTranscriber::load_with_normalizer(&store, &["pl"], cased.clone()).unwrap();

    let trained = pipeline::train_language(
        &store,
        "pl",
        &lexicon.phoneme_corpus("pl"),
        &Corpus::from_text_lines(["Kot i Pies.", "Pies i Kot.", "Kot i Kot."], &cased),
        &small_config(),
    )
    .unwrap();
    assert!(trained.word().vocabulary().contains("Kot"));
    assert!(!trained.word().vocabulary().contains("kot"));

    let comparator = WordComparator::load(&store, &["pl"]).unwrap().with_transcriber(lexicon);
    let combined = comparator.get_combined_embedding("Kot", &["k"]).unwrap();
    let (word_half, _) = EmbeddingComposer::split(&combined);
    let word_model = comparator.models("pl").unwrap().word();
    assert_eq!(word_half, word_model.embedding("Kot"));
    assert_ne!(word_half, word_model.matrix().row(word_model.vocabulary().unknown_id()));

    let result = comparator.compare_words("Kot", "pl", "Kot", "pl").unwrap();
    assert_eq!(result.phonemes1, vec!["k", "ɔ", "t"]);
}

#[test]
fn test_negative_sampling_pipeline() {
    let dir = tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let normalizer = Normalizer::default();
    let config = TrainingConfig {
        objective: TrainingObjective::NegativeSampling { negatives: 3 },
        ..small_config()
    };

    let models = pipeline::train_language(
        &store,
        "en",
        &Corpus::from_phoneme_lines(["h ə l oʊ", "k æ t", "d ɔ g"], &normalizer),
        &Corpus::from_text_lines(english_sentences(), &normalizer),
        &config,
    )
    .unwrap();

    assert!(models.word().matrix().is_finite());
    assert!(models.word().metadata().final_loss.is_finite());
}

#[test]
fn test_config_file_drives_store() {
    let dir = tempdir().unwrap();
    let mut config = Config::default();
    config.storage.data_dir = dir.path().join("models");
    config.training = small_config();

    let path = dir.path().join("config.json");
    config.to_json_file(&path).unwrap();
    let loaded = Config::from_json_file(&path).unwrap();

    let store = ModelStore::from_config(&loaded.storage);
    assert_eq!(store.data_dir(), dir.path().join("models"));
    assert_eq!(loaded.training, small_config());
}

#[test]
fn test_transcriber_is_object_safe() {
    let mut lexicon = LexiconTranscriber::new();
    lexicon.insert("en", "cat", &["k", "æ", "t"]);
    let boxed: Box<dyn Transcriber> = Box::new(lexicon);
    assert_eq!(boxed.transcribe("cat", "en").unwrap(), vec!["k", "æ", "t"]);
}
