//! Phonembed CLI
//!
//! Command-line interface for training, inspecting and comparing
//! phoneme-aware word embeddings.

use clap::{Parser, Subcommand};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use log::error;
use phonembed::{
    pipeline, Config, Corpus, LanguageModels, LexiconTranscriber, ModelKind, ModelStore, Normalizer, Result,
    TrainingObjective, Transcriber, WordComparator, WordQuery,
};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "phonembed")]
#[command(version)]
#[command(about = "Phoneme-aware word embeddings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Model directory (overrides the configuration)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train and save the phoneme and word models of a language
    Train {
        /// Language code
        #[arg(short, long)]
        language: String,

        /// Word corpus (one sentence per line)
        #[arg(short, long)]
        words: PathBuf,

        /// Phoneme corpus (one transcription per line); defaults to the
        /// language's lexicon
        #[arg(short, long)]
        phonemes: Option<PathBuf>,

        /// Embedding dimension
        #[arg(long)]
        dim: Option<usize>,

        /// Context radius
        #[arg(long)]
        window: Option<usize>,

        /// Number of epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Random seed for reproducibility
        #[arg(short, long)]
        seed: Option<u64>,

        /// Train with this many negative samples instead of full softmax
        #[arg(short, long)]
        negatives: Option<usize>,
    },

    /// Compare two words
    Compare {
        /// First word
        word1: String,
        /// Language of the first word
        lang1: String,
        /// Second word
        word2: String,
        /// Language of the second word
        lang2: String,

        /// Space-separated phonemes of the first word (skips the lexicon)
        #[arg(long)]
        phonemes1: Option<String>,

        /// Space-separated phonemes of the second word (skips the lexicon)
        #[arg(long)]
        phonemes2: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the combined embedding of a word
    Embed {
        /// The word
        word: String,

        /// Language code
        #[arg(short, long)]
        language: String,

        /// Space-separated phonemes (skips the lexicon)
        #[arg(short, long)]
        phonemes: Option<String>,
    },

    /// Show model information
    Info {
        /// Language code
        #[arg(short, long)]
        language: String,

        /// Model kind (phoneme or word)
        #[arg(long, default_value = "word")]
        kind: String,

        /// Show the nearest tokens to this one
        #[arg(long)]
        neighbors: Option<String>,

        /// Number of neighbours
        #[arg(short = 'k', long, default_value = "10")]
        count: usize,
    },

    /// List stored models
    Discover,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let result = load_config(&cli).and_then(|config| match cli.command {
        Commands::Train {
            language,
            words,
            phonemes,
            dim,
            window,
            epochs,
            seed,
            negatives,
        } => {
            let mut config = config;
            let training = &mut config.training;
            if let Some(dim) = dim {
                training.embedding_dim = dim;
            }
            if let Some(window) = window {
                training.window_size = window;
            }
            if let Some(epochs) = epochs {
                training.epochs = epochs;
            }
            if seed.is_some() {
                training.seed = seed;
            }
            if let Some(negatives) = negatives {
                training.objective = TrainingObjective::NegativeSampling { negatives };
            }
            train(&config, &language, words, phonemes)
        }

        Commands::Compare {
            word1,
            lang1,
            word2,
            lang2,
            phonemes1,
            phonemes2,
            json,
        } => compare(&config, &word1, &lang1, &word2, &lang2, phonemes1, phonemes2, json),

        Commands::Embed {
            word,
            language,
            phonemes,
        } => embed(&config, &word, &language, phonemes),

        Commands::Info {
            language,
            kind,
            neighbors,
            count,
        } => show_info(&config, &language, &kind, neighbors, count),

        Commands::Discover => discover(&config),
    });

    if let Err(e) = result {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    Ok(config)
}

fn train(config: &Config, language: &str, words: PathBuf, phonemes: Option<PathBuf>) -> Result<()> {
    let start_time = Instant::now();
    config.training.validate()?;

    println!("Phonembed");
    println!("   Training {} from: {}", language, words.display());
    println!();

    let store = ModelStore::from_config(&config.storage);
    let normalizer = Normalizer::new(config.text.clone());

    let phoneme_corpus = match phonemes {
        Some(path) => Corpus::from_file(path, ModelKind::Phoneme, &normalizer)?,
        None => {
            let mut lexicon = LexiconTranscriber::new().with_normalizer(normalizer.clone());
            lexicon.load_file(language, store.lexicon_path(language))?;
            lexicon.phoneme_corpus(language)
        }
    };
    println!(
        "✓ Loaded {} phoneme sequences ({} tokens)",
        format_number(phoneme_corpus.len()),
        format_number(phoneme_corpus.token_count())
    );

    let word_corpus = Corpus::from_file(&words, ModelKind::Word, &normalizer)?;
    println!(
        "✓ Loaded {} sentences ({} tokens)",
        format_number(word_corpus.len()),
        format_number(word_corpus.token_count())
    );

    let bar_style = ProgressStyle::default_bar()
        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) ETA: {eta}")
        .map_err(|e| phonembed::PhonembedError::Config(e.to_string()))?
        .progress_chars("█▓▒░  ");
    let pb = ProgressBar::new(0);
    pb.set_style(bar_style);

    let models = pipeline::train_language_with_progress(
        &store,
        language,
        &phoneme_corpus,
        &word_corpus,
        &config.training,
        Some(&pb),
    )?;
    pb.finish_and_clear();

    println!();
    println!("Training complete in {}", HumanDuration(start_time.elapsed()));
    print_model_summary(&models);
    println!("   Output: {}", store.data_dir().join(language).display());

    Ok(())
}

fn print_model_summary(models: &LanguageModels) {
    for model in [models.phoneme(), models.word()] {
        let meta = model.metadata();
        println!(
            "   {}: {} tokens, {} examples, final loss {:.4}",
            meta.key(),
            format_number(model.vocabulary().known_len()),
            format_number(meta.examples),
            meta.final_loss
        );
    }
}

/// Format large numbers with commas for readability
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

fn split_phonemes(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(String::from).collect()
}

/// Phonemes from the command line, or from the language's lexicon keyed the
/// way the language's models were trained.
fn resolve_phonemes(
    store: &ModelStore,
    comparator: &WordComparator,
    word: &str,
    language: &str,
    given: Option<String>,
) -> Result<Vec<String>> {
    if let Some(raw) = given {
        return Ok(split_phonemes(&raw));
    }
    let normalizer = match comparator.models(language) {
        Some(models) => models.normalizer().clone(),
        None => {
            return Err(phonembed::PhonembedError::LanguageNotLoaded {
                language: language.to_string(),
            })
        }
    };
    let mut transcriber = LexiconTranscriber::new().with_normalizer(normalizer);
    transcriber.load_file(language, store.lexicon_path(language))?;
    transcriber.transcribe(word, language)
}

#[allow(clippy::too_many_arguments)]
fn compare(
    config: &Config,
    word1: &str,
    lang1: &str,
    word2: &str,
    lang2: &str,
    phonemes1: Option<String>,
    phonemes2: Option<String>,
    json: bool,
) -> Result<()> {
    let store = ModelStore::from_config(&config.storage);
    let mut languages = vec![lang1];
    if lang2 != lang1 {
        languages.push(lang2);
    }
    let comparator = WordComparator::load(&store, &languages)?;

    let phonemes1 = resolve_phonemes(&store, &comparator, word1, lang1, phonemes1)?;
    let phonemes2 = resolve_phonemes(&store, &comparator, word2, lang2, phonemes2)?;

    let result = comparator.compare_transcribed(
        &WordQuery::new(word1, lang1, &phonemes1),
        &WordQuery::new(word2, lang2, &phonemes2),
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{} ({}) vs {} ({}):", result.word1, result.language1, result.word2, result.language2);
    println!("  Cosine Similarity:  {:.4}", result.cosine_similarity);
    println!("  Euclidean Distance: {:.4}", result.euclidean_distance);
    println!("  Phonemes: {} | {}", result.phonemes1.join(" "), result.phonemes2.join(" "));

    Ok(())
}

fn embed(config: &Config, word: &str, language: &str, phonemes: Option<String>) -> Result<()> {
    let store = ModelStore::from_config(&config.storage);
    let comparator = WordComparator::load(&store, &[language])?;

    let phonemes = resolve_phonemes(&store, &comparator, word, language, phonemes)?;
    let embedding = comparator.get_combined_embedding(word, &phonemes)?;

    println!("Word: {}", word);
    println!("Phonemes: {}", phonemes.join(" "));
    println!("Dimension: {}", embedding.len());
    println!("{}", serde_json::to_string(&embedding)?);

    Ok(())
}

fn show_info(config: &Config, language: &str, kind: &str, neighbors: Option<String>, count: usize) -> Result<()> {
    let store = ModelStore::from_config(&config.storage);
    let kind: ModelKind = kind.parse()?;
    let model = store.load(language, kind)?;
    let meta = model.metadata();

    println!("Model: {}", store.path_for(language, kind).display());
    println!("  Kind: {}", meta.kind);
    println!("  Language: {}", meta.language);
    println!("  Vocabulary size: {}", format_number(model.vocabulary().known_len()));
    println!("  Embedding dimension: {}", meta.embedding_dim);
    println!("  Window size: {}", meta.window_size);
    println!("  Min count: {}", meta.min_count);
    println!("  Epochs: {}", meta.epochs);
    println!("  Seed: {}", meta.seed);
    println!("  Examples: {}", format_number(meta.examples));
    println!("  Final loss: {:.4}", meta.final_loss);
    println!(
        "  Text: lowercase={} punctuation-stripped={} nfc={}",
        meta.text.lowercase_words, meta.text.remove_punctuation, meta.text.unicode_normalize
    );

    if let Some(token) = neighbors {
        match model.most_similar(&token, count) {
            Some(similar) => {
                println!();
                println!("Tokens similar to '{}':", token);
                for (t, score) in similar {
                    println!("  {:.4}  {}", score, t);
                }
            }
            None => println!("'{}' not found in vocabulary", token),
        }
    }

    Ok(())
}

fn discover(config: &Config) -> Result<()> {
    let store = ModelStore::from_config(&config.storage);
    let keys = store.discover()?;

    if keys.is_empty() {
        println!("No models in {}", store.data_dir().display());
        return Ok(());
    }

    println!("Models in {}:", store.data_dir().display());
    for key in &keys {
        println!("  {}", key);
    }
    let complete = store.complete_languages()?;
    if !complete.is_empty() {
        println!("Ready for comparison: {}", complete.join(", "));
    }

    Ok(())
}
