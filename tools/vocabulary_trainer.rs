/// Vocabulary Trainer — trains a speaker vocabulary from plain text.
///
/// Usage: vocabulary_trainer --input <file.txt> --output <vocabulary.ron> [--lexicon <lexicon.ron>] [--noun-tag <TAG>]
use pastiche_engine::core::tagger::{Annotator, LexiconTagger};
use pastiche_engine::core::tokenize::SimpleTokenizer;
use pastiche_engine::core::vocabulary::{save_model, ContextShape, Vocabulary};
use std::env;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: vocabulary_trainer --input <file.txt> --output <vocabulary.ron> [--lexicon <lexicon.ron>] [--noun-tag <TAG>]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut input = None;
    let mut output = None;
    let mut lexicon = None;
    let mut noun_tag = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" if i + 1 < args.len() => {
                i += 1;
                input = Some(args[i].clone());
            }
            "--output" if i + 1 < args.len() => {
                i += 1;
                output = Some(args[i].clone());
            }
            "--lexicon" if i + 1 < args.len() => {
                i += 1;
                lexicon = Some(args[i].clone());
            }
            "--noun-tag" if i + 1 < args.len() => {
                i += 1;
                noun_tag = Some(args[i].clone());
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input_path = input.unwrap_or_else(|| {
        eprintln!("Error: --input is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let output_path = output.unwrap_or_else(|| {
        eprintln!("Error: --output is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let tagger = match lexicon {
        Some(ref path) => LexiconTagger::load_from_ron(Path::new(path)),
        None => LexiconTagger::english(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Error loading lexicon: {}", e);
        process::exit(1);
    });
    let annotator = Annotator::new(SimpleTokenizer::new(), tagger);

    let text = std::fs::read_to_string(&input_path).unwrap_or_else(|e| {
        eprintln!("Error reading input file '{}': {}", input_path, e);
        process::exit(1);
    });

    println!("Training vocabulary from '{}'...", input_path);
    let mut vocabulary = Vocabulary::new();
    if let Some(ref tag) = noun_tag {
        vocabulary = vocabulary.with_noun_tag(tag);
    }
    vocabulary.train(&[text], &annotator).unwrap_or_else(|e| {
        eprintln!("Error training vocabulary: {}", e);
        process::exit(1);
    });

    println!(
        "Vocabulary trained: {} full contexts, {} tags",
        vocabulary.contexts(ContextShape::WordAndTags).count(),
        vocabulary.tags().len()
    );
    println!("Tags found: {:?}", vocabulary.tags());

    save_model(&vocabulary, Path::new(&output_path)).unwrap_or_else(|e| {
        eprintln!("Error saving vocabulary to '{}': {}", output_path, e);
        process::exit(1);
    });

    println!("Vocabulary saved to '{}'", output_path);
}
