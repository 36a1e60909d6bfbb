/// Pastiche — generates a new script in the style of a source play.
///
/// Usage: pastiche <play.ron> [--seed <n>] [--states <states.txt> | --treebank <file.mrg>] [--config <config.ron>]
use pastiche_engine::core::config::GeneratorConfig;
use pastiche_engine::core::pipeline::PlayGenerator;
use pastiche_engine::schema::play::Play;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: pastiche <play.ron> [--seed <n>] [--states <states.txt> | --treebank <file.mrg>] [--config <config.ron>]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("{}", USAGE);
        return;
    }

    let play_path = &args[1];
    let mut seed: u64 = 42;
    let mut states_path = None;
    let mut treebank_path = None;
    let mut config_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--states" if i + 1 < args.len() => {
                i += 1;
                states_path = Some(args[i].clone());
            }
            "--treebank" if i + 1 < args.len() => {
                i += 1;
                treebank_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
        i += 1;
    }

    if states_path.is_some() && treebank_path.is_some() {
        eprintln!("Error: --states and --treebank are mutually exclusive");
        process::exit(1);
    }

    let play = Play::load_from_ron(Path::new(play_path)).unwrap_or_else(|e| {
        eprintln!("Error loading play '{}': {}", play_path, e);
        process::exit(1);
    });

    let config = match config_path {
        Some(ref path) => GeneratorConfig::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("Error loading config '{}': {}", path, e);
            process::exit(1);
        }),
        None => GeneratorConfig::default(),
    };

    let mut builder = PlayGenerator::builder().seed(seed).config(config);
    if let Some(ref path) = states_path {
        builder = builder.states_file(Path::new(path));
    }
    if let Some(ref path) = treebank_path {
        builder = builder.treebank_file(Path::new(path));
    }

    let generator = builder.build(&play).unwrap_or_else(|e| {
        eprintln!("Error training on '{}': {}", play_path, e);
        process::exit(1);
    });

    match generator.generate_seeded() {
        Ok(script) => print!("{}", script),
        Err(e) => {
            eprintln!("Generation failed: {}", e);
            process::exit(1);
        }
    }
}
