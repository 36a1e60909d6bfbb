/// States Linter — validates a sentence-shape transition graph.
///
/// Usage: states_linter <states.txt> [--config <config.ron>] [--walks <n>]

use pastiche_engine::core::config::GeneratorConfig;
use pastiche_engine::core::template::{SentenceTemplate, TransitionGraph};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: states_linter <states.txt> [--config <config.ron>] [--walks <n>]");
        process::exit(0);
    }

    let states_path = &args[1];
    let mut config_path = None;
    let mut walks = 1000usize;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--walks" if i + 1 < args.len() => {
                i += 1;
                walks = args[i].parse().unwrap_or(1000);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(ref path) => GeneratorConfig::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("ERROR: Failed to load config: {}", e);
            process::exit(1);
        }),
        None => GeneratorConfig::default(),
    };

    let graph = match TransitionGraph::load(Path::new(states_path)) {
        Ok(graph) => graph
            .with_governors(config.governors.clone())
            .with_max_steps(config.max_walk_steps),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!("Loaded {} states", graph.len());

    let (errors, warnings) = lint_graph(&graph, walks);

    println!("\n=== States Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if !errors.is_empty() {
        process::exit(1);
    }
}

fn lint_graph(graph: &TransitionGraph, walks: usize) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for id in graph.unreachable_states() {
        warnings.push(format!("State '{}' is never reached from <START>", id));
    }

    // Governors naming states the graph doesn't define do nothing
    for governor in graph.governors() {
        for state in governor.states.iter().chain(&governor.blocks) {
            if graph.state(state).is_none() {
                warnings.push(format!(
                    "Governor '{}' refers to undefined state '{}'",
                    governor.name, state
                ));
            }
        }
    }

    let mut rng = StdRng::seed_from_u64(0);
    let mut lengths = Vec::with_capacity(walks);
    for _ in 0..walks {
        match graph.generate(&mut rng) {
            Ok(template) if template.is_empty() => {
                errors.push("A walk produced an empty sentence".to_string());
                break;
            }
            Ok(template) => lengths.push(template.len()),
            Err(e) => {
                errors.push(format!("Walk failed: {}", e));
                break;
            }
        }
    }

    if !lengths.is_empty() {
        let total: usize = lengths.iter().sum();
        let longest = lengths.iter().max().copied().unwrap_or(0);
        println!(
            "Sampled {} walks: average {:.1} tags, longest {}",
            lengths.len(),
            total as f64 / lengths.len() as f64,
            longest
        );
    }

    (errors, warnings)
}
