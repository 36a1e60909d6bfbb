/// Household example — a new evening in "The Winter House".
///
/// Trains on the bundled sample play, prints a generated script, then shows
/// a few single sentences per character with both template strategies.
///
/// Run with: cargo run --example household

use pastiche_engine::core::pipeline::PlayGenerator;
use pastiche_engine::schema::play::{Play, Speaker};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // --- Load the source play ---
    let play = Play::load_from_ron(Path::new("data/sample_play.ron"))
        .expect("Failed to load sample play");

    // --- Train on the bundled sentence-shape graph ---
    let generator = PlayGenerator::builder()
        .seed(1879)
        .build(&play)
        .expect("Failed to build generator");

    let script = generator.generate_seeded().expect("Failed to generate script");
    println!("{}", script);

    // --- One line per character ---
    println!("=== Voices ===\n");
    let mut rng = StdRng::seed_from_u64(7);
    for speaker in generator.speakers() {
        let sentence = generator
            .generate_sentence(speaker, &mut rng)
            .expect("Failed to generate sentence");
        println!("{:>16}: {}", speaker.to_string(), sentence);
    }

    // --- Same voices, sentence shapes from a treebank ---
    let treebank = PlayGenerator::builder()
        .treebank_file(Path::new("data/sample_treebank.mrg"))
        .build(&play)
        .expect("Failed to build treebank generator");

    println!("\n=== Treebank shapes ===\n");
    let martha = Speaker::character("MARTHA");
    for _ in 0..3 {
        let sentence = treebank
            .generate_sentence(&martha, &mut rng)
            .expect("Failed to generate sentence");
        println!("MARTHA: {}", sentence);
    }
}
