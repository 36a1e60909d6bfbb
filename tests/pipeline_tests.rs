/// Pipeline integration tests — end-to-end play-to-script generation.

use pastiche_engine::core::config::GeneratorConfig;
use pastiche_engine::core::pipeline::{PipelineError, PlayGenerator};
use pastiche_engine::core::template::{Governor, TemplateError};
use pastiche_engine::core::vocabulary::VocabularyError;
use pastiche_engine::schema::play::{Play, Speaker};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

fn sample_play() -> Play {
    Play::load_from_ron(Path::new("data/sample_play.ron")).unwrap()
}

fn tiny_play() -> Play {
    Play::load_from_ron(Path::new("tests/fixtures/tiny_play.ron")).unwrap()
}

#[test]
fn sample_play_generates_every_act() {
    let play = sample_play();
    let generator = PlayGenerator::builder().seed(2026).build(&play).unwrap();
    assert_eq!(generator.act_count(), 2);

    let script = generator.generate_seeded().unwrap();
    assert_eq!(script.title, "The Winter House");
    for (generated, source) in script.acts.iter().zip(&play.acts) {
        assert_eq!(generated.heading, source.heading());
        assert_eq!(generated.turns.len(), source.lines.len());
    }
}

#[test]
fn every_turn_has_a_trained_speaker_and_real_sentences() {
    let play = sample_play();
    let speakers = play.speakers();
    let generator = PlayGenerator::builder().build(&play).unwrap();

    for seed in 0..5 {
        let script = generator.generate(&mut StdRng::seed_from_u64(seed)).unwrap();
        for turn in script.turns() {
            assert!(speakers.contains(&turn.speaker));
            assert!(!turn.sentences.is_empty());
            for sentence in &turn.sentences {
                assert!(sentence.ends_with('.'));
                assert!(sentence.chars().next().is_some_and(|c| !c.is_lowercase()));
            }
        }
    }
}

#[test]
fn speakers_only_appear_in_acts_they_speak_in() {
    let play = sample_play();
    let generator = PlayGenerator::builder().build(&play).unwrap();
    let script = generator.generate(&mut StdRng::seed_from_u64(11)).unwrap();

    // Doctor Lund only speaks in the second act
    let lund = Speaker::character("DOCTOR LUND");
    assert!(script.acts[0].turns.iter().all(|t| t.speaker != lund));
}

#[test]
fn different_seeds_differ() {
    let play = sample_play();
    let a = PlayGenerator::builder().seed(1).build(&play).unwrap();
    let b = PlayGenerator::builder().seed(2).build(&play).unwrap();
    assert_ne!(
        a.generate_seeded().unwrap().to_string(),
        b.generate_seeded().unwrap().to_string()
    );
}

#[test]
fn script_renders_speakers_and_stage_directions() {
    let generator = PlayGenerator::builder().seed(5).build(&sample_play()).unwrap();
    let text = generator.generate_seeded().unwrap().to_string();
    assert!(text.starts_with("The Winter House\n\nACT I\n"));
    assert!(text.contains("\nACT II\n"));
    for line in text.lines().filter(|l| l.starts_with('[')) {
        assert!(line.ends_with(".]"));
    }
}

#[test]
fn single_sentence_round_trip() {
    let generator = PlayGenerator::builder().build(&tiny_play()).unwrap();
    let ben = generator.vocabulary(&Speaker::character("BEN")).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let sentence = ben
        .build_sentence(&["<s>", "DT", "JJ", "NN", "VBD", "RB", "JJ", "</s>"], &mut rng)
        .unwrap();
    assert_eq!(sentence, "The black cat was very cold.");
}

#[test]
fn line_lengths_count_sentences() {
    let generator = PlayGenerator::builder().build(&tiny_play()).unwrap();
    let anna = Speaker::character("ANNA");
    assert_eq!(generator.line_lengths(&anna), Some(&[1, 2][..]));
}

#[test]
fn treebank_generator_uses_same_vocabularies() {
    let play = tiny_play();
    let generator = PlayGenerator::builder()
        .treebank_file(Path::new("tests/fixtures/treebank_sample.mrg"))
        .seed(3)
        .build(&play)
        .unwrap();
    let script = generator.generate_seeded().unwrap();
    assert_eq!(script.acts[0].turns.len(), 4);
}

#[test]
fn custom_states_file() {
    let generator = PlayGenerator::builder()
        .states_file(Path::new("tests/fixtures/states_test.txt"))
        .build(&tiny_play())
        .unwrap();
    let mut rng = StdRng::seed_from_u64(8);
    let sentence = generator
        .generate_sentence(&Speaker::StageDirection, &mut rng)
        .unwrap();
    assert!(sentence.ends_with('.'));
}

#[test]
fn missing_states_file_is_an_io_error() {
    let result = PlayGenerator::builder()
        .states_file(Path::new("tests/fixtures/no_such_states.txt"))
        .build(&tiny_play());
    assert!(matches!(
        result,
        Err(PipelineError::Template(TemplateError::Io(_)))
    ));
}

#[test]
fn config_is_applied() {
    let config = GeneratorConfig {
        governors: vec![Governor::prepositional()],
        max_walk_steps: 1,
        ..GeneratorConfig::default()
    };
    let generator = PlayGenerator::builder()
        .config(config)
        .build(&tiny_play())
        .unwrap();
    // No sentence of the bundled graph fits in a single step
    let result =
        generator.generate_sentence(&Speaker::character("ANNA"), &mut StdRng::seed_from_u64(0));
    assert!(matches!(
        result,
        Err(PipelineError::Template(TemplateError::Configuration(_)))
    ));
}

#[test]
fn invalid_config_fails_the_build() {
    let config = GeneratorConfig {
        noun_fallback_tag: String::new(),
        ..GeneratorConfig::default()
    };
    let result = PlayGenerator::builder().config(config).build(&tiny_play());
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn untrained_vocabulary_reports_not_trained() {
    let vocabulary = pastiche_engine::core::vocabulary::Vocabulary::new();
    let result = vocabulary.build_sentence(&["DT", "NN"], &mut StdRng::seed_from_u64(0));
    assert!(matches!(result, Err(VocabularyError::NotTrained)));
}
