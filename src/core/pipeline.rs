/// The play pipeline: speaker order → sentence shape → words.
///
/// Trains one speaker sequencer per act and one vocabulary per speaker,
/// then generates a script turn by turn.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::config::{ConfigError, GeneratorConfig};
use crate::core::speakers::{SequenceError, SpeakerSequencer};
use crate::core::tagger::{Annotator, TaggerError};
use crate::core::template::{SentenceTemplate, TemplateError, TransitionGraph};
use crate::core::treebank::RuleTable;
use crate::core::vocabulary::{Vocabulary, VocabularyError};
use crate::schema::play::{Play, PlayError, Speaker};

/// Tag the template may end on; realization supplies its own period.
const TERMINAL_TAG: &str = ".";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("play error: {0}")]
    Play(#[from] PlayError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("vocabulary error: {0}")]
    Vocabulary(#[from] VocabularyError),
    #[error("speaker sequence error: {0}")]
    Sequence(#[from] SequenceError),
    #[error("tagger error: {0}")]
    Tagger(#[from] TaggerError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("speaker has no trained vocabulary: {0}")]
    UnknownSpeaker(Speaker),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// One generated turn: a speaker and the sentences they say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub sentences: Vec<String>,
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.sentences.join(" ");
        match &self.speaker {
            Speaker::Character(name) => write!(f, "{}:\n{}", name.to_uppercase(), text),
            Speaker::StageDirection => write!(f, "[{}]", text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptAct {
    pub heading: String,
    pub turns: Vec<Turn>,
}

impl fmt::Display for ScriptAct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.heading)?;
        for turn in &self.turns {
            writeln!(f)?;
            writeln!(f, "{}", turn)?;
        }
        Ok(())
    }
}

/// A generated play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub title: String,
    pub acts: Vec<ScriptAct>,
}

impl Script {
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.acts.iter().flat_map(|a| a.turns.iter())
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for act in &self.acts {
            writeln!(f)?;
            write!(f, "{}", act)?;
        }
        Ok(())
    }
}

struct ActModel {
    heading: String,
    sequencer: SpeakerSequencer,
}

/// Trained models for one source play. Built via `PlayGenerator::builder()`.
pub struct PlayGenerator {
    title: String,
    acts: Vec<ActModel>,
    vocabularies: FxHashMap<Speaker, Vocabulary>,
    /// Sentences per line, one entry per training line.
    line_lengths: FxHashMap<Speaker, Vec<usize>>,
    template: Box<dyn SentenceTemplate + Send + Sync>,
    seed: u64,
}

impl fmt::Debug for PlayGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayGenerator")
            .field("title", &self.title)
            .field("acts", &self.acts.len())
            .field("speakers", &self.vocabularies.len())
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

enum TemplateSource {
    Bundled,
    StatesFile(PathBuf),
    StatesText(String),
    TreebankFile(PathBuf),
    TreebankText(String),
    Custom(Box<dyn SentenceTemplate + Send + Sync>),
}

/// Builder for constructing a `PlayGenerator`.
pub struct PlayGeneratorBuilder {
    seed: u64,
    config: GeneratorConfig,
    annotator: Option<Annotator>,
    template: TemplateSource,
}

impl PlayGenerator {
    pub fn builder() -> PlayGeneratorBuilder {
        PlayGeneratorBuilder {
            seed: 0,
            config: GeneratorConfig::default(),
            annotator: None,
            template: TemplateSource::Bundled,
        }
    }

    /// Generate a full script, one act per trained act.
    pub fn generate(&self, rng: &mut StdRng) -> Result<Script, PipelineError> {
        let mut acts = Vec::with_capacity(self.acts.len());

        for act in &self.acts {
            let speakers = act.sequencer.generate(rng)?;
            let mut turns = Vec::with_capacity(speakers.len());
            for speaker in speakers {
                if !self.vocabularies.contains_key(&speaker) {
                    warn!(speaker = %speaker, "no vocabulary for speaker; skipping turn");
                    continue;
                }
                let count = self.sentence_count(&speaker, rng);
                let sentences = (0..count)
                    .map(|_| self.generate_sentence(&speaker, rng))
                    .collect::<Result<Vec<_>, _>>()?;
                turns.push(Turn { speaker, sentences });
            }
            info!(act = %act.heading, turns = turns.len(), "act generated");
            acts.push(ScriptAct {
                heading: act.heading.clone(),
                turns,
            });
        }

        Ok(Script {
            title: self.title.clone(),
            acts,
        })
    }

    /// Generate with a fresh RNG seeded from the builder's seed.
    pub fn generate_seeded(&self) -> Result<Script, PipelineError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.generate(&mut rng)
    }

    /// One sentence in the voice of `speaker`.
    pub fn generate_sentence(
        &self,
        speaker: &Speaker,
        rng: &mut StdRng,
    ) -> Result<String, PipelineError> {
        let vocabulary = self
            .vocabularies
            .get(speaker)
            .ok_or_else(|| PipelineError::UnknownSpeaker(speaker.clone()))?;
        let mut tags = self.template.generate(rng)?;
        if tags.last().map(String::as_str) == Some(TERMINAL_TAG) {
            tags.pop();
        }
        Ok(vocabulary.build_sentence(&tags, rng)?)
    }

    /// How many sentences the next turn gets: one of the speaker's own line
    /// lengths, drawn uniformly. Stage directions always get one.
    fn sentence_count(&self, speaker: &Speaker, rng: &mut StdRng) -> usize {
        if speaker.is_stage_direction() {
            return 1;
        }
        self.line_lengths
            .get(speaker)
            .and_then(|lengths| lengths.choose(rng))
            .copied()
            .unwrap_or(1)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn act_count(&self) -> usize {
        self.acts.len()
    }

    /// Speakers with a trained vocabulary, sorted.
    pub fn speakers(&self) -> Vec<&Speaker> {
        let mut speakers: Vec<&Speaker> = self.vocabularies.keys().collect();
        speakers.sort();
        speakers
    }

    pub fn vocabulary(&self, speaker: &Speaker) -> Option<&Vocabulary> {
        self.vocabularies.get(speaker)
    }

    pub fn line_lengths(&self, speaker: &Speaker) -> Option<&[usize]> {
        self.line_lengths.get(speaker).map(Vec::as_slice)
    }
}

impl PlayGeneratorBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Tokenizer and tagger used for training. Defaults to
    /// `Annotator::english()`.
    pub fn annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// Walk the transition graph in a states file.
    pub fn states_file(mut self, path: &Path) -> Self {
        self.template = TemplateSource::StatesFile(path.to_path_buf());
        self
    }

    /// Walk a transition graph given as text.
    pub fn states(mut self, source: &str) -> Self {
        self.template = TemplateSource::StatesText(source.to_string());
        self
    }

    /// Expand rules learned from a bracketed treebank file.
    pub fn treebank_file(mut self, path: &Path) -> Self {
        self.template = TemplateSource::TreebankFile(path.to_path_buf());
        self
    }

    pub fn treebank(mut self, source: &str) -> Self {
        self.template = TemplateSource::TreebankText(source.to_string());
        self
    }

    /// Use any ready-made template strategy as is.
    pub fn template<T>(mut self, template: T) -> Self
    where
        T: SentenceTemplate + Send + Sync + 'static,
    {
        self.template = TemplateSource::Custom(Box::new(template));
        self
    }

    /// Train every model on `play`.
    pub fn build(self, play: &Play) -> Result<PlayGenerator, PipelineError> {
        self.config.validate()?;
        let annotator = match self.annotator {
            Some(annotator) => annotator,
            None => Annotator::english()?,
        };
        let template = build_template(self.template, &self.config)?;

        let mut vocabularies = FxHashMap::default();
        let mut line_lengths = FxHashMap::default();
        for speaker in play.speakers() {
            let lines = play.lines_by_speaker(&speaker);
            let mut vocabulary = Vocabulary::new().with_noun_tag(&self.config.noun_fallback_tag);
            match vocabulary.train(&lines, &annotator) {
                Ok(()) => {}
                Err(VocabularyError::InvalidInput(reason)) => {
                    warn!(speaker = %speaker, %reason, "speaker has no usable lines; skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            let lengths: Vec<usize> = lines
                .iter()
                .map(|line| annotator.sentence_count(line).max(1))
                .collect();
            debug!(speaker = %speaker, lines = lines.len(), "speaker trained");
            line_lengths.insert(speaker.clone(), lengths);
            vocabularies.insert(speaker, vocabulary);
        }
        if vocabularies.is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "play '{}' has no speakable lines",
                play.title
            )));
        }

        let mut acts = Vec::with_capacity(play.acts.len());
        for act in &play.acts {
            if act.lines.is_empty() {
                warn!(act = %act.id, "act has no lines; skipping");
                continue;
            }
            acts.push(ActModel {
                heading: act.heading().to_string(),
                sequencer: SpeakerSequencer::new(&act.speaker_sequence())?,
            });
        }

        info!(
            title = %play.title,
            acts = acts.len(),
            speakers = vocabularies.len(),
            "play generator built"
        );

        Ok(PlayGenerator {
            title: play.title.clone(),
            acts,
            vocabularies,
            line_lengths,
            template,
            seed: self.seed,
        })
    }
}

fn build_template(
    source: TemplateSource,
    config: &GeneratorConfig,
) -> Result<Box<dyn SentenceTemplate + Send + Sync>, PipelineError> {
    let configure_graph = |graph: TransitionGraph| {
        graph
            .with_governors(config.governors.clone())
            .with_max_steps(config.max_walk_steps)
    };
    let configure_rules = |rules: RuleTable| {
        rules
            .with_root(&config.treebank_root)
            .with_max_depth(config.max_expansion_depth)
    };

    let template: Box<dyn SentenceTemplate + Send + Sync> = match source {
        TemplateSource::Bundled => Box::new(configure_graph(TransitionGraph::english()?)),
        TemplateSource::StatesFile(path) => Box::new(configure_graph(TransitionGraph::load(&path)?)),
        TemplateSource::StatesText(text) => Box::new(configure_graph(TransitionGraph::parse(&text)?)),
        TemplateSource::TreebankFile(path) => Box::new(configure_rules(RuleTable::load(
            &path,
            config.rule_limits(),
        )?)),
        TemplateSource::TreebankText(text) => Box::new(configure_rules(
            RuleTable::from_treebank(&text, config.rule_limits())?,
        )),
        TemplateSource::Custom(template) => template,
    };
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::play::{Act, Line};

    fn line(speaker: Speaker, text: &str) -> Line {
        Line {
            speaker,
            text: text.to_string(),
        }
    }

    fn test_play() -> Play {
        let nora = Speaker::character("Nora");
        let helmer = Speaker::character("Helmer");
        Play {
            title: "A Test House".to_string(),
            acts: vec![Act {
                id: "act-1".to_string(),
                title: Some("ACT I".to_string()),
                lines: vec![
                    line(Speaker::StageDirection, "The room is warm."),
                    line(nora.clone(), "I have the black box. You see the letter."),
                    line(helmer.clone(), "The letter is very cold."),
                    line(nora.clone(), "She went to the door."),
                    line(helmer, "Nora is in the room."),
                    line(nora, "We saw a little tree."),
                ],
            }],
        }
    }

    /// Always the same shape.
    struct FixedTemplate(Vec<&'static str>);

    impl SentenceTemplate for FixedTemplate {
        fn generate(&self, _rng: &mut StdRng) -> Result<Vec<String>, TemplateError> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    #[test]
    fn generate_produces_every_act() {
        let generator = PlayGenerator::builder().seed(7).build(&test_play()).unwrap();
        let script = generator.generate_seeded().unwrap();
        assert_eq!(script.title, "A Test House");
        assert_eq!(script.acts.len(), 1);
        assert_eq!(script.acts[0].heading, "ACT I");
        assert_eq!(script.acts[0].turns.len(), 6);
    }

    #[test]
    fn generated_speakers_come_from_the_act() {
        let play = test_play();
        let generator = PlayGenerator::builder().build(&play).unwrap();
        let speakers = play.speakers();
        for seed in 0..10 {
            let script = generator
                .generate(&mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert!(script.turns().all(|t| speakers.contains(&t.speaker)));
        }
    }

    #[test]
    fn same_seed_same_script() {
        let generator = PlayGenerator::builder().seed(99).build(&test_play()).unwrap();
        assert_eq!(
            generator.generate_seeded().unwrap(),
            generator.generate_seeded().unwrap()
        );
    }

    #[test]
    fn sentences_follow_line_lengths() {
        let generator = PlayGenerator::builder().build(&test_play()).unwrap();
        let nora = Speaker::character("Nora");
        assert_eq!(generator.line_lengths(&nora), Some(&[2, 1, 1][..]));

        let script = generator.generate(&mut StdRng::seed_from_u64(5)).unwrap();
        for turn in script.turns() {
            let expected: &[usize] = if turn.speaker.is_stage_direction() {
                &[1]
            } else {
                generator.line_lengths(&turn.speaker).unwrap()
            };
            assert!(expected.contains(&turn.sentences.len()));
        }
    }

    #[test]
    fn fixed_template_realizes_in_speaker_voice() {
        let generator = PlayGenerator::builder()
            .template(FixedTemplate(vec!["DT", "NN", "."]))
            .build(&test_play())
            .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let sentence = generator
            .generate_sentence(&Speaker::character("Helmer"), &mut rng)
            .unwrap();
        // Helmer opens with "the" and only ends a sentence on "the room"
        assert_eq!(sentence, "The room.");
    }

    #[test]
    fn unknown_speaker_is_an_error() {
        let generator = PlayGenerator::builder().build(&test_play()).unwrap();
        let result =
            generator.generate_sentence(&Speaker::character("Rank"), &mut StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(PipelineError::UnknownSpeaker(_))));
    }

    #[test]
    fn treebank_strategy() {
        let generator = PlayGenerator::builder()
            .treebank_file(Path::new("tests/fixtures/treebank_sample.mrg"))
            .build(&test_play())
            .unwrap();
        let script = generator.generate(&mut StdRng::seed_from_u64(3)).unwrap();
        assert!(script
            .turns()
            .flat_map(|t| t.sentences.iter())
            .all(|s| s.ends_with('.')));
    }

    #[test]
    fn invalid_states_fail_the_build() {
        let result = PlayGenerator::builder()
            .states("<START> <NULL> A\n<END> <NULL>\n")
            .build(&test_play());
        assert!(matches!(
            result,
            Err(PipelineError::Template(TemplateError::Configuration(_)))
        ));
    }

    #[test]
    fn silent_play_is_rejected() {
        let play = Play {
            title: "Silence".to_string(),
            acts: vec![Act {
                id: "act-1".to_string(),
                title: None,
                lines: vec![line(Speaker::character("Ghost"), "")],
            }],
        };
        let result = PlayGenerator::builder().build(&play);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn script_display() {
        let script = Script {
            title: "T".to_string(),
            acts: vec![ScriptAct {
                heading: "ACT I".to_string(),
                turns: vec![
                    Turn {
                        speaker: Speaker::StageDirection,
                        sentences: vec!["A room.".to_string()],
                    },
                    Turn {
                        speaker: Speaker::character("Nora"),
                        sentences: vec!["Yes.".to_string(), "No.".to_string()],
                    },
                ],
            }],
        };
        assert_eq!(
            script.to_string(),
            "T\n\nACT I\n\n[A room.]\n\nNORA:\nYes. No.\n"
        );
    }
}
