/// Per-speaker vocabulary with hierarchical back-off word selection.
///
/// A vocabulary is trained on one speaker's utterances and fills a sequence
/// of grammatical tags with words that speaker used in similar contexts,
/// falling back to coarser contexts when the exact one was never seen.

use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::frequency::FrequencyTable;
use crate::core::tagger::Annotator;

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("vocabulary has not been trained")]
    NotTrained,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Tag marking sentence start.
pub const START_SENTENCE: &str = "<s>";
/// Tag marking sentence end.
pub const END_SENTENCE: &str = "</s>";
/// Tag used when the requested tag was never seen in training.
pub const DEFAULT_NOUN_TAG: &str = "NN";

/// Tag assigned to sentence-final punctuation; dropped in favour of `</s>`.
const TERMINAL_PUNCTUATION_TAG: &str = ".";
/// Tokens written without a preceding space.
const TIGHT_PUNCTUATION: &[char] = &[',', ';', ':'];

/// The surroundings of one word position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    /// Lowercased.
    pub previous_word: String,
    pub previous_tag: String,
    pub tag: String,
    pub next_tag: String,
}

impl Context {
    pub fn new(previous_word: &str, previous_tag: &str, tag: &str, next_tag: &str) -> Self {
        Self {
            previous_word: previous_word.to_lowercase(),
            previous_tag: previous_tag.to_string(),
            tag: tag.to_string(),
            next_tag: next_tag.to_string(),
        }
    }
}

/// Which parts of a [`Context`] a table is keyed on, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextShape {
    /// (previous word, previous tag, tag, next tag)
    WordAndTags,
    /// (previous tag, tag, next tag)
    Tags,
    /// (previous tag, tag)
    PreviousTag,
    /// tag alone
    Tag,
}

impl ContextShape {
    /// Lookup precedence, finest to coarsest.
    pub const PRECEDENCE: [ContextShape; 4] = [
        ContextShape::WordAndTags,
        ContextShape::Tags,
        ContextShape::PreviousTag,
        ContextShape::Tag,
    ];

    pub fn key(&self, ctx: &Context) -> Vec<String> {
        match self {
            Self::WordAndTags => vec![
                ctx.previous_word.clone(),
                ctx.previous_tag.clone(),
                ctx.tag.clone(),
                ctx.next_tag.clone(),
            ],
            Self::Tags => vec![
                ctx.previous_tag.clone(),
                ctx.tag.clone(),
                ctx.next_tag.clone(),
            ],
            Self::PreviousTag => vec![ctx.previous_tag.clone(), ctx.tag.clone()],
            Self::Tag => vec![ctx.tag.clone()],
        }
    }
}

/// How a word lookup was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// A table of this shape had the context.
    Context(ContextShape),
    /// The tag was unseen; the generic noun table stood in.
    Noun,
    /// Neither the tag nor the noun tag was seen; some trained tag stood in.
    Arbitrary,
}

type WordTables = FxHashMap<Vec<String>, FrequencyTable<String>>;

/// A trainable vocabulary which populates sentences given their tag sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Back-off tiers in lookup order. Empty until trained.
    tiers: Vec<(ContextShape, WordTables)>,
    noun_tag: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            tiers: Vec::new(),
            noun_tag: DEFAULT_NOUN_TAG.to_string(),
        }
    }
}

impl Vocabulary {
    /// An untrained vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tag substituted for unseen tags.
    pub fn with_noun_tag(mut self, tag: &str) -> Self {
        self.noun_tag = tag.to_string();
        self
    }

    pub fn is_trained(&self) -> bool {
        !self.tiers.is_empty()
    }

    /// Train on raw utterances, e.g. every line one character speaks.
    ///
    /// Replaces anything learned before.
    pub fn train<S: AsRef<str>>(
        &mut self,
        utterances: &[S],
        annotator: &Annotator,
    ) -> Result<(), VocabularyError> {
        let sentences = utterances
            .iter()
            .flat_map(|utterance| annotator.annotate(utterance.as_ref()));
        self.train_tagged(sentences)
    }

    /// Train on sentences that are already split into `(word, tag)` pairs.
    pub fn train_tagged<I>(&mut self, sentences: I) -> Result<(), VocabularyError>
    where
        I: IntoIterator<Item = Vec<(String, String)>>,
    {
        let mut tiers: Vec<(ContextShape, WordTables)> = ContextShape::PRECEDENCE
            .iter()
            .map(|shape| (*shape, WordTables::default()))
            .collect();
        let mut sentence_count = 0usize;
        let mut observations = 0usize;

        for sentence in sentences {
            let mut tagged = Vec::with_capacity(sentence.len() + 2);
            tagged.push((START_SENTENCE.to_string(), START_SENTENCE.to_string()));
            tagged.extend(sentence);
            if tagged.len() > 1
                && tagged.last().map(|(_, tag)| tag.as_str()) == Some(TERMINAL_PUNCTUATION_TAG)
            {
                tagged.pop();
            }
            tagged.push((END_SENTENCE.to_string(), END_SENTENCE.to_string()));
            sentence_count += 1;

            for window in tagged.windows(3) {
                let (prev_word, prev_tag) = &window[0];
                let (word, tag) = &window[1];
                let next_tag = &window[2].1;

                // Capitalised words are kept as proper names unless they start the sentence
                let stored = if prev_tag == START_SENTENCE {
                    word.to_lowercase()
                } else {
                    word.clone()
                };

                let ctx = Context::new(prev_word, prev_tag, tag, next_tag);
                for (shape, tables) in tiers.iter_mut() {
                    tables
                        .entry(shape.key(&ctx))
                        .or_default()
                        .observe(stored.clone());
                }
                observations += 1;
            }
        }

        if observations == 0 {
            return Err(VocabularyError::InvalidInput(
                "training text contains no words".to_string(),
            ));
        }

        debug!(
            sentences = sentence_count,
            words = observations,
            contexts = tiers[0].1.len(),
            tags = tiers[tiers.len() - 1].1.len(),
            "vocabulary trained"
        );

        self.tiers = tiers;
        Ok(())
    }

    /// Find the finest table that knows this context.
    ///
    /// Tries each context shape in precedence order, then the noun tag, then
    /// the lexicographically first trained tag. Never misses on a trained
    /// vocabulary.
    pub fn best_table(
        &self,
        ctx: &Context,
    ) -> Result<(Backoff, &FrequencyTable<String>), VocabularyError> {
        if !self.is_trained() {
            return Err(VocabularyError::NotTrained);
        }

        for (shape, tables) in &self.tiers {
            if let Some(table) = tables.get(&shape.key(ctx)) {
                return Ok((Backoff::Context(*shape), table));
            }
        }

        let by_tag = self.tier(ContextShape::Tag).ok_or(VocabularyError::NotTrained)?;
        if let Some(table) = by_tag.get(&vec![self.noun_tag.clone()]) {
            return Ok((Backoff::Noun, table));
        }

        by_tag
            .iter()
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, table)| (Backoff::Arbitrary, table))
            .ok_or(VocabularyError::NotTrained)
    }

    /// Return a randomly chosen word of `tag` that fits between the given
    /// neighbours, weighted by how often it was seen there.
    ///
    /// Pass [`START_SENTENCE`] for the previous word/tag at the start of a
    /// sentence and [`END_SENTENCE`] for the next tag at its end.
    pub fn random_word(
        &self,
        previous_word: &str,
        previous_tag: &str,
        tag: &str,
        next_tag: &str,
        rng: &mut StdRng,
    ) -> Result<String, VocabularyError> {
        let ctx = Context::new(previous_word, previous_tag, tag, next_tag);
        let (_, table) = self.best_table(&ctx)?;
        table.sample(rng).cloned().ok_or(VocabularyError::NotTrained)
    }

    /// Map a tag sequence to words. Sentence sentinels are added when
    /// missing. Words come back as stored: sentence starts lowercased.
    pub fn tags_to_random_words<S: AsRef<str>>(
        &self,
        tag_sequence: &[S],
        rng: &mut StdRng,
    ) -> Result<Vec<String>, VocabularyError> {
        if !self.is_trained() {
            return Err(VocabularyError::NotTrained);
        }

        let tags = bounded(tag_sequence);
        let mut words: Vec<String> = Vec::with_capacity(tags.len().saturating_sub(2));
        for window in tags.windows(3) {
            let previous_word = words.last().map(String::as_str).unwrap_or(START_SENTENCE);
            let word = self.random_word(previous_word, window[0], window[1], window[2], rng)?;
            words.push(word);
        }
        Ok(words)
    }

    /// Fill a tag sequence and return it as a capitalised sentence ending
    /// with a period.
    pub fn build_sentence<S: AsRef<str>>(
        &self,
        tag_sequence: &[S],
        rng: &mut StdRng,
    ) -> Result<String, VocabularyError> {
        let words = self.tags_to_random_words(tag_sequence, rng)?;
        if words.is_empty() {
            return Err(VocabularyError::InvalidInput(
                "tag sequence has no tags between its sentinels".to_string(),
            ));
        }
        Ok(join_sentence(&words))
    }

    /// Table for one context key, e.g. `["the", "DT", "NN", "</s>"]` for
    /// [`ContextShape::WordAndTags`].
    pub fn table(&self, shape: ContextShape, key: &[&str]) -> Option<&FrequencyTable<String>> {
        let key: Vec<String> = key.iter().map(|s| s.to_string()).collect();
        self.tier(shape)?.get(&key)
    }

    /// Every context key trained for a shape.
    pub fn contexts(&self, shape: ContextShape) -> impl Iterator<Item = &[String]> {
        self.tier(shape)
            .into_iter()
            .flat_map(|tables| tables.keys().map(Vec::as_slice))
    }

    /// Tags seen in training.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self
            .contexts(ContextShape::Tag)
            .filter_map(|key| key.first().map(String::as_str))
            .collect();
        tags.sort_unstable();
        tags
    }

    fn tier(&self, shape: ContextShape) -> Option<&WordTables> {
        self.tiers
            .iter()
            .find(|(s, _)| *s == shape)
            .map(|(_, tables)| tables)
    }
}

/// Wrap a tag sequence in sentence sentinels unless already present.
fn bounded<S: AsRef<str>>(tag_sequence: &[S]) -> Vec<&str> {
    let mut tags: Vec<&str> = tag_sequence.iter().map(AsRef::as_ref).collect();
    if tags.first() != Some(&START_SENTENCE) {
        tags.insert(0, START_SENTENCE);
    }
    if tags.len() < 2 || tags.last() != Some(&END_SENTENCE) {
        tags.push(END_SENTENCE);
    }
    tags
}

/// Join words into a sentence: capitalise, tighten punctuation, add a period.
fn join_sentence(words: &[String]) -> String {
    let mut sentence = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            sentence.push_str(&capitalize(word));
            continue;
        }
        if !word.starts_with(TIGHT_PUNCTUATION) {
            sentence.push(' ');
        }
        sentence.push_str(word);
    }
    sentence.push('.');
    sentence
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Save a trained vocabulary to a RON file.
pub fn save_model(vocabulary: &Vocabulary, path: &std::path::Path) -> Result<(), VocabularyError> {
    let serialized = ron::ser::to_string_pretty(vocabulary, ron::ser::PrettyConfig::default())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    std::fs::write(path, serialized)?;
    Ok(())
}

/// Load a vocabulary from a RON file.
pub fn load_model(path: &std::path::Path) -> Result<Vocabulary, VocabularyError> {
    let contents = std::fs::read_to_string(path)?;
    let vocabulary: Vocabulary = ron::from_str(&contents)?;
    Ok(vocabulary)
}
