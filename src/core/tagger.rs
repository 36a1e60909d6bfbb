/// Part-of-speech tagging: a lexicon tagger with suffix heuristics, and the
/// `Annotator` that pairs it with a tokenizer.

use rustc_hash::FxHashMap;
use std::path::Path;
use thiserror::Error;

use crate::core::tokenize::{SentenceTokenizer, SimpleTokenizer};

#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Assigns one Penn-Treebank-style tag to each token of a sentence.
pub trait PosTagger {
    fn tag(&self, tokens: &[String]) -> Vec<String>;
}

const ENGLISH_LEXICON: &str = include_str!("../../data/lexicon.ron");

/// Dictionary tagger: known words take their lexicon tag, unknown words are
/// guessed from shape and suffix.
#[derive(Debug, Clone, Default)]
pub struct LexiconTagger {
    lexicon: FxHashMap<String, String>,
}

impl LexiconTagger {
    /// An empty lexicon; every word is tagged by heuristics alone.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundled English lexicon of closed-class and common words.
    pub fn english() -> Result<Self, TaggerError> {
        Self::parse_ron(ENGLISH_LEXICON)
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, TaggerError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a `{ "word": "TAG", ... }` RON map.
    pub fn parse_ron(input: &str) -> Result<Self, TaggerError> {
        let raw: FxHashMap<String, String> = ron::from_str(input)?;
        Ok(Self::from_pairs(raw))
    }

    pub fn from_pairs<I, W, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (W, T)>,
        W: Into<String>,
        T: Into<String>,
    {
        let lexicon = pairs
            .into_iter()
            .map(|(w, t)| (w.into().to_lowercase(), t.into()))
            .collect();
        Self { lexicon }
    }

    /// Add or override one entry.
    pub fn with_entry(mut self, word: &str, tag: &str) -> Self {
        self.lexicon.insert(word.to_lowercase(), tag.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    fn tag_word(&self, word: &str, sentence_initial: bool) -> String {
        let lower = word.to_lowercase();
        if let Some(tag) = self.lexicon.get(&lower) {
            return tag.clone();
        }

        if word
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '.')
            && word.chars().any(|c| c.is_ascii_digit())
        {
            return "CD".to_string();
        }

        // Assume capitalised words are proper names unless they start the sentence
        if !sentence_initial && word.chars().next().is_some_and(char::is_uppercase) {
            return "NNP".to_string();
        }

        suffix_tag(&lower).to_string()
    }
}

impl PosTagger for LexiconTagger {
    fn tag(&self, tokens: &[String]) -> Vec<String> {
        let mut tags = Vec::with_capacity(tokens.len());
        let mut seen_word = false;
        let mut open_quote = false;

        for token in tokens {
            if let Some(tag) = punctuation_tag(token, &mut open_quote) {
                tags.push(tag.to_string());
                continue;
            }
            tags.push(self.tag_word(token, !seen_word));
            seen_word = true;
        }

        tags
    }
}

/// Tags for punctuation tokens. Quote characters alternate between opening
/// and closing within a sentence.
fn punctuation_tag(token: &str, open_quote: &mut bool) -> Option<&'static str> {
    let tag = match token {
        "," => ",",
        ";" | ":" | "--" | "-" | "\u{2014}" => ":",
        "(" | "[" => "(",
        ")" | "]" => ")",
        "\u{201c}" | "\u{2018}" => "``",
        "\u{201d}" | "\u{2019}" => "''",
        "\"" | "'" => {
            *open_quote = !*open_quote;
            if *open_quote {
                "``"
            } else {
                "''"
            }
        }
        t if !t.is_empty() && t.chars().all(|c| matches!(c, '.' | '!' | '?')) => ".",
        _ => return None,
    };
    Some(tag)
}

fn suffix_tag(word: &str) -> &'static str {
    let len = word.chars().count();
    if len > 3 && word.ends_with("ly") {
        "RB"
    } else if len > 4 && word.ends_with("ing") {
        "VBG"
    } else if len > 3 && word.ends_with("ed") {
        "VBD"
    } else if ["ness", "ment", "tion", "sion", "ity"]
        .iter()
        .any(|s| word.ends_with(s))
    {
        "NN"
    } else if len > 4
        && ["ous", "ful", "ive", "able", "ible", "less", "ish"]
            .iter()
            .any(|s| word.ends_with(s))
    {
        "JJ"
    } else if len > 3 && word.ends_with('s') && !word.ends_with("ss") {
        "NNS"
    } else {
        "NN"
    }
}

/// A tokenizer and a tagger used together to turn raw utterances into
/// tagged sentences.
pub struct Annotator {
    tokenizer: Box<dyn SentenceTokenizer + Send + Sync>,
    tagger: Box<dyn PosTagger + Send + Sync>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator").finish_non_exhaustive()
    }
}

impl Annotator {
    pub fn new<S, P>(tokenizer: S, tagger: P) -> Self
    where
        S: SentenceTokenizer + Send + Sync + 'static,
        P: PosTagger + Send + Sync + 'static,
    {
        Self {
            tokenizer: Box::new(tokenizer),
            tagger: Box::new(tagger),
        }
    }

    /// `SimpleTokenizer` with the bundled English lexicon.
    pub fn english() -> Result<Self, TaggerError> {
        Ok(Self::new(SimpleTokenizer::new(), LexiconTagger::english()?))
    }

    /// Split `text` into sentences of `(word, tag)` pairs.
    pub fn annotate(&self, text: &str) -> Vec<Vec<(String, String)>> {
        self.tokenizer
            .sentences(text)
            .into_iter()
            .map(|sentence| {
                let tags = self.tagger.tag(&sentence);
                sentence.into_iter().zip(tags).collect()
            })
            .collect()
    }

    pub fn sentence_count(&self, text: &str) -> usize {
        self.tokenizer.sentences(text).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lexicon_words_take_lexicon_tag() {
        let tagger = LexiconTagger::from_pairs([("the", "DT"), ("cold", "JJ")]);
        let tags = tagger.tag(&tokens(&["The", "cold", "cat"]));
        assert_eq!(tags, vec!["DT", "JJ", "NN"]);
    }

    #[test]
    fn capitalised_mid_sentence_is_proper_noun() {
        let tagger = LexiconTagger::new().with_entry("to", "TO");
        let tags = tagger.tag(&tokens(&["Speak", "to", "Emma"]));
        assert_eq!(tags[0], "NN");
        assert_eq!(tags[2], "NNP");
    }

    #[test]
    fn sentence_initial_skips_leading_quote() {
        let tagger = LexiconTagger::new();
        let tags = tagger.tag(&tokens(&["\"", "Nora", "\""]));
        assert_eq!(tags, vec!["``", "NN", "''"]);
    }

    #[test]
    fn punctuation_tags() {
        let tagger = LexiconTagger::new();
        let tags = tagger.tag(&tokens(&["well", ",", "now", ";", "go", "--", "then", "?"]));
        assert_eq!(tags, vec!["NN", ",", "NN", ":", "NN", ":", "NN", "."]);
    }

    #[test]
    fn suffix_heuristics() {
        let tagger = LexiconTagger::new();
        let tags = tagger.tag(&tokens(&[
            "x", "quickly", "singing", "looked", "kindness", "dangerous", "letters",
        ]));
        assert_eq!(tags, vec!["NN", "RB", "VBG", "VBD", "NN", "JJ", "NNS"]);
    }

    #[test]
    fn numbers_are_cardinal() {
        let tagger = LexiconTagger::new();
        let tags = tagger.tag(&tokens(&["pay", "1,000", "crowns"]));
        assert_eq!(tags[1], "CD");
    }

    #[test]
    fn english_lexicon_loads() {
        let tagger = LexiconTagger::english().unwrap();
        assert!(!tagger.is_empty());
        let tags = tagger.tag(&tokens(&["The", "black", "cat", "was", "very", "cold", "."]));
        assert_eq!(tags, vec!["DT", "JJ", "NN", "VBD", "RB", "JJ", "."]);
    }

    #[test]
    fn annotator_pairs_words_with_tags() {
        let annotator = Annotator::new(
            SimpleTokenizer::new(),
            LexiconTagger::from_pairs([("to", "TO"), ("be", "VB"), ("or", "CC"), ("not", "RB")]),
        );
        let sentences = annotator.annotate("To be. Or not to be?");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0][0], ("To".to_string(), "TO".to_string()));
        assert_eq!(sentences[1][4], ("?".to_string(), ".".to_string()));
        assert_eq!(annotator.sentence_count("To be. Or not to be?"), 2);
    }
}
