/// Sentence splitting and word tokenization for training text.

use rustc_hash::FxHashSet;

/// Splits raw text into sentences of word tokens.
pub trait SentenceTokenizer {
    fn sentences(&self, text: &str) -> Vec<Vec<String>>;
}

/// Characters that always become tokens of their own.
const PUNCTUATION: &[char] = &[
    '.', '!', '?', ',', ';', ':', '"', '(', ')', '[', ']', '\u{201c}', '\u{201d}', '\u{2014}',
];
/// Apostrophes: kept inside words (`don't`), split off at word edges.
const APOSTROPHES: &[char] = &['\'', '\u{2018}', '\u{2019}'];
const SENTENCE_ENDERS: &[char] = &['.', '!', '?'];
const CLOSING_BRACKETS: &[&str] = &[")", "]", "\u{201d}", "\u{2019}"];

/// Abbreviations whose trailing period does not end a sentence.
const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "st", "sr", "jr", "prof", "rev", "capt", "col", "gen", "lt", "sgt",
    "messrs", "mme", "mlle", "vs", "etc", "viz", "cf",
];

/// Whitespace-and-punctuation tokenizer with a small abbreviation list.
#[derive(Debug, Clone)]
pub struct SimpleTokenizer {
    abbreviations: FxHashSet<String>,
}

impl Default for SimpleTokenizer {
    fn default() -> Self {
        Self {
            abbreviations: DEFAULT_ABBREVIATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SimpleTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an abbreviation (without its period, case-insensitive).
    pub fn with_abbreviation(mut self, abbreviation: &str) -> Self {
        self.abbreviations
            .insert(abbreviation.trim_end_matches('.').to_lowercase());
        self
    }

    /// Tokenize text: split on whitespace, separate punctuation as individual tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for chunk in text.split_whitespace() {
            self.tokenize_chunk(chunk, &mut tokens);
        }
        tokens
    }

    fn tokenize_chunk(&self, chunk: &str, tokens: &mut Vec<String>) {
        let mut remaining = chunk;
        while let Some(first) = remaining.chars().next() {
            // Ellipses and double hyphens stay together
            if first == '.' || first == '-' {
                let run = remaining.chars().take_while(|c| *c == first).count();
                if first == '.' || run >= 2 {
                    tokens.push(remaining[..run].to_string());
                    remaining = &remaining[run..];
                    continue;
                }
            }

            if PUNCTUATION.contains(&first) || APOSTROPHES.contains(&first) {
                tokens.push(first.to_string());
                remaining = &remaining[first.len_utf8()..];
                continue;
            }

            let end = word_end(remaining);
            let mut word = &remaining[..end];
            let mut rest = &remaining[end..];

            // Trailing apostrophes close a quotation rather than belong to the word
            let trimmed = word.trim_end_matches(APOSTROPHES);
            let split_quote = &word[trimmed.len()..];
            if !trimmed.is_empty() && !split_quote.is_empty() {
                word = trimmed;
                rest = &remaining[trimmed.len()..];
            }

            if rest.starts_with('.')
                && !rest.starts_with("..")
                && self.abbreviations.contains(&word.to_lowercase())
            {
                tokens.push(format!("{}.", word));
                remaining = &rest[1..];
                continue;
            }

            tokens.push(word.to_string());
            remaining = rest;
        }
    }

    /// Split a token sequence into sentences at sentence-ending punctuation.
    ///
    /// Closing quotes and brackets that directly follow the terminator stay
    /// with the sentence they close.
    pub fn split_into_sentences(tokens: &[String]) -> Vec<Vec<String>> {
        let mut sentences = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut ended = false;

        for tok in tokens {
            if ended && !is_sentence_ender(tok) && !closes_quote(&current, tok) {
                sentences.push(std::mem::take(&mut current));
                ended = false;
            }
            if is_sentence_ender(tok) {
                ended = true;
            }
            current.push(tok.clone());
        }

        // Don't discard trailing tokens without sentence ender
        if !current.is_empty() {
            sentences.push(current);
        }

        sentences
    }
}

impl SentenceTokenizer for SimpleTokenizer {
    fn sentences(&self, text: &str) -> Vec<Vec<String>> {
        Self::split_into_sentences(&self.tokenize(text))
    }
}

/// Byte offset where the word at the start of `text` ends.
fn word_end(text: &str) -> usize {
    let punct = text
        .find(|c: char| PUNCTUATION.contains(&c))
        .unwrap_or(text.len());
    let dash = text.find("--").unwrap_or(text.len());
    punct.min(dash)
}

fn is_sentence_ender(tok: &str) -> bool {
    !tok.is_empty() && tok.chars().all(|c| SENTENCE_ENDERS.contains(&c))
}

/// A quote or bracket closing something opened earlier in `current`.
fn closes_quote(current: &[String], tok: &str) -> bool {
    if CLOSING_BRACKETS.contains(&tok) {
        return true;
    }
    if tok == "\"" || tok == "'" {
        let open = current.iter().filter(|t| t.as_str() == tok).count();
        return open % 2 == 1;
    }
    false
}
