/// Play structure: speakers, lines, and acts.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("play '{0}' has no acts")]
    NoActs(String),
}

/// Who a line belongs to.
///
/// Stage directions are treated as one more voice: they take part in the
/// speaker order and get a vocabulary of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Speaker {
    Character(String),
    StageDirection,
}

impl Speaker {
    pub fn character(name: &str) -> Self {
        Self::Character(name.to_string())
    }

    pub fn is_stage_direction(&self) -> bool {
        matches!(self, Self::StageDirection)
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character(name) => write!(f, "{}", name),
            Self::StageDirection => write!(f, "STAGE DIRECTION"),
        }
    }
}

/// One utterance or stage direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Act {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub lines: Vec<Line>,
}

impl Act {
    /// Speakers in the order their lines appear.
    pub fn speaker_sequence(&self) -> Vec<Speaker> {
        self.lines.iter().map(|l| l.speaker.clone()).collect()
    }

    /// The title if set, otherwise the id.
    pub fn heading(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Play {
    pub title: String,
    pub acts: Vec<Act>,
}

impl Play {
    pub fn load_from_ron(path: &Path) -> Result<Self, PlayError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, PlayError> {
        let play: Play = ron::from_str(input)?;
        if play.acts.is_empty() {
            return Err(PlayError::NoActs(play.title));
        }
        Ok(play)
    }

    /// Every distinct speaker, in order of first appearance.
    pub fn speakers(&self) -> Vec<Speaker> {
        let mut seen = FxHashSet::default();
        self.lines()
            .filter(|l| seen.insert(&l.speaker))
            .map(|l| l.speaker.clone())
            .collect()
    }

    /// All of one speaker's lines across the play.
    pub fn lines_by_speaker(&self, speaker: &Speaker) -> Vec<&str> {
        self.lines()
            .filter(|l| &l.speaker == speaker)
            .map(|l| l.text.as_str())
            .collect()
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.acts.iter().flat_map(|a| a.lines.iter())
    }
}
