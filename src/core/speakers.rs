/// Bigram model of who speaks next.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::schema::play::Speaker;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Speaker-order model trained on a single act.
///
/// Every adjacent pair in the training order is kept (duplicates included),
/// so sampling a pair uniformly samples a transition in proportion to how
/// often it occurred.
#[derive(Debug, Clone)]
pub struct SpeakerSequencer {
    pairs: Vec<(Speaker, Speaker)>,
    successors: FxHashMap<Speaker, Vec<Speaker>>,
    /// Used when there are no pairs at all (a one-line act).
    only: Option<Speaker>,
    training_len: usize,
}

impl SpeakerSequencer {
    pub fn new(speakers: &[Speaker]) -> Result<Self, SequenceError> {
        if speakers.is_empty() {
            return Err(SequenceError::InvalidInput(
                "speaker sequence is empty".to_string(),
            ));
        }

        let pairs: Vec<(Speaker, Speaker)> = speakers
            .windows(2)
            .map(|w| (w[0].clone(), w[1].clone()))
            .collect();
        let mut successors: FxHashMap<Speaker, Vec<Speaker>> = FxHashMap::default();
        for (from, to) in &pairs {
            successors.entry(from.clone()).or_default().push(to.clone());
        }
        let only = pairs.is_empty().then(|| speakers[0].clone());

        debug!(
            lines = speakers.len(),
            distinct = successors.len(),
            "speaker sequencer trained"
        );

        Ok(Self {
            pairs,
            successors,
            only,
            training_len: speakers.len(),
        })
    }

    /// Length of the sequence the model was trained on.
    pub fn training_len(&self) -> usize {
        self.training_len
    }

    pub fn pairs(&self) -> &[(Speaker, Speaker)] {
        &self.pairs
    }

    /// A new ordering as long as the training sequence.
    pub fn generate(&self, rng: &mut StdRng) -> Result<Vec<Speaker>, SequenceError> {
        self.generate_len(self.training_len, rng)
    }

    pub fn generate_len(&self, len: usize, rng: &mut StdRng) -> Result<Vec<Speaker>, SequenceError> {
        if len == 0 {
            return Err(SequenceError::InvalidInput(
                "requested sequence length must be positive".to_string(),
            ));
        }

        let mut sequence = Vec::with_capacity(len);
        sequence.push(self.pick_pair_head(rng)?);

        while sequence.len() < len {
            let last = &sequence[sequence.len() - 1];
            let next = match self.successors.get(last).and_then(|s| s.choose(rng)) {
                Some(next) => next.clone(),
                // Last speaker never spoke before anyone else: start afresh
                None => self.pick_pair_head(rng)?,
            };
            sequence.push(next);
        }

        Ok(sequence)
    }

    fn pick_pair_head(&self, rng: &mut StdRng) -> Result<Speaker, SequenceError> {
        match self.pairs.choose(rng) {
            Some((first, _)) => Ok(first.clone()),
            None => self
                .only
                .clone()
                .ok_or_else(|| SequenceError::InvalidInput("model has no speakers".to_string())),
        }
    }
}
