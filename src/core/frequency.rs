/// Observed-count tables with weighted random draws.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Candidate values paired with how often each was observed.
///
/// Entries keep first-seen order, so a seeded draw over the same training
/// data always lands on the same candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTable<T> {
    entries: Vec<(T, u32)>,
}

impl<T> Default for FrequencyTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: PartialEq> FrequencyTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more observation of `value`.
    pub fn observe(&mut self, value: T) {
        if let Some(entry) = self.entries.iter_mut().find(|(v, _)| v == &value) {
            entry.1 += 1;
        } else {
            self.entries.push((value, 1));
        }
    }

    /// Observed count for `value` (0 if never seen).
    pub fn count(&self, value: &T) -> u32 {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }
}

impl<T> FrequencyTable<T> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| u64::from(*c)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, u32)> {
        self.entries.iter().map(|(v, c)| (v, *c))
    }

    /// Draw one candidate with probability proportional to its count.
    ///
    /// Returns `None` only for an empty table.
    pub fn sample(&self, rng: &mut StdRng) -> Option<&T> {
        let weights: Vec<u32> = self.entries.iter().map(|(_, count)| *count).collect();
        let dist = WeightedIndex::new(&weights).ok()?;
        Some(&self.entries[dist.sample(rng)].0)
    }
}

impl<T: PartialEq> FromIterator<T> for FrequencyTable<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = FrequencyTable::new();
        for value in iter {
            table.observe(value);
        }
        table
    }
}
