/// Sentence templates: tag sequences from a transition graph of
/// grammatical states.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("unknown state or category: {0}")]
    UnknownState(String),
    #[error("rule expansion exceeded depth {0}")]
    DepthExceeded(usize),
    #[error("treebank parse error: {0}")]
    TreebankParse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// State every walk starts from.
pub const START_STATE: &str = "<START>";
/// State every walk ends at.
pub const END_STATE: &str = "<END>";
/// Output literal for states that emit no tag.
pub const NULL_OUTPUT: &str = "<NULL>";

/// Default upper bound on states visited in one walk.
pub const DEFAULT_MAX_WALK_STEPS: usize = 500;

const ENGLISH_STATES: &str = include_str!("../../data/states.txt");

/// Anything that can produce the tag shape of one sentence.
pub trait SentenceTemplate {
    /// One sentence as a sequence of tags, without sentence sentinels.
    fn generate(&self, rng: &mut StdRng) -> Result<Vec<String>, TemplateError>;
}

/// A node of the transition graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateState {
    pub id: String,
    /// Tag emitted when the walk passes through; `None` for structural states.
    pub output: Option<String>,
    /// Successor state ids, in file order. Duplicates weight a successor.
    pub transitions: Vec<String>,
}

impl TemplateState {
    /// Pick a successor uniformly.
    pub fn pick_transition(&self, rng: &mut StdRng) -> Option<&str> {
        self.transitions.choose(rng).map(String::as_str)
    }
}

/// Limits how often a family of states may be entered in one sentence.
///
/// Entries are counted as the walk commits to them. Once a family has been
/// entered `cap` times, any pick landing on a `blocks` state is re-drawn
/// among the current state's other successors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Governor {
    pub name: String,
    pub states: Vec<String>,
    pub cap: u32,
    pub blocks: Vec<String>,
}

impl Governor {
    /// Prepositional phrases: at most two per sentence.
    pub fn prepositional() -> Self {
        Self {
            name: "prepositional".to_string(),
            states: vec!["PP".to_string()],
            cap: 2,
            blocks: vec!["PP".to_string()],
        }
    }

    /// Coordination: at most two conjunctions, after which prepositional
    /// phrases are refused too.
    pub fn coordination() -> Self {
        Self {
            name: "coordination".to_string(),
            states: vec!["CC".to_string()],
            cap: 2,
            blocks: vec!["CC".to_string(), "PP".to_string()],
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::prepositional(), Self::coordination()]
    }

    fn counts(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }
}

/// A finite-state machine over grammatical categories.
#[derive(Debug, Clone)]
pub struct TransitionGraph {
    states: FxHashMap<String, TemplateState>,
    /// State ids in file order.
    order: Vec<String>,
    governors: Vec<Governor>,
    max_steps: usize,
}

impl TransitionGraph {
    /// Load a transition graph from a states file.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// The bundled English sentence-shape graph.
    pub fn english() -> Result<Self, TemplateError> {
        Self::parse(ENGLISH_STATES)
    }

    /// Parse the line format `STATE OUTPUT [SUCCESSOR...]`.
    ///
    /// Blank lines and lines starting with `#` are skipped. The graph is
    /// validated before it is returned: one `<START>`, one `<END>`, every
    /// successor defined, no dead ends, and `<END>` reachable from every
    /// state the walk can reach.
    pub fn parse(input: &str) -> Result<Self, TemplateError> {
        let mut states = FxHashMap::default();
        let mut order = Vec::new();

        for (line_no, line) in input.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() < 2 {
                return Err(TemplateError::Configuration(format!(
                    "line {}: expected STATE OUTPUT [SUCCESSOR...], got '{}'",
                    line_no + 1,
                    trimmed
                )));
            }

            let id = fields[0].to_string();
            let output = match fields[1] {
                NULL_OUTPUT => None,
                tag => Some(tag.to_string()),
            };
            let transitions = fields[2..].iter().map(|s| s.to_string()).collect();

            if states.contains_key(&id) {
                return Err(TemplateError::Configuration(format!(
                    "line {}: state '{}' is defined twice",
                    line_no + 1,
                    id
                )));
            }
            order.push(id.clone());
            states.insert(
                id.clone(),
                TemplateState {
                    id,
                    output,
                    transitions,
                },
            );
        }

        let graph = Self {
            states,
            order,
            governors: Governor::defaults(),
            max_steps: DEFAULT_MAX_WALK_STEPS,
        };
        graph.validate()?;
        debug!(states = graph.order.len(), "transition graph loaded");
        Ok(graph)
    }

    pub fn with_governors(mut self, governors: Vec<Governor>) -> Self {
        self.governors = governors;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn governors(&self) -> &[Governor] {
        &self.governors
    }

    pub fn state(&self, id: &str) -> Option<&TemplateState> {
        self.states.get(id)
    }

    /// States in definition order.
    pub fn states(&self) -> impl Iterator<Item = &TemplateState> {
        self.order.iter().filter_map(|id| self.states.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Defined states a walk from `<START>` can never visit.
    pub fn unreachable_states(&self) -> Vec<&str> {
        let (graph, index) = self.as_digraph();
        let mut reached = FxHashSet::default();
        if let Some(&start) = index.get(START_STATE) {
            let mut bfs = Bfs::new(&graph, start);
            while let Some(node) = bfs.next(&graph) {
                reached.insert(node);
            }
        }
        self.order
            .iter()
            .filter(|id| !index.get(id.as_str()).is_some_and(|n| reached.contains(n)))
            .map(String::as_str)
            .collect()
    }

    /// Walk from `start` to `<END>`, collecting the outputs of visited states.
    pub fn generate_from(&self, start: &str, rng: &mut StdRng) -> Result<Vec<String>, TemplateError> {
        let mut current = self
            .states
            .get(start)
            .ok_or_else(|| TemplateError::UnknownState(start.to_string()))?;
        let mut template = Vec::new();
        let mut entries = vec![0u32; self.governors.len()];
        let mut steps = 0usize;

        while current.id != END_STATE {
            steps += 1;
            if steps > self.max_steps {
                return Err(TemplateError::Configuration(format!(
                    "walk from '{}' did not reach {} within {} steps",
                    start, END_STATE, self.max_steps
                )));
            }

            if let Some(output) = &current.output {
                template.push(output.clone());
            }

            let picked = self.pick_governed(current, &entries, rng)?;
            for (count, governor) in entries.iter_mut().zip(&self.governors) {
                if governor.counts(picked) {
                    *count += 1;
                }
            }
            current = self
                .states
                .get(picked)
                .ok_or_else(|| TemplateError::UnknownState(picked.to_string()))?;
        }

        Ok(template)
    }

    /// Pick the next state, honouring every engaged governor when the
    /// current state leaves any choice.
    fn pick_governed<'a>(
        &self,
        state: &'a TemplateState,
        entries: &[u32],
        rng: &mut StdRng,
    ) -> Result<&'a str, TemplateError> {
        let blocked: Vec<&str> = self
            .governors
            .iter()
            .zip(entries)
            .filter(|(governor, count)| **count >= governor.cap)
            .flat_map(|(governor, _)| governor.blocks.iter().map(String::as_str))
            .collect();

        let dead_end = || TemplateError::Configuration(format!("state '{}' has no successors", state.id));
        if blocked.is_empty() {
            return state.pick_transition(rng).ok_or_else(dead_end);
        }

        let allowed: Vec<&str> = state
            .transitions
            .iter()
            .map(String::as_str)
            .filter(|t| !blocked.contains(t))
            .collect();
        match allowed.choose(rng) {
            Some(picked) => Ok(*picked),
            None => {
                warn!(state = %state.id, "every successor is governed; taking an unrestricted pick");
                state.pick_transition(rng).ok_or_else(dead_end)
            }
        }
    }

    fn validate(&self) -> Result<(), TemplateError> {
        for sentinel in [START_STATE, END_STATE] {
            if !self.states.contains_key(sentinel) {
                return Err(TemplateError::Configuration(format!(
                    "missing sentinel state {}",
                    sentinel
                )));
            }
        }

        for id in &self.order {
            let state = &self.states[id];
            if id == END_STATE {
                if !state.transitions.is_empty() {
                    return Err(TemplateError::Configuration(format!(
                        "{} must not have successors",
                        END_STATE
                    )));
                }
                continue;
            }
            if state.transitions.is_empty() {
                return Err(TemplateError::Configuration(format!(
                    "state '{}' has no successors",
                    id
                )));
            }
            if let Some(missing) = state
                .transitions
                .iter()
                .find(|t| !self.states.contains_key(t.as_str()))
            {
                return Err(TemplateError::Configuration(format!(
                    "state '{}' references undefined state '{}'",
                    id, missing
                )));
            }
        }

        // Every state the walk can reach must be able to finish
        let (graph, index) = self.as_digraph();
        let end = index[END_STATE];
        let mut finishing = FxHashSet::default();
        let reversed = Reversed(&graph);
        let mut bfs = Bfs::new(reversed, end);
        while let Some(node) = bfs.next(reversed) {
            finishing.insert(node);
        }

        let mut bfs = Bfs::new(&graph, index[START_STATE]);
        while let Some(node) = bfs.next(&graph) {
            if !finishing.contains(&node) {
                return Err(TemplateError::Configuration(format!(
                    "state '{}' is reachable but can never reach {}",
                    graph[node], END_STATE
                )));
            }
        }

        Ok(())
    }

    fn as_digraph(&self) -> (DiGraph<&str, ()>, FxHashMap<&str, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut index = FxHashMap::default();
        for id in &self.order {
            index.insert(id.as_str(), graph.add_node(id.as_str()));
        }
        for id in &self.order {
            for succ in &self.states[id].transitions {
                if let Some(&to) = index.get(succ.as_str()) {
                    graph.add_edge(index[id.as_str()], to, ());
                }
            }
        }
        (graph, index)
    }
}

impl SentenceTemplate for TransitionGraph {
    fn generate(&self, rng: &mut StdRng) -> Result<Vec<String>, TemplateError> {
        self.generate_from(START_STATE, rng)
    }
}
