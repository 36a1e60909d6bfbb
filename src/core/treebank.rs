/// Rule-expansion templates learned from a bracketed treebank.
///
/// Productions are read from Penn-style parse trees, ranked by frequency,
/// and expanded recursively from a root category down to part-of-speech
/// tags.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::core::template::{SentenceTemplate, TemplateError};

/// Root category expanded by default.
pub const DEFAULT_ROOT: &str = "S";
/// Default recursion limit for one expansion.
pub const DEFAULT_MAX_DEPTH: usize = 40;
/// Treebank label for empty elements (traces, null complementizers).
const EMPTY_ELEMENT: &str = "-NONE-";

/// A node of a bracketed parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTree {
    Node {
        label: String,
        children: Vec<ParseTree>,
    },
    Leaf(String),
}

impl ParseTree {
    pub fn label(&self) -> &str {
        match self {
            Self::Node { label, .. } => label,
            Self::Leaf(word) => word,
        }
    }

    /// Walk the tree, splitting productions into phrase rules (returned) and
    /// part-of-speech labels (added to `terminals`).
    fn collect(&self, productions: &mut Vec<Production>, terminals: &mut FxHashSet<String>) {
        let Self::Node { label, children } = self else {
            return;
        };
        if children.iter().any(|c| matches!(c, Self::Leaf(_))) {
            terminals.insert(label.clone());
        } else {
            productions.push(Production {
                lhs: label.clone(),
                rhs: children.iter().map(|c| c.label().to_string()).collect(),
            });
        }
        for child in children {
            child.collect(productions, terminals);
        }
    }

    /// Drop empty elements, and any phrase left with no children.
    fn prune(self) -> Option<Self> {
        match self {
            Self::Node { label, .. } if label == EMPTY_ELEMENT => None,
            Self::Node { label, children } => {
                let children: Vec<_> = children.into_iter().filter_map(Self::prune).collect();
                if children.is_empty() {
                    None
                } else {
                    Some(Self::Node { label, children })
                }
            }
            leaf => Some(leaf),
        }
    }
}

/// Parse every tree in a bracketed treebank file.
///
/// An unlabelled outer bracket around a single tree, as in `.mrg` files,
/// is removed.
pub fn parse_treebank(input: &str) -> Result<Vec<ParseTree>, TemplateError> {
    let tokens = bracket_tokens(input);
    let mut pos = 0;
    let mut trees = Vec::new();

    while pos < tokens.len() {
        if tokens[pos] != "(" {
            return Err(TemplateError::TreebankParse(format!(
                "expected '(' but found '{}'",
                tokens[pos]
            )));
        }
        let tree = match parse_node(&tokens, &mut pos)? {
            ParseTree::Node {
                label,
                mut children,
            } if label.is_empty() && children.len() == 1 => children.remove(0),
            tree => tree,
        };
        if let Some(tree) = tree.prune() {
            trees.push(tree);
        }
    }

    Ok(trees)
}

fn bracket_tokens(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in input.char_indices() {
        if c == '(' || c == ')' || c.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(&input[s..i]);
            }
            if !c.is_whitespace() {
                tokens.push(&input[i..i + 1]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(&input[s..]);
    }
    tokens
}

fn parse_node(tokens: &[&str], pos: &mut usize) -> Result<ParseTree, TemplateError> {
    // Skip the opening bracket
    *pos += 1;
    let label = match tokens.get(*pos) {
        Some(&t) if t != "(" && t != ")" => {
            *pos += 1;
            t.to_string()
        }
        _ => String::new(),
    };

    let mut children = Vec::new();
    loop {
        match tokens.get(*pos) {
            None => {
                return Err(TemplateError::TreebankParse(format!(
                    "unclosed bracket for '{}'",
                    label
                )))
            }
            Some(&")") => {
                *pos += 1;
                break;
            }
            Some(&"(") => children.push(parse_node(tokens, pos)?),
            Some(&word) => {
                children.push(ParseTree::Leaf(word.to_string()));
                *pos += 1;
            }
        }
    }

    Ok(ParseTree::Node { label, children })
}

/// A phrase-structure rule with no words on its right-hand side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    pub lhs: String,
    pub rhs: Vec<String>,
}

/// How many of the most frequent rules count as "most common" and "still
/// common" when choosing expansions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleLimits {
    pub most_common_rules: usize,
    pub common_rule_multiplier: usize,
}

impl Default for RuleLimits {
    fn default() -> Self {
        Self {
            most_common_rules: 50,
            common_rule_multiplier: 3,
        }
    }
}

/// Expansion choices per category, learned from a treebank.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: FxHashMap<String, Vec<Vec<String>>>,
    terminals: FxHashSet<String>,
    root: String,
    max_depth: usize,
}

impl RuleTable {
    pub fn load(path: &Path, limits: RuleLimits) -> Result<Self, TemplateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_treebank(&contents, limits)
    }

    pub fn from_treebank(input: &str, limits: RuleLimits) -> Result<Self, TemplateError> {
        let trees = parse_treebank(input)?;
        Self::from_trees(&trees, limits)
    }

    /// Build the table. For each category the candidates are its rules
    /// among the `most_common_rules` most frequent overall, else among the
    /// `most_common_rules * common_rule_multiplier` most frequent, else all
    /// of its distinct rules.
    ///
    /// Every tier is uniform over distinct rules. The last tier therefore
    /// ignores how often each rule occurred, unlike a draw over every
    /// observed production, which would favour frequent rules.
    pub fn from_trees(trees: &[ParseTree], limits: RuleLimits) -> Result<Self, TemplateError> {
        let mut productions = Vec::new();
        let mut terminals = FxHashSet::default();
        for tree in trees {
            tree.collect(&mut productions, &mut terminals);
        }
        if productions.is_empty() {
            return Err(TemplateError::Configuration(
                "treebank contains no phrase rules".to_string(),
            ));
        }

        // Rank by count, ties broken by first appearance
        let mut counts: FxHashMap<&Production, (u32, usize)> = FxHashMap::default();
        for (i, production) in productions.iter().enumerate() {
            counts.entry(production).or_insert((0, i)).0 += 1;
        }
        let mut ranked: Vec<(&Production, u32, usize)> =
            counts.into_iter().map(|(p, (c, i))| (p, c, i)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let top = &ranked[..limits.most_common_rules.min(ranked.len())];
        let common_len = limits
            .most_common_rules
            .saturating_mul(limits.common_rule_multiplier)
            .min(ranked.len());
        let common = &ranked[..common_len];

        let mut rules: FxHashMap<String, Vec<Vec<String>>> = FxHashMap::default();
        for (production, _, _) in &ranked {
            let lhs = &production.lhs;
            if terminals.contains(lhs) || rules.contains_key(lhs) {
                continue;
            }
            let candidates = [top, common, &ranked[..]]
                .iter()
                .map(|tier| rhs_for(tier, lhs))
                .find(|c| !c.is_empty())
                .unwrap_or_default();
            rules.insert(lhs.clone(), candidates);
        }

        let table = Self {
            rules,
            terminals,
            root: DEFAULT_ROOT.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        };
        table.validate()?;
        debug!(
            categories = table.rules.len(),
            terminals = table.terminals.len(),
            distinct_rules = ranked.len(),
            "rule table built"
        );
        Ok(table)
    }

    pub fn with_root(mut self, root: &str) -> Self {
        self.root = root.to_string();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn is_terminal(&self, category: &str) -> bool {
        self.terminals.contains(category)
    }

    /// Candidate right-hand sides for a category.
    pub fn rules_for(&self, category: &str) -> Option<&[Vec<String>]> {
        self.rules.get(category).map(Vec::as_slice)
    }

    /// Expand `root` into a sequence of terminal categories.
    pub fn expand(&self, root: &str, rng: &mut StdRng) -> Result<Vec<String>, TemplateError> {
        if !self.rules.contains_key(root) && !self.is_terminal(root) {
            return Err(TemplateError::UnknownState(root.to_string()));
        }
        self.expand_into(root, 0, Vec::new(), rng)
    }

    fn expand_into(
        &self,
        category: &str,
        depth: usize,
        mut template: Vec<String>,
        rng: &mut StdRng,
    ) -> Result<Vec<String>, TemplateError> {
        if self.is_terminal(category) {
            template.push(category.to_string());
            return Ok(template);
        }
        if depth >= self.max_depth {
            return Err(TemplateError::DepthExceeded(self.max_depth));
        }

        let rhs = self
            .rules
            .get(category)
            .and_then(|candidates| candidates.choose(rng))
            .ok_or_else(|| TemplateError::UnknownState(category.to_string()))?;
        for part in rhs {
            template = self.expand_into(part, depth + 1, template, rng)?;
        }
        Ok(template)
    }

    fn validate(&self) -> Result<(), TemplateError> {
        for (lhs, candidates) in &self.rules {
            for part in candidates.iter().flatten() {
                if !self.is_terminal(part) && !self.rules.contains_key(part) {
                    return Err(TemplateError::Configuration(format!(
                        "category '{}' used by '{}' has no rules",
                        part, lhs
                    )));
                }
            }
        }
        Ok(())
    }
}

fn rhs_for(ranked: &[(&Production, u32, usize)], lhs: &str) -> Vec<Vec<String>> {
    ranked
        .iter()
        .filter(|(p, _, _)| p.lhs == lhs)
        .map(|(p, _, _)| p.rhs.clone())
        .collect()
}

impl SentenceTemplate for RuleTable {
    fn generate(&self, rng: &mut StdRng) -> Result<Vec<String>, TemplateError> {
        self.expand(&self.root, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const SMALL: &str = "
        ( (S (NP-SBJ (DT The) (NN cat)) (VP (VBD sat)) (. .)) )
        ( (S (NP-SBJ (PRP She)) (VP (VBD saw) (NP (DT the) (NN dog))) (. .)) )
        ( (S (NP-SBJ (DT The) (NN dog)) (VP (VBD ran)) (. .)) )
    ";

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn parse_strips_outer_bracket() {
        let trees = parse_treebank(SMALL).unwrap();
        assert_eq!(trees.len(), 3);
        assert_eq!(trees[0].label(), "S");
    }

    #[test]
    fn parse_drops_empty_elements() {
        let trees =
            parse_treebank("(S (NP-SBJ (-NONE- *T*)) (VP (VBD went)))").unwrap();
        let ParseTree::Node { children, .. } = &trees[0] else {
            panic!("expected a node");
        };
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].label(), "VP");
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            parse_treebank("(S (NP (NN cat))"),
            Err(TemplateError::TreebankParse(_))
        ));
        assert!(matches!(
            parse_treebank("S (NP)"),
            Err(TemplateError::TreebankParse(_))
        ));
    }

    #[test]
    fn terminals_and_rules() {
        let table = RuleTable::from_treebank(SMALL, RuleLimits::default()).unwrap();
        for tag in ["DT", "NN", "VBD", "PRP", "."] {
            assert!(table.is_terminal(tag), "{} should be terminal", tag);
        }
        assert!(!table.is_terminal("S"));
        assert_eq!(table.rules_for("S").unwrap().len(), 1);
        assert_eq!(table.rules_for("NP-SBJ").unwrap().len(), 2);
    }

    #[test]
    fn most_common_rules_win() {
        // With room for one rule, only the most frequent S rule survives the
        // first tier, and VP falls back to its own rules.
        let limits = RuleLimits {
            most_common_rules: 1,
            common_rule_multiplier: 1,
        };
        let table = RuleTable::from_treebank(SMALL, limits).unwrap();
        let s_rules = table.rules_for("S").unwrap();
        assert_eq!(
            s_rules,
            &[vec!["NP-SBJ".to_string(), "VP".to_string(), ".".to_string()]]
        );
        assert_eq!(table.rules_for("VP").unwrap().len(), 2);
    }

    #[test]
    fn fallback_tier_is_uniform_over_distinct_rules() {
        // VP -> VBD occurs twice and VP -> VBD NP once, but each is listed
        // once and drawn about equally often.
        let limits = RuleLimits {
            most_common_rules: 1,
            common_rule_multiplier: 1,
        };
        let table = RuleTable::from_treebank(SMALL, limits).unwrap();
        assert_eq!(
            table.rules_for("VP").unwrap(),
            &[
                vec!["VBD".to_string()],
                vec!["VBD".to_string(), "NP".to_string()]
            ]
        );

        let mut rng = rng();
        let short = (0..1000)
            .filter(|_| table.expand("VP", &mut rng).unwrap().len() == 1)
            .count();
        assert!((400..=600).contains(&short), "short expansions: {}", short);
    }

    #[test]
    fn expand_reaches_terminals() {
        let table = RuleTable::from_treebank(SMALL, RuleLimits::default()).unwrap();
        for seed in 0..20 {
            let template = table.generate(&mut StdRng::seed_from_u64(seed)).unwrap();
            assert!(template.iter().all(|t| table.is_terminal(t)));
            assert_eq!(template.last().map(String::as_str), Some("."));
        }
    }

    #[test]
    fn expand_is_reentrant() {
        let table = RuleTable::from_treebank(SMALL, RuleLimits::default()).unwrap();
        let first = table.expand("NP-SBJ", &mut rng()).unwrap();
        let second = table.expand("NP-SBJ", &mut rng()).unwrap();
        assert_eq!(first, second);
        assert!(first.len() <= 2);
    }

    #[test]
    fn unknown_root() {
        let table = RuleTable::from_treebank(SMALL, RuleLimits::default()).unwrap();
        assert!(matches!(
            table.expand("SBARQ", &mut rng()),
            Err(TemplateError::UnknownState(_))
        ));
        let renamed = table.with_root("FRAG");
        assert!(renamed.generate(&mut rng()).is_err());
    }

    #[test]
    fn runaway_recursion_is_bounded() {
        // Only the recursive S rule makes the first tier
        let limits = RuleLimits {
            most_common_rules: 1,
            common_rule_multiplier: 1,
        };
        let table = RuleTable::from_treebank("(S (S (S (NN x))))", limits)
            .unwrap()
            .with_max_depth(5);
        assert!(matches!(
            table.generate(&mut rng()),
            Err(TemplateError::DepthExceeded(5))
        ));
    }

    #[test]
    fn empty_treebank_is_rejected() {
        assert!(matches!(
            RuleTable::from_treebank("", RuleLimits::default()),
            Err(TemplateError::Configuration(_))
        ));
    }
}
