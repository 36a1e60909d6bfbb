/// Generator settings, loadable from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::template::{Governor, DEFAULT_MAX_WALK_STEPS};
use crate::core::treebank::{RuleLimits, DEFAULT_MAX_DEPTH, DEFAULT_ROOT};
use crate::core::vocabulary::DEFAULT_NOUN_TAG;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for template generation and word realization.
///
/// Every field is optional in RON; missing ones take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Depth governors applied to transition-graph walks.
    pub governors: Vec<Governor>,
    pub max_walk_steps: usize,
    /// Tag tried before an arbitrary one when a word context is unseen.
    pub noun_fallback_tag: String,
    pub most_common_rules: usize,
    pub common_rule_multiplier: usize,
    pub max_expansion_depth: usize,
    /// Category rule expansion starts from.
    pub treebank_root: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let limits = RuleLimits::default();
        Self {
            governors: Governor::defaults(),
            max_walk_steps: DEFAULT_MAX_WALK_STEPS,
            noun_fallback_tag: DEFAULT_NOUN_TAG.to_string(),
            most_common_rules: limits.most_common_rules,
            common_rule_multiplier: limits.common_rule_multiplier,
            max_expansion_depth: DEFAULT_MAX_DEPTH,
            treebank_root: DEFAULT_ROOT.to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn rule_limits(&self) -> RuleLimits {
        RuleLimits {
            most_common_rules: self.most_common_rules,
            common_rule_multiplier: self.common_rule_multiplier,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_walk_steps", self.max_walk_steps),
            ("most_common_rules", self.most_common_rules),
            ("common_rule_multiplier", self.common_rule_multiplier),
            ("max_expansion_depth", self.max_expansion_depth),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if self.noun_fallback_tag.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "noun_fallback_tag",
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(governor) = self.governors.iter().find(|g| g.states.is_empty()) {
            return Err(ConfigError::Invalid {
                field: "governors",
                reason: format!("governor '{}' governs no states", governor.name),
            });
        }
        Ok(())
    }
}
