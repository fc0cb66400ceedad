//! Matching configuration

use crate::error::{MatchError, MatchResult};
use serde::{Deserialize, Serialize};

/// Policy for subject keys a mapping pattern does not list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraKeys {
    /// Unlisted keys are tolerated and carried into the destructured value
    #[default]
    Ignore,
    /// Every subject key must be listed in the pattern
    Reject,
}

/// Configuration for pattern compilation and matching behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Policy applied to mapping patterns that do not choose one explicitly
    pub extra_keys: ExtraKeys,
    /// Convert non-string subjects to strings before regex matching
    pub coerce_regex_subjects: bool,
    /// Enable guard clause evaluation
    pub enable_guards: bool,
    /// Maximum nesting depth of a raw pattern
    pub max_pattern_depth: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            extra_keys: ExtraKeys::Ignore,
            coerce_regex_subjects: true,
            enable_guards: true,
            max_pattern_depth: 64,
        }
    }
}

impl MatchConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> MatchResult<Self> {
        let config: MatchConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MatchResult<()> {
        if self.max_pattern_depth == 0 {
            return Err(MatchError::Config(
                "max_pattern_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
