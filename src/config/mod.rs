//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `SPANQA_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SPAN_HIDDEN_DIM;

/// Training objective of the answer scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Independent sigmoid per span plus a separate invalidity logit.
    Binary,
    /// One softmax over all spans and a no-answer dummy.
    Multinomial,
}

impl Objective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::Binary => "binary",
            Objective::Multinomial => "multinomial",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "binary" => Ok(Objective::Binary),
            "multinomial" => Ok(Objective::Multinomial),
            other => Err(ConfigError::InvalidObjective {
                value: other.to_string(),
            }),
        }
    }
}

/// How disagreeing annotator judgments become one gold label per span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Any annotator selecting the span makes it gold.
    Union,
    /// At least half of all annotators must select the span.
    Majority,
    /// Label is the fraction of annotators selecting the span.
    Weighted,
}

impl SelectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionPolicy::Union => "union",
            SelectionPolicy::Majority => "majority",
            SelectionPolicy::Weighted => "weighted",
        }
    }

    /// `true` when labels are exactly 0 or 1.
    pub fn is_discrete(&self) -> bool {
        !matches!(self, SelectionPolicy::Weighted)
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "union" => Ok(SelectionPolicy::Union),
            "majority" => Ok(SelectionPolicy::Majority),
            "weighted" => Ok(SelectionPolicy::Weighted),
            other => Err(ConfigError::InvalidPolicy {
                value: other.to_string(),
            }),
        }
    }
}

/// Answer scorer configuration.
///
/// Use [`Config::from_env`] to read `SPANQA_*` overrides on top of defaults,
/// then [`Config::validate`] before building a scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Training objective. Default: `binary`.
    pub objective: Objective,

    /// Gold label selection policy. Default: `weighted`.
    pub span_selection_policy: SelectionPolicy,

    /// Width of the shared span/predicate/question hidden space. Default: `100`.
    pub span_hidden_dim: usize,

    /// Keep `ceil(ratio * n)` spans per sentence when set. Default: disabled.
    pub pruning_ratio: Option<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            objective: Objective::Binary,
            span_selection_policy: SelectionPolicy::Weighted,
            span_hidden_dim: DEFAULT_SPAN_HIDDEN_DIM,
            pruning_ratio: None,
        }
    }
}

impl Config {
    const ENV_OBJECTIVE: &'static str = "SPANQA_OBJECTIVE";
    const ENV_SPAN_SELECTION_POLICY: &'static str = "SPANQA_SPAN_SELECTION_POLICY";
    const ENV_SPAN_HIDDEN_DIM: &'static str = "SPANQA_SPAN_HIDDEN_DIM";
    const ENV_PRUNING_RATIO: &'static str = "SPANQA_PRUNING_RATIO";

    pub fn new(objective: Objective, span_selection_policy: SelectionPolicy) -> Self {
        Self {
            objective,
            span_selection_policy,
            ..Default::default()
        }
    }

    pub fn with_span_hidden_dim(mut self, span_hidden_dim: usize) -> Self {
        self.span_hidden_dim = span_hidden_dim;
        self
    }

    pub fn with_pruning_ratio(mut self, ratio: f32) -> Self {
        self.pruning_ratio = Some(ratio);
        self
    }

    /// Loads configuration from environment variables (falling back to defaults).
    ///
    /// Names are parsed here; cross-field checks are left to [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let objective = match Self::read_env(Self::ENV_OBJECTIVE) {
            Some(value) => value.parse()?,
            None => defaults.objective,
        };
        let span_selection_policy = match Self::read_env(Self::ENV_SPAN_SELECTION_POLICY) {
            Some(value) => value.parse()?,
            None => defaults.span_selection_policy,
        };
        let span_hidden_dim =
            Self::parse_from_env(Self::ENV_SPAN_HIDDEN_DIM)?.unwrap_or(defaults.span_hidden_dim);
        let pruning_ratio = Self::parse_from_env(Self::ENV_PRUNING_RATIO)?;

        Ok(Self {
            objective,
            span_selection_policy,
            span_hidden_dim,
            pruning_ratio,
        })
    }

    /// Checks cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.objective == Objective::Multinomial
            && self.span_selection_policy == SelectionPolicy::Weighted
        {
            return Err(ConfigError::IncompatiblePolicy {
                objective: self.objective.as_str(),
                policy: self.span_selection_policy.as_str(),
            });
        }

        if self.span_hidden_dim == 0 {
            return Err(ConfigError::ZeroHiddenDim);
        }

        if let Some(ratio) = self.pruning_ratio
            && !(ratio.is_finite() && ratio > 0.0)
        {
            return Err(ConfigError::InvalidPruningRatio { value: ratio });
        }

        Ok(())
    }

    fn read_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_from_env<T: FromStr>(var_name: &'static str) -> Result<Option<T>, ConfigError> {
        match Self::read_env(var_name) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::ParseError {
                    name: var_name,
                    value,
                }),
            None => Ok(None),
        }
    }
}
