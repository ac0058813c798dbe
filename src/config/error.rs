//! Configuration error types.

use thiserror::Error;

/// Errors raised while building or validating a [`Config`](super::Config).
///
/// All of these are construction-time failures; no computation runs with an
/// invalid configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Objective name is not one of `binary`, `multinomial`.
    #[error("QA objective must be one of [binary, multinomial], got '{value}'")]
    InvalidObjective { value: String },

    /// Selection policy name is not one of `union`, `majority`, `weighted`.
    #[error("span selection policy must be one of [union, majority, weighted], got '{value}'")]
    InvalidPolicy { value: String },

    /// The multinomial objective needs a categorical gold target, which the
    /// weighted policy cannot provide.
    #[error("cannot use the {policy} span selection policy with the {objective} objective")]
    IncompatiblePolicy {
        objective: &'static str,
        policy: &'static str,
    },

    /// Span hidden dimension must be non-zero.
    #[error("span hidden dimension must be greater than zero")]
    ZeroHiddenDim,

    /// Pruning ratio must be finite and positive.
    #[error("invalid pruning ratio {value}: must be finite and greater than zero")]
    InvalidPruningRatio { value: f32 },

    /// A numeric environment value could not be parsed.
    #[error("failed to parse {name}='{value}'")]
    ParseError { name: &'static str, value: String },
}
