//! Error types for spec-decode.

use thiserror::Error;

use crate::core::TokenId;
use crate::provider::ModelRole;

/// Result type alias for spec-decode operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for spec-decode.
#[derive(Error, Debug)]
pub enum Error {
    /// A draft or target distribution call failed.
    #[error("{role} provider failed: {message}")]
    Provider { role: ModelRole, message: String },

    /// A token id is out of range for a provider's vocabulary.
    #[error("token {token} is outside the {role} vocabulary of {vocab_size} entries")]
    VocabularyMismatch {
        token: TokenId,
        vocab_size: usize,
        role: ModelRole,
    },

    /// Draft and target providers disagree on the vocabulary size.
    #[error("draft vocabulary has {draft} entries but target vocabulary has {target}")]
    VocabularySizeMismatch { draft: usize, target: usize },

    /// The residual max(0, p - q) has no positive mass to resample from.
    #[error("adjusted distribution max(0, p - q) has no positive mass")]
    DegenerateDistribution,

    /// Values do not form a probability distribution.
    #[error("invalid probability distribution: {0}")]
    InvalidDistribution(String),

    /// The target pass is too short to cover the speculative tokens.
    #[error("target returned {positions} positions, too few to verify {speculative} speculative tokens")]
    MisalignedVerification { positions: usize, speculative: usize },

    /// Tokenization error.
    #[error("tokenization error: {0}")]
    Tokenization(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wraps a provider failure, tagging it with the model that failed.
    pub fn provider(role: ModelRole, message: impl std::fmt::Display) -> Self {
        Self::Provider {
            role,
            message: message.to_string(),
        }
    }
}
