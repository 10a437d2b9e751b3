//! Collaborators the decoding core calls into.
//!
//! The core never touches model weights or tokenizer internals. It sees:
//!
//! - [`TokenDistributionProvider`]: context text -> next-token distribution
//!   (draft) or one distribution per position (target)
//! - [`TokenDecoder`] / [`TextCodec`]: token id <-> text fragment
//!
//! Adapters in this module connect those interfaces to candle models
//! ([`LogitsProvider`]), HuggingFace tokenizers ([`HfTokenizer`]) and plain
//! vocabulary tables ([`StaticVocabulary`]).

pub mod bridge;
pub mod logits;
pub mod tokenizer;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{ProbabilityDistribution, TokenId};
use crate::error::Result;

pub use bridge::TextBridge;
pub use logits::{CausalLm, LogitsProvider};
pub use tokenizer::{HfTokenizer, StaticVocabulary};

/// Which of the two models a provider or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelRole {
    /// Cheap model proposing speculative tokens.
    Draft,
    /// Expensive model whose distribution the output must match.
    Target,
}

impl ModelRole {
    /// Get the role name as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of next-token probability distributions.
///
/// Implementations take `&mut self` so they may keep model state such as a
/// KV cache between calls; the core makes no assumption about it.
pub trait TokenDistributionProvider {
    /// Vocabulary size V of every distribution this provider returns.
    fn vocab_size(&self) -> usize;

    /// Distribution of the token following `context`.
    fn next_token_distribution(&mut self, context: &str) -> Result<ProbabilityDistribution>;

    /// One distribution per token position of `context`.
    ///
    /// Entry `p` predicts the token at position `p + 1` given tokens
    /// `[0..=p]`, so the last entry predicts the token after `context`.
    fn position_distributions(&mut self, context: &str) -> Result<Vec<ProbabilityDistribution>>;
}

impl<P: TokenDistributionProvider + ?Sized> TokenDistributionProvider for Box<P> {
    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn next_token_distribution(&mut self, context: &str) -> Result<ProbabilityDistribution> {
        (**self).next_token_distribution(context)
    }

    fn position_distributions(&mut self, context: &str) -> Result<Vec<ProbabilityDistribution>> {
        (**self).position_distributions(context)
    }
}

/// Turns a token id into its text fragment.
pub trait TokenDecoder {
    /// Text fragment for `token`.
    fn decode(&self, token: TokenId) -> Result<String>;
}

/// Two-way mapping between text and token ids.
pub trait TextCodec: TokenDecoder {
    /// Token ids for `text`.
    fn encode(&self, text: &str) -> Result<Vec<TokenId>>;
}

impl<T: TokenDecoder + ?Sized> TokenDecoder for Arc<T> {
    fn decode(&self, token: TokenId) -> Result<String> {
        (**self).decode(token)
    }
}

impl<T: TextCodec + ?Sized> TextCodec for Arc<T> {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        (**self).encode(text)
    }
}

impl<T: TokenDecoder + ?Sized> TokenDecoder for &T {
    fn decode(&self, token: TokenId) -> Result<String> {
        (**self).decode(token)
    }
}

/// Fails fast when draft and target disagree on the vocabulary size.
pub fn ensure_shared_vocabulary<D, T>(draft: &D, target: &T) -> Result<usize>
where
    D: TokenDistributionProvider + ?Sized,
    T: TokenDistributionProvider + ?Sized,
{
    let (draft, target) = (draft.vocab_size(), target.vocab_size());
    if draft != target {
        return Err(crate::error::Error::VocabularySizeMismatch { draft, target });
    }
    Ok(draft)
}
