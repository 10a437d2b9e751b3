//! Distribution provider over a candle causal language model.
//!
//! ```text
//! context ──encode──▶ ids [1, L] ──forward_all──▶ logits [1, L, V]
//!                                                    │
//!                                                    ▼ softmax (last dim)
//!                                       L distributions over V tokens
//! ```

use candle_core::{DType, Device, Tensor, D};
use tracing::debug;

use super::{ModelRole, TextCodec, TokenDistributionProvider};
use crate::config::ProviderConfig;
use crate::core::{ProbabilityDistribution, TokenId};
use crate::error::{Error, Result};

/// A causal language model that scores every position in one pass.
///
/// The model handle (weights, device) is created once by the caller and
/// handed to a [`LogitsProvider`]; it is never reloaded per round.
pub trait CausalLm {
    /// Device the model's tensors live on.
    fn device(&self) -> &Device;

    /// Number of logits per position.
    fn vocab_size(&self) -> usize;

    /// Logits for all positions.
    ///
    /// `input_ids` has shape `[1, seq_len]`; the result has shape
    /// `[1, seq_len, vocab_size]`.
    fn forward_all(&mut self, input_ids: &Tensor) -> candle_core::Result<Tensor>;
}

/// [`TokenDistributionProvider`] over a [`CausalLm`] and its tokenizer.
pub struct LogitsProvider<M, C> {
    model: M,
    codec: C,
    role: ModelRole,
    config: ProviderConfig,
}

impl<M: CausalLm, C: TextCodec> LogitsProvider<M, C> {
    /// Creates a provider for `model`, tokenizing contexts with `codec`.
    pub fn new(model: M, codec: C, role: ModelRole, config: ProviderConfig) -> Self {
        Self {
            model,
            codec,
            role,
            config,
        }
    }

    /// Get the model role.
    pub fn role(&self) -> ModelRole {
        self.role
    }

    /// Get reference to the model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get reference to the codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    fn encode_context(&self, context: &str) -> Result<Vec<TokenId>> {
        let ids = self
            .codec
            .encode(context)
            .map_err(|e| Error::provider(self.role, e))?;

        if ids.is_empty() {
            return Err(Error::provider(self.role, "context encodes to zero tokens"));
        }
        if let Some(max) = self.config.max_context_tokens {
            if ids.len() > max {
                return Err(Error::provider(
                    self.role,
                    format!("context of {} tokens exceeds limit of {max}", ids.len()),
                ));
            }
        }

        Ok(ids)
    }

    fn probabilities(&mut self, ids: &[TokenId]) -> candle_core::Result<Vec<Vec<f32>>> {
        let input_ids = Tensor::new(ids, self.model.device())?.unsqueeze(0)?;
        let logits = self
            .model
            .forward_all(&input_ids)?
            .squeeze(0)?
            .to_dtype(DType::F32)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?;
        probs.to_vec2::<f32>()
    }
}

impl<M: CausalLm, C: TextCodec> TokenDistributionProvider for LogitsProvider<M, C> {
    fn vocab_size(&self) -> usize {
        self.model.vocab_size()
    }

    fn next_token_distribution(&mut self, context: &str) -> Result<ProbabilityDistribution> {
        self.position_distributions(context)?
            .pop()
            .ok_or_else(|| Error::provider(self.role, "model returned no positions"))
    }

    fn position_distributions(&mut self, context: &str) -> Result<Vec<ProbabilityDistribution>> {
        let ids = self.encode_context(context)?;
        let rows = self
            .probabilities(&ids)
            .map_err(|e| Error::provider(self.role, e))?;

        if rows.len() != ids.len() {
            return Err(Error::provider(
                self.role,
                format!("model returned {} positions for {} tokens", rows.len(), ids.len()),
            ));
        }
        debug!(role = %self.role, tokens = ids.len(), "scored context");

        rows.into_iter()
            .map(|row| ProbabilityDistribution::new(row).map_err(|e| Error::provider(self.role, e)))
            .collect()
    }
}
