//! Speculative decoding configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest supported rounding precision, in decimal digits.
pub const MAX_PROBABILITY_PRECISION: u32 = 8;

/// Configuration for speculative decoding.
///
/// The draft model proposes K tokens per round; the target model verifies
/// them in a single pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeculativeConfig {
    /// Number of tokens to speculate per round (K, at least 1).
    pub num_speculative_tokens: usize,

    /// Round p and q to this many decimal digits before comparing them.
    /// `None` compares at full precision.
    pub probability_precision: Option<u32>,

    /// Seed for the acceptance RNG. `None` seeds from OS entropy.
    pub seed: Option<u64>,

    /// Token budget for multi-round generation.
    pub max_new_tokens: usize,
}

impl Default for SpeculativeConfig {
    fn default() -> Self {
        Self {
            num_speculative_tokens: 5,
            probability_precision: None,
            seed: None,
            max_new_tokens: 32,
        }
    }
}

impl SpeculativeConfig {
    /// Set the number of speculative tokens.
    pub fn num_tokens(mut self, k: usize) -> Self {
        self.num_speculative_tokens = k;
        self
    }

    /// Round probabilities to `digits` decimal digits before comparing.
    pub fn precision(mut self, digits: u32) -> Self {
        self.probability_precision = Some(digits);
        self
    }

    /// Seed the acceptance RNG.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the multi-round token budget.
    pub fn max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// Checks the invariants every round relies on.
    pub fn validate(&self) -> Result<()> {
        if self.num_speculative_tokens == 0 {
            return Err(Error::Config(
                "num_speculative_tokens must be at least 1".into(),
            ));
        }
        if let Some(digits) = self.probability_precision {
            if digits > MAX_PROBABILITY_PRECISION {
                return Err(Error::Config(format!(
                    "probability_precision {digits} exceeds {MAX_PROBABILITY_PRECISION} digits"
                )));
            }
        }
        Ok(())
    }
}
