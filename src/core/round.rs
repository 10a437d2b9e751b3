//! Per-round records exchanged between drafting, verification and sampling.

use serde::{Deserialize, Serialize};

use super::distribution::{ProbabilityDistribution, TokenId};

/// Token chosen by the draft model at one offset, with the distribution it
/// was chosen from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftStep {
    /// Proposed token id.
    pub token: TokenId,
    /// Draft distribution q at this offset.
    pub distribution: ProbabilityDistribution,
}

impl DraftStep {
    /// Creates a draft step.
    pub fn new(token: TokenId, distribution: ProbabilityDistribution) -> Self {
        Self {
            token,
            distribution,
        }
    }

    /// Draft probability of the proposed token.
    pub fn probability(&self) -> Option<f32> {
        self.distribution.probability(self.token)
    }
}

/// Target distribution at one absolute position of the verification pass.
///
/// The distribution at `position` predicts the token at `position + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    /// Absolute position in the extended sequence.
    pub position: usize,
    /// Target distribution p at this position.
    pub distribution: ProbabilityDistribution,
}

impl TargetPosition {
    /// Creates a target position.
    pub fn new(position: usize, distribution: ProbabilityDistribution) -> Self {
        Self {
            position,
            distribution,
        }
    }
}

/// Serialized form of one round, sufficient to rerun the acceptance walk.
///
/// `target_positions` holds only the k positions matched to the draft
/// offsets, in offset order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Prompt the round started from.
    pub prompt: String,
    /// Token id -> text table used to decode accepted tokens.
    pub vocabulary: Vec<String>,
    /// Draft proposals in offset order.
    pub draft_steps: Vec<DraftStep>,
    /// Matched target distributions in offset order.
    pub target_positions: Vec<TargetPosition>,
}

impl RoundRecord {
    /// Number of speculative tokens (k) in the recorded round.
    pub fn num_speculative_tokens(&self) -> usize {
        self.draft_steps.len()
    }
}
