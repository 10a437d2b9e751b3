//! Acceptance sampling for speculative decoding.
//!
//! For each draft offset the sampler compares the draft probability
//! `q = q_i[tok]` with the target probability `p = p_i[tok]`:
//!
//! ```text
//! p >= q ──────────────────────────▶ Accepted (no randomness)
//! p <  q ── u ~ U[0,1), u <= p/q ──▶ Accepted
//!        └─ otherwise ─────────────▶ Resampled from norm(max(0, p_i - q_i)), stop
//! ```
//!
//! Accepting with probability `min(1, p/q)` and resampling rejected
//! positions from the positive residual keeps the output distributed as the
//! target model's. The walk stops at the first rejection: later draft
//! distributions were conditioned on the rejected token.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::core::{DraftStep, ProbabilityDistribution, TargetPosition, TokenId};
use crate::error::{Error, Result};
use crate::provider::ModelRole;

/// How a draft token was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// `p >= q`: the target gives the token at least the draft's mass.
    Dominant,
    /// `p < q`: accepted on a uniform draw `u <= p/q`.
    Probabilistic,
}

/// Outcome at one draft offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The draft token survives.
    Accepted {
        token: TokenId,
        acceptance: Acceptance,
    },
    /// The draft token was rejected and `token` drawn in its place.
    /// Always the last verdict of a walk.
    Resampled { rejected: TokenId, token: TokenId },
}

impl Verdict {
    /// Token emitted at this offset.
    pub fn token(&self) -> TokenId {
        match self {
            Self::Accepted { token, .. } | Self::Resampled { token, .. } => *token,
        }
    }

    /// True if the draft token survived.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Result of walking all draft offsets of one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptanceOutcome {
    verdicts: Vec<Verdict>,
}

impl AcceptanceOutcome {
    /// Verdicts in offset order.
    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    /// Emitted tokens in order (1 to k of them).
    pub fn tokens(&self) -> Vec<TokenId> {
        self.verdicts.iter().map(Verdict::token).collect()
    }

    /// Number of draft tokens that survived.
    pub fn num_accepted(&self) -> usize {
        self.verdicts.iter().filter(|v| v.is_accepted()).count()
    }

    /// True if the walk ended on a rejection.
    pub fn was_resampled(&self) -> bool {
        matches!(self.verdicts.last(), Some(Verdict::Resampled { .. }))
    }

    /// Number of emitted tokens.
    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    /// True when nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

/// Rejection sampler reconciling draft and target distributions.
#[derive(Debug, Clone)]
pub struct AcceptanceSampler<R = StdRng> {
    rng: R,
    precision: Option<u32>,
}

impl AcceptanceSampler<StdRng> {
    /// Creates a sampler seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a sampler with a seeded RNG for reproducibility.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for AcceptanceSampler<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> AcceptanceSampler<R> {
    /// Creates a sampler drawing from `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            precision: None,
        }
    }

    /// Round p and q to `digits` decimal digits before comparing them.
    pub fn precision(mut self, digits: Option<u32>) -> Self {
        self.precision = digits;
        self
    }

    /// Get the configured rounding precision.
    pub fn probability_precision(&self) -> Option<u32> {
        self.precision
    }

    /// Walks the draft offsets in order, stopping at the first rejection.
    ///
    /// `targets[i]` must be the target position matched to `draft[i]`.
    ///
    /// # Returns
    ///
    /// 1 to k verdicts; exactly k when every draft token is accepted.
    pub fn walk(
        &mut self,
        draft: &[DraftStep],
        targets: &[TargetPosition],
    ) -> Result<AcceptanceOutcome> {
        if draft.is_empty() {
            return Err(Error::Config(
                "cannot verify a round with zero speculative tokens".into(),
            ));
        }
        if draft.len() != targets.len() {
            return Err(Error::MisalignedVerification {
                positions: targets.len(),
                speculative: draft.len(),
            });
        }

        let mut verdicts = Vec::with_capacity(draft.len());
        for (offset, (step, target)) in draft.iter().zip(targets).enumerate() {
            let verdict = self.judge(step, &target.distribution)?;
            debug!(offset, position = target.position, ?verdict, "judged draft token");
            verdicts.push(verdict);
            if let Verdict::Resampled { .. } = verdict {
                break;
            }
        }

        Ok(AcceptanceOutcome { verdicts })
    }

    /// Decides a single offset.
    pub fn judge(
        &mut self,
        step: &DraftStep,
        target: &ProbabilityDistribution,
    ) -> Result<Verdict> {
        let token = step.token;
        let q = probability_of(&step.distribution, token, ModelRole::Draft)?;
        let p = probability_of(target, token, ModelRole::Target)?;
        if step.distribution.len() != target.len() {
            return Err(Error::VocabularySizeMismatch {
                draft: step.distribution.len(),
                target: target.len(),
            });
        }

        let (p, q) = (self.round(p), self.round(q));
        if p >= q {
            return Ok(Verdict::Accepted {
                token,
                acceptance: Acceptance::Dominant,
            });
        }

        let u: f64 = self.rng.gen();
        if u <= p / q {
            return Ok(Verdict::Accepted {
                token,
                acceptance: Acceptance::Probabilistic,
            });
        }

        let replacement = self.resample(target, &step.distribution)?;
        Ok(Verdict::Resampled {
            rejected: token,
            token: replacement,
        })
    }

    /// Draws a token from `norm(max(0, p - q))`.
    pub fn resample(
        &mut self,
        target: &ProbabilityDistribution,
        draft: &ProbabilityDistribution,
    ) -> Result<TokenId> {
        let residual = adjusted_distribution(target, draft)?;
        let dist = WeightedIndex::new(residual.as_slice())
            .map_err(|_| Error::DegenerateDistribution)?;
        Ok(dist.sample(&mut self.rng) as TokenId)
    }

    fn round(&self, value: f32) -> f64 {
        let value = f64::from(value);
        match self.precision {
            Some(digits) => {
                let scale = 10f64.powi(digits as i32);
                (value * scale).round() / scale
            }
            None => value,
        }
    }
}

/// The normalized residual `max(0, p - q) / sum(max(0, p - q))`.
///
/// Fails with [`Error::DegenerateDistribution`] when p and q leave no
/// positive mass, e.g. when they coincide element-wise.
pub fn adjusted_distribution(
    target: &ProbabilityDistribution,
    draft: &ProbabilityDistribution,
) -> Result<ProbabilityDistribution> {
    if target.len() != draft.len() {
        return Err(Error::VocabularySizeMismatch {
            draft: draft.len(),
            target: target.len(),
        });
    }

    ProbabilityDistribution::from_weights(target.positive_residual(draft)).map_err(|e| {
        if matches!(e, Error::DegenerateDistribution) {
            warn!("residual distribution has no positive mass");
        }
        e
    })
}

fn probability_of(
    dist: &ProbabilityDistribution,
    token: TokenId,
    role: ModelRole,
) -> Result<f32> {
    dist.probability(token).ok_or(Error::VocabularyMismatch {
        token,
        vocab_size: dist.len(),
        role,
    })
}
