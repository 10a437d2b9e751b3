//! Probability distributions over the shared vocabulary.
//!
//! A [`ProbabilityDistribution`] is validated once on construction and is
//! immutable afterwards: every entry is finite and non-negative and the
//! entries sum to 1 within [`ProbabilityDistribution::SUM_TOLERANCE`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Token identifier in the vocabulary shared by draft and target models.
pub type TokenId = u32;

/// Next-token distribution over a vocabulary of fixed size V.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct ProbabilityDistribution {
    probs: Vec<f32>,
}

impl ProbabilityDistribution {
    /// Allowed deviation of the total mass from 1.0.
    ///
    /// f32 softmax over a 150k-entry vocabulary drifts by ~1e-4.
    pub const SUM_TOLERANCE: f32 = 1e-3;

    /// Creates a distribution, validating every entry and the total mass.
    ///
    /// # Example
    ///
    /// ```
    /// use spec_decode::ProbabilityDistribution;
    ///
    /// let dist = ProbabilityDistribution::new(vec![0.25, 0.75]).unwrap();
    /// assert_eq!(dist.argmax(), 1);
    /// assert!(ProbabilityDistribution::new(vec![0.5, 0.6]).is_err());
    /// ```
    pub fn new(probs: Vec<f32>) -> Result<Self> {
        if probs.is_empty() {
            return Err(Error::InvalidDistribution("empty vocabulary".into()));
        }

        if let Some((idx, value)) = probs
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(Error::InvalidDistribution(format!(
                "entry {idx} is {value}, expected a finite non-negative value"
            )));
        }

        let sum: f32 = probs.iter().sum();
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(Error::InvalidDistribution(format!(
                "entries sum to {sum}, expected 1.0"
            )));
        }

        Ok(Self { probs })
    }

    /// Normalizes non-negative weights into a distribution.
    ///
    /// Fails with [`Error::DegenerateDistribution`] when the weights carry no
    /// positive mass.
    pub fn from_weights(weights: Vec<f32>) -> Result<Self> {
        let sum: f32 = weights.iter().sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Err(Error::DegenerateDistribution);
        }
        Self::new(weights.into_iter().map(|w| w / sum).collect())
    }

    /// Uniform distribution over `vocab_size` tokens.
    pub fn uniform(vocab_size: usize) -> Result<Self> {
        Self::from_weights(vec![1.0; vocab_size])
    }

    /// Distribution putting all mass on `token`.
    pub fn one_hot(vocab_size: usize, token: TokenId) -> Result<Self> {
        let mut probs = vec![0.0; vocab_size];
        let slot = probs
            .get_mut(token as usize)
            .ok_or_else(|| Error::InvalidDistribution(format!("token {token} >= {vocab_size}")))?;
        *slot = 1.0;
        Self::new(probs)
    }

    /// Vocabulary size V.
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    /// Always false; empty distributions are rejected on construction.
    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Probability of `token`, or `None` if it is outside the vocabulary.
    pub fn probability(&self, token: TokenId) -> Option<f32> {
        self.probs.get(token as usize).copied()
    }

    /// Highest-probability token; ties resolve to the lowest id.
    pub fn argmax(&self) -> TokenId {
        let mut best = 0;
        for (idx, &p) in self.probs.iter().enumerate() {
            if p > self.probs[best] {
                best = idx;
            }
        }
        best as TokenId
    }

    /// Raw probabilities, indexed by token id.
    pub fn as_slice(&self) -> &[f32] {
        &self.probs
    }

    /// Element-wise `max(0, self - other)`, unnormalized.
    pub fn positive_residual(&self, other: &Self) -> Vec<f32> {
        self.probs
            .iter()
            .zip(other.probs.iter())
            .map(|(&p, &q)| (p - q).max(0.0))
            .collect()
    }
}

impl TryFrom<Vec<f32>> for ProbabilityDistribution {
    type Error = Error;

    fn try_from(probs: Vec<f32>) -> Result<Self> {
        Self::new(probs)
    }
}

impl From<ProbabilityDistribution> for Vec<f32> {
    fn from(dist: ProbabilityDistribution) -> Self {
        dist.probs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_mass() {
        assert!(ProbabilityDistribution::new(vec![]).is_err());
        assert!(ProbabilityDistribution::new(vec![0.5, 0.4]).is_err());
        assert!(ProbabilityDistribution::new(vec![1.5, -0.5]).is_err());
        assert!(ProbabilityDistribution::new(vec![f32::NAN, 1.0]).is_err());
    }

    #[test]
    fn test_accepts_within_tolerance() {
        let dist = ProbabilityDistribution::new(vec![0.3333, 0.3333, 0.3333]).unwrap();
        assert_eq!(dist.len(), 3);
    }

    #[test]
    fn test_argmax_prefers_lowest_id_on_ties() {
        let dist = ProbabilityDistribution::new(vec![0.1, 0.45, 0.45]).unwrap();
        assert_eq!(dist.argmax(), 1);
    }

    #[test]
    fn test_from_weights_zero_mass() {
        let err = ProbabilityDistribution::from_weights(vec![0.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::DegenerateDistribution));
    }

    #[test]
    fn test_positive_residual() {
        let p = ProbabilityDistribution::new(vec![0.6, 0.3, 0.1]).unwrap();
        let q = ProbabilityDistribution::new(vec![0.2, 0.5, 0.3]).unwrap();
        let r = p.positive_residual(&q);
        assert!((r[0] - 0.4).abs() < 1e-6);
        assert_eq!(r[1], 0.0);
        assert_eq!(r[2], 0.0);
    }

    #[test]
    fn test_serde_validates() {
        let dist: ProbabilityDistribution = serde_json::from_str("[0.5, 0.5]").unwrap();
        assert_eq!(dist.probability(1), Some(0.5));
        assert!(serde_json::from_str::<ProbabilityDistribution>("[0.5, 0.9]").is_err());
    }

    #[test]
    fn test_one_hot_out_of_range() {
        assert!(ProbabilityDistribution::one_hot(3, 3).is_err());
        let dist = ProbabilityDistribution::one_hot(3, 2).unwrap();
        assert_eq!(dist.argmax(), 2);
    }
}
