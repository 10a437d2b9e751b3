//! Verify phase: score the extended context with the target model once.

use tracing::{debug, warn};

use crate::core::TargetPosition;
use crate::error::{Error, Result};
use crate::provider::TokenDistributionProvider;

/// Runs the single target pass over a draft-extended context.
pub struct TargetVerifier<'a, P: ?Sized> {
    provider: &'a mut P,
}

impl<'a, P: TokenDistributionProvider + ?Sized> TargetVerifier<'a, P> {
    /// Creates a verifier over the target provider.
    pub fn new(provider: &'a mut P) -> Self {
        Self { provider }
    }

    /// One [`TargetPosition`] per token of `extended_context`.
    ///
    /// Issues exactly one provider call regardless of K.
    pub fn verify(&mut self, extended_context: &str) -> Result<Vec<TargetPosition>> {
        let positions: Vec<TargetPosition> = self
            .provider
            .position_distributions(extended_context)?
            .into_iter()
            .enumerate()
            .map(|(position, distribution)| TargetPosition::new(position, distribution))
            .collect();

        debug!(positions = positions.len(), "target pass complete");
        Ok(positions)
    }
}

/// Absolute position whose distribution predicts draft offset `offset`.
///
/// Returns `total_len - k + offset - 1`, or `None` if that falls before
/// the start of the sequence.
pub fn matching_position(total_len: usize, k: usize, offset: usize) -> Option<usize> {
    (total_len + offset).checked_sub(k + 1)
}

/// The K positions matched to draft offsets `0..k`, in offset order.
///
/// They form the contiguous slice `[total_len - k - 1, total_len - 1)`.
pub fn matching_positions(positions: &[TargetPosition], k: usize) -> Result<&[TargetPosition]> {
    let total_len = positions.len();
    match matching_position(total_len, k, 0) {
        Some(start) if k > 0 => Ok(&positions[start..start + k]),
        _ => {
            warn!(positions = total_len, speculative = k, "misaligned verification");
            Err(Error::MisalignedVerification {
                positions: total_len,
                speculative: k,
            })
        }
    }
}
