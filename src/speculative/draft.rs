//! Draft phase: propose K tokens with the cheap model.

use tracing::debug;

use crate::core::DraftStep;
use crate::error::Result;
use crate::provider::{TokenDecoder, TokenDistributionProvider};

/// K draft proposals plus the context they extend.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    /// One step per speculative offset.
    pub steps: Vec<DraftStep>,
    /// Input context followed by the decoded draft tokens.
    pub extended_context: String,
}

/// Drives the draft provider for K sequential steps.
///
/// Each step selects the greedy top-1 token, so the draft is deterministic
/// for a given context. The acceptance math only needs the probability of
/// the chosen token, whatever the selection policy.
pub struct DraftGenerator<'a, P: ?Sized, C: ?Sized> {
    provider: &'a mut P,
    decoder: &'a C,
}

impl<'a, P, C> DraftGenerator<'a, P, C>
where
    P: TokenDistributionProvider + ?Sized,
    C: TokenDecoder + ?Sized,
{
    /// Creates a generator over a draft provider and decoder.
    pub fn new(provider: &'a mut P, decoder: &'a C) -> Self {
        Self { provider, decoder }
    }

    /// Produces exactly `k` draft steps starting from `context`.
    ///
    /// Provider failures propagate unchanged; a failed step fails the round.
    pub fn propose(&mut self, context: &str, k: usize) -> Result<Draft> {
        let mut extended_context = context.to_string();
        let mut steps = Vec::with_capacity(k);

        for offset in 0..k {
            let distribution = self.provider.next_token_distribution(&extended_context)?;
            let token = distribution.argmax();
            let fragment = self.decoder.decode(token)?;

            debug!(
                offset,
                token,
                q = distribution.probability(token).unwrap_or_default(),
                fragment = %fragment,
                "drafted token"
            );

            extended_context.push_str(&fragment);
            steps.push(DraftStep::new(token, distribution));
        }

        Ok(Draft {
            steps,
            extended_context,
        })
    }
}
