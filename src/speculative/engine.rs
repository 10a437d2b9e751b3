//! Speculative decoding engine.
//!
//! Orchestrates draft provider, target provider, and acceptance sampling
//! for faster token generation.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info};

use super::config::SpeculativeConfig;
use super::draft::DraftGenerator;
use super::sampler::{AcceptanceOutcome, AcceptanceSampler};
use super::verify::{matching_positions, TargetVerifier};
use crate::core::{DraftStep, RoundRecord, TargetPosition, TokenId};
use crate::error::Result;
use crate::provider::{
    ensure_shared_vocabulary, StaticVocabulary, TokenDecoder, TokenDistributionProvider,
};

/// One completed draft → verify → accept round.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingRound {
    /// Prompt the round started from.
    pub prompt: String,
    /// Draft proposals, one per speculative offset.
    pub draft_steps: Vec<DraftStep>,
    /// Target positions matched to the draft offsets.
    pub target_positions: Vec<TargetPosition>,
    /// Per-offset verdicts.
    pub outcome: AcceptanceOutcome,
    /// Decoded text of the emitted tokens.
    pub fragments: Vec<String>,
    /// Prompt followed by the emitted text.
    pub text: String,
}

impl DecodingRound {
    /// Number of speculative tokens (k) proposed in this round.
    pub fn num_speculative_tokens(&self) -> usize {
        self.draft_steps.len()
    }

    /// Emitted token ids.
    pub fn tokens(&self) -> Vec<TokenId> {
        self.outcome.tokens()
    }

    /// Serializable form of this round for offline replay.
    pub fn to_record(&self, vocabulary: Vec<String>) -> RoundRecord {
        RoundRecord {
            prompt: self.prompt.clone(),
            vocabulary,
            draft_steps: self.draft_steps.clone(),
            target_positions: self.target_positions.clone(),
        }
    }
}

/// Acceptance statistics across rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    /// Completed rounds (= target forward passes).
    pub rounds: usize,
    /// Draft tokens proposed.
    pub draft_tokens_proposed: usize,
    /// Draft tokens accepted.
    pub draft_tokens_accepted: usize,
    /// Rounds that ended in a resample.
    pub resampled_tokens: usize,
}

impl GenerationStats {
    fn record(&mut self, round: &DecodingRound) {
        self.rounds += 1;
        self.draft_tokens_proposed += round.num_speculative_tokens();
        self.draft_tokens_accepted += round.outcome.num_accepted();
        if round.outcome.was_resampled() {
            self.resampled_tokens += 1;
        }
    }

    /// Fraction of proposed draft tokens that were accepted.
    pub fn acceptance_rate(&self) -> f64 {
        if self.draft_tokens_proposed == 0 {
            0.0
        } else {
            self.draft_tokens_accepted as f64 / self.draft_tokens_proposed as f64
        }
    }

    /// Target forward passes; one per round.
    pub fn target_passes(&self) -> usize {
        self.rounds
    }
}

/// Output of multi-round generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    /// Prompt followed by all generated text.
    pub text: String,
    /// Generated token ids.
    pub tokens: Vec<TokenId>,
    /// Acceptance statistics.
    pub stats: GenerationStats,
}

/// Concatenates the prompt with the decoded accepted tokens, in order.
pub fn assemble_output<S: AsRef<str>>(prompt: &str, fragments: &[S]) -> String {
    let mut text = String::with_capacity(
        prompt.len() + fragments.iter().map(|f| f.as_ref().len()).sum::<usize>(),
    );
    text.push_str(prompt);
    for fragment in fragments {
        text.push_str(fragment.as_ref());
    }
    text
}

/// Speculative decoding engine.
///
/// Owns the draft and target providers (and through them the model
/// handles), created once and reused for every round.
///
/// ## Workflow
///
/// 1. **Draft**: Generate K tokens with the draft provider
/// 2. **Verify**: Score the extended context with one target pass
/// 3. **Accept/Reject**: Walk the offsets with the acceptance sampler
/// 4. **Assemble**: Append the emitted text to the prompt
pub struct SpeculativeEngine<D, T, C, R = StdRng> {
    draft: D,
    target: T,
    codec: C,
    sampler: AcceptanceSampler<R>,
    config: SpeculativeConfig,
}

impl<D, T, C> SpeculativeEngine<D, T, C, StdRng>
where
    D: TokenDistributionProvider,
    T: TokenDistributionProvider,
    C: TokenDecoder,
{
    /// Create a new speculative engine.
    ///
    /// The sampler is seeded from `config.seed` when set, otherwise from OS
    /// entropy.
    pub fn new(draft: D, target: T, codec: C, config: SpeculativeConfig) -> Result<Self> {
        let sampler = match config.seed {
            Some(seed) => AcceptanceSampler::with_seed(seed),
            None => AcceptanceSampler::new(),
        };
        Self::with_sampler(draft, target, codec, config, sampler)
    }
}

impl<D, T, C, R> SpeculativeEngine<D, T, C, R>
where
    D: TokenDistributionProvider,
    T: TokenDistributionProvider,
    C: TokenDecoder,
    R: Rng,
{
    /// Create an engine around an explicit sampler.
    ///
    /// The sampler's rounding precision is taken from `config`.
    pub fn with_sampler(
        draft: D,
        target: T,
        codec: C,
        config: SpeculativeConfig,
        sampler: AcceptanceSampler<R>,
    ) -> Result<Self> {
        config.validate()?;
        let vocab_size = ensure_shared_vocabulary(&draft, &target)?;
        info!(
            vocab_size,
            k = config.num_speculative_tokens,
            precision = ?config.probability_precision,
            "speculative engine ready"
        );

        Ok(Self {
            draft,
            target,
            codec,
            sampler: sampler.precision(config.probability_precision),
            config,
        })
    }

    /// Perform one speculative decoding round on `prompt`.
    ///
    /// # Returns
    ///
    /// The round, whose text is the prompt plus 1 to K emitted tokens.
    pub fn run_round(&mut self, prompt: &str) -> Result<DecodingRound> {
        let k = self.config.num_speculative_tokens;

        let draft = DraftGenerator::new(&mut self.draft, &self.codec).propose(prompt, k)?;
        let positions = TargetVerifier::new(&mut self.target).verify(&draft.extended_context)?;
        let matched = matching_positions(&positions, k)?.to_vec();

        let outcome = self.sampler.walk(&draft.steps, &matched)?;
        let fragments = decode_all(&self.codec, &outcome)?;
        let text = assemble_output(prompt, &fragments);

        info!(
            k,
            accepted = outcome.num_accepted(),
            resampled = outcome.was_resampled(),
            "round complete"
        );

        Ok(DecodingRound {
            prompt: prompt.to_string(),
            draft_steps: draft.steps,
            target_positions: matched,
            outcome,
            fragments,
            text,
        })
    }

    /// Generate up to `max_new_tokens` tokens by chaining rounds.
    ///
    /// Rounds are independent: each round's text becomes the next prompt.
    pub fn generate(&mut self, prompt: &str, max_new_tokens: usize) -> Result<GenerationOutput> {
        let mut text = prompt.to_string();
        let mut tokens = Vec::with_capacity(max_new_tokens);
        let mut stats = GenerationStats::default();

        while tokens.len() < max_new_tokens {
            let round = self.run_round(&text)?;
            stats.record(&round);

            let take = round.fragments.len().min(max_new_tokens - tokens.len());
            for (token, fragment) in round.tokens().into_iter().zip(&round.fragments).take(take) {
                tokens.push(token);
                text.push_str(fragment);
            }
            debug!(generated = tokens.len(), max_new_tokens, "generation progress");
        }

        info!(
            rounds = stats.rounds,
            generated = tokens.len(),
            acceptance_rate = stats.acceptance_rate(),
            "generation complete"
        );

        Ok(GenerationOutput {
            text,
            tokens,
            stats,
        })
    }

    /// Generate with the configured `max_new_tokens` budget.
    pub fn generate_default(&mut self, prompt: &str) -> Result<GenerationOutput> {
        let max_new_tokens = self.config.max_new_tokens;
        self.generate(prompt, max_new_tokens)
    }

    /// Get the speculative configuration.
    pub fn config(&self) -> &SpeculativeConfig {
        &self.config
    }

    /// Get reference to the draft provider.
    pub fn draft(&self) -> &D {
        &self.draft
    }

    /// Get reference to the target provider.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Get reference to the codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }
}

/// Reruns the acceptance walk of a recorded round.
///
/// Draft and target distributions come from the record, so no provider is
/// called; with a seeded sampler the result is reproducible.
pub fn replay_round<R: Rng>(
    record: &RoundRecord,
    sampler: &mut AcceptanceSampler<R>,
) -> Result<DecodingRound> {
    let vocabulary = StaticVocabulary::new(record.vocabulary.clone());
    let outcome = sampler.walk(&record.draft_steps, &record.target_positions)?;
    let fragments = decode_all(&vocabulary, &outcome)?;
    let text = assemble_output(&record.prompt, &fragments);

    Ok(DecodingRound {
        prompt: record.prompt.clone(),
        draft_steps: record.draft_steps.clone(),
        target_positions: record.target_positions.clone(),
        outcome,
        fragments,
        text,
    })
}

fn decode_all<C: TokenDecoder + ?Sized>(
    codec: &C,
    outcome: &AcceptanceOutcome,
) -> Result<Vec<String>> {
    outcome
        .tokens()
        .into_iter()
        .map(|token| codec.decode(token))
        .collect()
}
