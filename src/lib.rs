//! spec-decode: speculative decoding with exact acceptance sampling.
//!
//! A cheap draft model proposes K tokens, an expensive target model scores
//! them in one pass, and a rejection sampler keeps the output distributed
//! exactly as the target model's:
//! - DraftGenerator drives the draft provider greedily for K steps
//! - TargetVerifier runs the single verification pass
//! - AcceptanceSampler accepts, probabilistically accepts, or resamples
//! - assemble_output appends the emitted text to the prompt

pub mod config;
pub mod error;

pub mod core;
pub mod provider;
pub mod speculative;

pub use config::{load_config, DecoderConfig, ProviderConfig};
pub use core::{DraftStep, ProbabilityDistribution, RoundRecord, TargetPosition, TokenId};
pub use error::{Error, Result};
pub use provider::{
    CausalLm, HfTokenizer, LogitsProvider, ModelRole, StaticVocabulary, TextBridge, TextCodec,
    TokenDecoder, TokenDistributionProvider,
};
pub use speculative::{
    assemble_output, replay_round, AcceptanceSampler, DecodingRound, GenerationOutput,
    SpeculativeConfig, SpeculativeEngine, Verdict,
};
