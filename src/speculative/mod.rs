//! Speculative decoding.
//!
//! This module implements draft-verify speculative decoding
//! for faster token generation.
//!
//! ## How it works
//!
//! 1. **Draft Phase**: The draft provider proposes K tokens greedily, one
//!    call per token.
//!
//! 2. **Verify Phase**: The target provider scores the prompt plus all K
//!    draft tokens in a single pass.
//!
//! 3. **Acceptance Sampling**: Each draft token is accepted with probability
//!    `min(1, p/q)`; the first rejected one is replaced by a draw from
//!    `max(0, p - q)` and the round ends.
//!
//! ## Example
//!
//! ```text
//! Draft (K=3):     [prompt] -> t1 -> t2 -> t3
//! Target verify:   [prompt, t1, t2, t3] -> distributions for every position
//! Acceptance:      Accept t1, reject t2, resample -> final: t1, t2'
//! ```

pub mod config;
pub mod draft;
pub mod engine;
pub mod sampler;
pub mod verify;

pub use config::SpeculativeConfig;
pub use draft::{Draft, DraftGenerator};
pub use engine::{
    assemble_output, replay_round, DecodingRound, GenerationOutput, GenerationStats,
    SpeculativeEngine,
};
pub use sampler::{adjusted_distribution, Acceptance, AcceptanceOutcome, AcceptanceSampler, Verdict};
pub use verify::{matching_position, matching_positions, TargetVerifier};
