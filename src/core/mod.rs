//! Core data model for speculative decoding.
//!
//! This module contains the values passed between the decoding stages:
//! - TokenId and ProbabilityDistribution
//! - DraftStep and TargetPosition for a single round
//! - RoundRecord for replaying a round offline

pub mod distribution;
pub mod round;

pub use distribution::{ProbabilityDistribution, TokenId};
pub use round::{DraftStep, RoundRecord, TargetPosition};
