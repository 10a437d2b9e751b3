//! Configuration types for spec-decode.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::speculative::SpeculativeConfig;

/// Limits applied by distribution providers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Longest context, in tokens, a provider accepts. `None` = unbounded.
    pub max_context_tokens: Option<usize>,
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Round and sampling settings.
    pub speculative: SpeculativeConfig,
    /// Provider limits.
    pub provider: ProviderConfig,
}

/// Loads and validates a JSON configuration file.
///
/// Missing fields fall back to their defaults.
pub fn load_config(path: &Path) -> Result<DecoderConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    let config: DecoderConfig = serde_json::from_str(&content)?;
    config.speculative.validate()?;

    Ok(config)
}
