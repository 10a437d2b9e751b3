//! Text codecs: HuggingFace tokenizers and explicit vocabulary tables.

use std::collections::HashMap;
use std::path::Path;

use tokenizers::Tokenizer;

use super::{TextCodec, TokenDecoder};
use crate::core::TokenId;
use crate::error::{Error, Result};

/// [`TextCodec`] backed by a `tokenizer.json` file.
pub struct HfTokenizer {
    inner: Tokenizer,
}

impl HfTokenizer {
    /// Loads a tokenizer from a `tokenizer.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let inner = Tokenizer::from_file(path).map_err(|e| {
            Error::Tokenization(format!("failed to load {}: {e}", path.display()))
        })?;
        Ok(Self { inner })
    }

    /// Wraps an already constructed tokenizer.
    pub fn new(inner: Tokenizer) -> Self {
        Self { inner }
    }

    /// Vocabulary size including added tokens.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    /// Get reference to the wrapped tokenizer.
    pub fn inner(&self) -> &Tokenizer {
        &self.inner
    }
}

impl TokenDecoder for HfTokenizer {
    fn decode(&self, token: TokenId) -> Result<String> {
        self.inner
            .decode(&[token], false)
            .map_err(|e| Error::Tokenization(e.to_string()))
    }
}

impl TextCodec for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| Error::Tokenization(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }
}

/// Longest token string considered by [`StaticVocabulary::encode`], in bytes.
const MAX_MATCH_BYTES: usize = 32;

/// [`TextCodec`] over an explicit id -> text table.
///
/// Encoding is greedy longest-match; it fails on text no entry covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticVocabulary {
    id_to_token: Vec<String>,
    token_to_id: HashMap<String, TokenId>,
}

impl StaticVocabulary {
    /// Builds the table; later duplicates of a string lose to earlier ids.
    pub fn new(tokens: Vec<String>) -> Self {
        let mut token_to_id = HashMap::with_capacity(tokens.len());
        for (id, token) in tokens.iter().enumerate() {
            token_to_id.entry(token.clone()).or_insert(id as TokenId);
        }
        Self {
            id_to_token: tokens,
            token_to_id,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    /// True when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    /// Id of an exact token string.
    pub fn token_to_id(&self, token: &str) -> Option<TokenId> {
        self.token_to_id.get(token).copied()
    }

    /// All token strings, indexed by id.
    pub fn tokens(&self) -> &[String] {
        &self.id_to_token
    }
}

impl TokenDecoder for StaticVocabulary {
    fn decode(&self, token: TokenId) -> Result<String> {
        self.id_to_token
            .get(token as usize)
            .cloned()
            .ok_or_else(|| {
                Error::Tokenization(format!(
                    "token {token} not in vocabulary of {} entries",
                    self.id_to_token.len()
                ))
            })
    }
}

impl TextCodec for StaticVocabulary {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let mut ids = Vec::new();
        let mut rest = text;

        while !rest.is_empty() {
            let limit = rest.len().min(MAX_MATCH_BYTES);
            let matched = (1..=limit)
                .rev()
                .filter(|&len| rest.is_char_boundary(len))
                .find_map(|len| self.token_to_id(&rest[..len]).map(|id| (id, len)));

            match matched {
                Some((id, len)) => {
                    ids.push(id);
                    rest = &rest[len..];
                }
                None => {
                    return Err(Error::Tokenization(format!(
                        "no vocabulary entry matches {:?}",
                        rest.chars().next().unwrap_or_default()
                    )));
                }
            }
        }

        Ok(ids)
    }
}
