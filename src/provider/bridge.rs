//! Explicit token remapping between two vocabularies via text.
//!
//! Draft and target must share one id space. When the source models ship
//! different tokenizers, ids are carried across through their text form
//! instead of being assumed compatible.

use super::{ModelRole, TextCodec, TokenDecoder};
use crate::core::TokenId;
use crate::error::{Error, Result};

/// Maps ids from a source vocabulary into a target vocabulary.
pub struct TextBridge<S, T> {
    source: S,
    target: T,
    target_vocab_size: usize,
}

impl<S: TokenDecoder, T: TextCodec> TextBridge<S, T> {
    /// Creates a bridge decoding with `source` and re-encoding with `target`.
    pub fn new(source: S, target: T, target_vocab_size: usize) -> Self {
        Self {
            source,
            target,
            target_vocab_size,
        }
    }

    /// Target id for `token`.
    ///
    /// Fails with [`Error::VocabularyMismatch`] when the text of `token`
    /// does not re-encode to exactly one in-range target token.
    pub fn map_token(&self, token: TokenId) -> Result<TokenId> {
        let text = self.source.decode(token)?;
        let ids = self.target.encode(&text)?;

        match ids.as_slice() {
            [id] if (*id as usize) < self.target_vocab_size => Ok(*id),
            _ => Err(Error::VocabularyMismatch {
                token,
                vocab_size: self.target_vocab_size,
                role: ModelRole::Target,
            }),
        }
    }

    /// Maps a whole id sequence by decoding it and re-encoding the text.
    pub fn map_sequence(&self, tokens: &[TokenId]) -> Result<Vec<TokenId>> {
        let text = tokens
            .iter()
            .map(|&t| self.source.decode(t))
            .collect::<Result<String>>()?;
        self.target.encode(&text)
    }
}
