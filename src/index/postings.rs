//! Posting lists and tokenization for the in-memory shard.
//!
//! Positions are space-split word indices into the raw field text, shared
//! with the highlighter so that snippet marking lands on the right tokens.

use std::collections::HashMap;

use crate::highlight::split_tokens;

/// Positions of one token across the documents of a shard.
#[derive(Clone, Debug, Default)]
pub struct PostingList {
    /// seq_id → ascending token positions
    pub positions: HashMap<u32, Vec<u16>>,
}

impl PostingList {
    /// Record an occurrence of the token in a document
    pub fn add(&mut self, seq_id: u32, position: u16) {
        let positions = self.positions.entry(seq_id).or_default();
        match positions.binary_search(&position) {
            Ok(_) => {}
            Err(i) => positions.insert(i, position),
        }
    }

    /// Drop a document from this posting list
    pub fn remove(&mut self, seq_id: u32) {
        self.positions.remove(&seq_id);
    }

    /// Number of documents containing this token
    pub fn doc_frequency(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Postings for one query token, merged over its vocabulary expansions.
///
/// Owned data handed from the shard to the query coordinator; the
/// highlighter looks up a hit's positions here by seq_id.
#[derive(Clone, Debug)]
pub struct TokenPostings {
    pub token: String,
    pub positions: HashMap<u32, Vec<u16>>,
}

/// One executed query expansion: the matched tokens of a single field
/// search, in query order.
#[derive(Clone, Debug)]
pub struct QueryExpansion {
    pub tokens: Vec<TokenPostings>,
}

fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(|c: char| !c.is_alphanumeric());
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Tokenize field text for indexing, keeping the word index of each token.
///
/// Tokens are lowercased with edge punctuation trimmed; the position is the
/// token's index in the space-split text, so it stays valid for snippet
/// reconstruction against the raw stored value.
pub(crate) fn tokenize_with_positions(text: &str, position_offset: usize) -> (Vec<(String, u16)>, usize) {
    let raw_tokens = split_tokens(text);
    let count = raw_tokens.len();

    let tokens = raw_tokens
        .into_iter()
        .enumerate()
        .filter_map(|(i, raw)| {
            let position = position_offset + i;
            if position > u16::MAX as usize {
                return None;
            }
            normalize_token(raw).map(|t| (t, position as u16))
        })
        .collect();

    (tokens, count)
}

/// Tokenize a free-text query the same way field text is tokenized.
pub(crate) fn tokenize_query(query: &str) -> Vec<String> {
    query.split_whitespace().filter_map(normalize_token).collect()
}
