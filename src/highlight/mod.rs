//! Snippet construction from query-token positions.
//!
//! The shard engine reports, for every hit, where each query token landed
//! in the matched field. [`MatchScore`] condenses those positions into a
//! best-window record; [`snippet`] replays that record against the stored
//! field text to produce a `<mark>`-annotated extract.
//!
//! The `MatchScore` layout is an ABI shared with the shard scorer:
//! `offset_diffs[0]` holds the number of token entries, each following
//! entry is the token's offset from `start_offset`, and `i8::MAX` marks a
//! token that did not land in the window.

/// Window radius (in tokens) around the matched span for long fields.
const SNIPPET_CONTEXT_TOKENS: usize = 5;

/// Best-window match record for one document in one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchScore {
    /// Number of query tokens present in the document
    pub words_present: u8,
    /// Span of the best window, capped at 255 (lower is tighter)
    pub distance: u8,
    /// Token index where the best window starts
    pub start_offset: u16,
    /// Count-prefixed per-token offsets from `start_offset`
    pub offset_diffs: Vec<i8>,
}

impl MatchScore {
    /// Condense per-token position lists into the best match window.
    ///
    /// For each candidate anchor position, every token is assigned its
    /// position closest to the anchor; the window minimizing the span
    /// (ties broken towards the leftmost window) wins. Position lists must
    /// be sorted ascending, which is how the shard stores them.
    pub fn evaluate(token_positions: &[Vec<u16>]) -> MatchScore {
        let num_tokens = token_positions.len().min(i8::MAX as usize);
        let token_positions = &token_positions[..num_tokens];

        let words_present = token_positions.iter().filter(|p| !p.is_empty()).count() as u8;

        if words_present == 0 {
            let mut offset_diffs = vec![num_tokens as i8];
            offset_diffs.resize(num_tokens + 1, i8::MAX);
            return MatchScore {
                words_present: 0,
                distance: 255,
                start_offset: 0,
                offset_diffs,
            };
        }

        let mut best: Option<(u16, u16, Vec<Option<u16>>)> = None; // (span, start, assignment)

        for positions in token_positions.iter().filter(|p| !p.is_empty()) {
            for &anchor in positions {
                let assignment: Vec<Option<u16>> = token_positions
                    .iter()
                    .map(|p| closest_position(p, anchor))
                    .collect();

                let present = assignment.iter().flatten();
                let start = present.clone().min().copied().unwrap_or(anchor);
                let end = present.max().copied().unwrap_or(anchor);
                let span = end - start;

                let better = match &best {
                    None => true,
                    Some((best_span, best_start, _)) => {
                        (span, start) < (*best_span, *best_start)
                    }
                };
                if better {
                    best = Some((span, start, assignment));
                }
            }
        }

        let Some((span, start_offset, assignment)) = best else {
            // words_present > 0 guarantees an anchor was found
            let mut offset_diffs = vec![num_tokens as i8];
            offset_diffs.resize(num_tokens + 1, i8::MAX);
            return MatchScore {
                words_present,
                distance: 255,
                start_offset: 0,
                offset_diffs,
            };
        };

        let mut offset_diffs = Vec::with_capacity(num_tokens + 1);
        offset_diffs.push(num_tokens as i8);
        for slot in &assignment {
            match slot {
                Some(pos) if pos - start_offset < i8::MAX as u16 => {
                    offset_diffs.push((pos - start_offset) as i8);
                }
                _ => offset_diffs.push(i8::MAX),
            }
        }

        MatchScore {
            words_present,
            distance: span.min(255) as u8,
            start_offset,
            offset_diffs,
        }
    }

    /// Integer ranking score: tokens present dominate, tighter windows win
    /// among equals.
    pub fn score(&self) -> i64 {
        ((self.words_present as i64) << 16) + (255 - self.distance as i64)
    }

    /// Absolute token indices encoded in `offset_diffs`.
    pub fn token_indices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        let count = self.offset_diffs.first().copied().unwrap_or(0) as usize;
        for i in 1..=count.min(self.offset_diffs.len().saturating_sub(1)) {
            let diff = self.offset_diffs[i];
            if diff != i8::MAX {
                indices.push(self.start_offset as usize + diff as usize);
            }
        }
        indices
    }
}

fn closest_position(positions: &[u16], anchor: u16) -> Option<u16> {
    if positions.is_empty() {
        return None;
    }
    match positions.binary_search(&anchor) {
        Ok(i) => Some(positions[i]),
        Err(i) => {
            let after = positions.get(i).copied();
            let before = i.checked_sub(1).map(|j| positions[j]);
            match (before, after) {
                (Some(b), Some(a)) => {
                    if anchor - b <= a - anchor {
                        Some(b)
                    } else {
                        Some(a)
                    }
                }
                (Some(b), None) => Some(b),
                (None, Some(a)) => Some(a),
                (None, None) => None,
            }
        }
    }
}

/// Space-separated tokens of a stored field value.
///
/// Shared with the indexing tokenizer so that posting-list positions line
/// up with snippet token indices.
pub(crate) fn split_tokens(text: &str) -> Vec<&str> {
    text.split(' ').filter(|t| !t.is_empty()).collect()
}

/// Build a highlighted snippet of `text` from a match record.
///
/// Fields at most `snippet_str_above_len` tokens long are rendered whole;
/// longer fields are windowed to a few tokens around the matched span.
/// Every matched token is wrapped in `<mark>` tags and the window is
/// rejoined with single spaces.
pub fn snippet(text: &str, mscore: &MatchScore, snippet_str_above_len: usize) -> String {
    let tokens = split_tokens(text);
    let token_indices: Vec<usize> = mscore
        .token_indices()
        .into_iter()
        .filter(|&i| i < tokens.len())
        .collect();

    if token_indices.is_empty() {
        return tokens.join(" ");
    }

    let min_index = *token_indices.iter().min().unwrap();
    let max_index = *token_indices.iter().max().unwrap();

    let (start_index, end_index) = if tokens.len() <= snippet_str_above_len {
        (0, tokens.len())
    } else {
        (
            min_index.saturating_sub(SNIPPET_CONTEXT_TOKENS),
            (max_index + SNIPPET_CONTEXT_TOKENS + 1).min(tokens.len()),
        )
    };

    let mut marked: Vec<String> = tokens[start_index..end_index]
        .iter()
        .map(|t| t.to_string())
        .collect();
    for index in token_indices {
        marked[index - start_index] = format!("<mark>{}</mark>", tokens[index]);
    }

    marked.join(" ")
}
