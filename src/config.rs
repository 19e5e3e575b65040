use serde::{Deserialize, Serialize};

/// Global ceiling on `page * per_page` for a search request.
pub const MAX_RESULTS: usize = 500;

/// Token count above which snippet windowing kicks in during highlighting.
pub const SNIPPET_STR_ABOVE_LEN: usize = 30;

/// Number of in-memory index shards per collection.
pub const NUM_INDICES: usize = 4;

/// Collection tuning knobs.
///
/// The defaults match the constants above; a caller that wants a different
/// shard count or result ceiling builds a config and passes it to
/// [`Collection::with_config`](crate::Collection::with_config).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub num_indices: usize,
    pub max_results: usize,
    pub snippet_str_above_len: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            num_indices: NUM_INDICES,
            max_results: MAX_RESULTS,
            snippet_str_above_len: SNIPPET_STR_ABOVE_LEN,
        }
    }
}

impl CollectionConfig {
    /// Set the number of index shards
    pub fn with_num_indices(mut self, num_indices: usize) -> Self {
        self.num_indices = num_indices;
        self
    }

    /// Set the result ceiling
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the snippet windowing threshold
    pub fn with_snippet_str_above_len(mut self, len: usize) -> Self {
        self.snippet_str_above_len = len;
        self
    }
}
