//! In-memory index shard.
//!
//! A collection partitions its documents over a fixed number of shards by
//! `seq_id % N`. Each shard keeps per-field posting lists with token
//! positions, typed field values for filtering, faceting and sorting, and
//! the per-document ranking points. Search evaluates one shard at a time;
//! the collection merges the per-shard candidates into the global ranking.

mod filter;
mod postings;
mod topster;

pub use filter::{parse_filter_query, FilterCondition, FilterOp};
pub use postings::{PostingList, QueryExpansion, TokenPostings};
pub use topster::{Candidate, Topster};

pub(crate) use topster::sort_candidates;

use std::collections::HashMap;
use std::sync::Arc;

use roaring::RoaringBitmap;
use serde_json::Value;

use crate::highlight::MatchScore;
use crate::models::{SortOrder, TokenOrder};
use crate::schema::{FieldType, Schema};
use crate::Result;

use postings::{tokenize_query, tokenize_with_positions};

/// Most vocabulary expansions considered per query token.
const MAX_TOKEN_CANDIDATES: usize = 4;

/// Facet accumulator for one requested facet field, shared across the
/// shard fan-out of a single search.
#[derive(Clone, Debug)]
pub struct Facet {
    pub field_name: String,
    pub counts: HashMap<String, usize>,
}

impl Facet {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            counts: HashMap::new(),
        }
    }
}

/// Typed values of one field in one document
#[derive(Clone, Debug)]
enum FieldValues {
    Strings(Vec<String>),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

/// One in-memory index shard.
pub struct Index {
    schema: Arc<Schema>,
    /// field → token → postings
    search_index: HashMap<String, HashMap<String, PostingList>>,
    /// field → seq_id → typed values
    values: HashMap<String, HashMap<u32, FieldValues>>,
    /// seq_id → ranking points
    points: HashMap<u32, i32>,
    /// documents held by this shard
    seq_ids: RoaringBitmap,
}

impl Index {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            search_index: HashMap::new(),
            values: HashMap::new(),
            points: HashMap::new(),
            seq_ids: RoaringBitmap::new(),
        }
    }

    /// Number of documents in this shard
    pub fn num_documents(&self) -> usize {
        self.seq_ids.len() as usize
    }

    pub fn contains(&self, seq_id: u32) -> bool {
        self.seq_ids.contains(seq_id)
    }

    /// Index a validated document under `seq_id`.
    pub fn insert(&mut self, document: &Value, seq_id: u32, points: i32) {
        let schema = self.schema.clone();
        for field in schema.fields() {
            let Some(value) = document.get(&field.name) else {
                continue;
            };

            let field_values = match field.field_type {
                FieldType::String => {
                    let text = value.as_str().unwrap_or_default();
                    self.index_text(&field.name, seq_id, text, 0);
                    FieldValues::Strings(vec![text.to_string()])
                }
                FieldType::StringArray => {
                    let elements: Vec<String> = value
                        .as_array()
                        .map(|arr| {
                            arr.iter()
                                .filter_map(|v| v.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default();
                    let mut offset = 0;
                    for element in &elements {
                        offset += self.index_text(&field.name, seq_id, element, offset);
                    }
                    FieldValues::Strings(elements)
                }
                FieldType::Int32 | FieldType::Int64 => {
                    FieldValues::Ints(value.as_i64().into_iter().collect())
                }
                FieldType::Float => FieldValues::Floats(value.as_f64().into_iter().collect()),
                FieldType::Int32Array | FieldType::Int64Array => FieldValues::Ints(
                    value
                        .as_array()
                        .map(|arr| arr.iter().filter_map(|v| v.as_i64()).collect())
                        .unwrap_or_default(),
                ),
                FieldType::FloatArray => FieldValues::Floats(
                    value
                        .as_array()
                        .map(|arr| arr.iter().filter_map(|v| v.as_f64()).collect())
                        .unwrap_or_default(),
                ),
            };

            self.values
                .entry(field.name.clone())
                .or_default()
                .insert(seq_id, field_values);
        }

        self.points.insert(seq_id, points);
        self.seq_ids.insert(seq_id);
    }

    fn index_text(&mut self, field_name: &str, seq_id: u32, text: &str, offset: usize) -> usize {
        let (tokens, count) = tokenize_with_positions(text, offset);
        let field_postings = self.search_index.entry(field_name.to_string()).or_default();
        for (token, position) in tokens {
            field_postings.entry(token).or_default().add(seq_id, position);
        }
        count
    }

    /// Drop a document from this shard. Shards that never held the seq_id
    /// treat the call as a no-op, so the collection can safely broadcast
    /// removals.
    pub fn remove(&mut self, seq_id: u32, document: &Value) {
        if !self.seq_ids.contains(seq_id) {
            return;
        }

        let schema = self.schema.clone();
        for field in schema.string_fields() {
            let Some(field_postings) = self.search_index.get_mut(&field.name) else {
                continue;
            };

            let texts: Vec<String> = match document.get(&field.name) {
                Some(Value::String(s)) => vec![s.clone()],
                Some(Value::Array(arr)) => arr
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                _ => Vec::new(),
            };

            for text in texts {
                let (tokens, _) = tokenize_with_positions(&text, 0);
                for (token, _) in tokens {
                    if let Some(posting) = field_postings.get_mut(&token) {
                        posting.remove(seq_id);
                        if posting.is_empty() {
                            field_postings.remove(&token);
                        }
                    }
                }
            }
        }

        for per_doc in self.values.values_mut() {
            per_doc.remove(&seq_id);
        }
        self.points.remove(&seq_id);
        self.seq_ids.remove(seq_id);
    }

    /// Search this shard, appending candidates into the shared accumulators.
    ///
    /// `field_order_kvs` receives at most `page * per_page` entries tagged
    /// with the field-order index of the matched field; `searched_queries`
    /// receives one expansion per searched field with matches, which the
    /// highlighter later indexes into via `Candidate::query_index`.
    #[allow(clippy::too_many_arguments)]
    pub fn search(
        &self,
        query: &str,
        search_fields: &[String],
        filter_query: &str,
        facets: &mut [Facet],
        sort_fields: &[(String, SortOrder)],
        num_typos: usize,
        per_page: usize,
        page: usize,
        token_order: TokenOrder,
        prefix: bool,
        field_order_kvs: &mut Vec<(i32, Candidate)>,
        all_result_ids_len: &mut usize,
        searched_queries: &mut Vec<QueryExpansion>,
    ) -> Result<()> {
        // A malformed filter is rejected even when the query itself
        // matches nothing.
        let conditions = parse_filter_query(filter_query)?;

        let query_tokens = tokenize_query(query);
        if query_tokens.is_empty() {
            return Ok(());
        }

        let filter_ids = if conditions.is_empty() {
            None
        } else {
            Some(self.eval_filter(&conditions))
        };

        let mut topster = Topster::new(page.saturating_mul(per_page));
        let mut shard_result_ids = RoaringBitmap::new();

        for (field_index, field_name) in search_fields.iter().enumerate() {
            let Some(field_postings) = self.search_index.get(field_name) else {
                continue;
            };

            let mut matched: Vec<TokenPostings> = Vec::new();
            for (token_index, query_token) in query_tokens.iter().enumerate() {
                let is_last = token_index == query_tokens.len() - 1;
                let candidates = expand_token(
                    field_postings,
                    query_token,
                    num_typos,
                    prefix && is_last,
                    token_order,
                );
                if candidates.is_empty() {
                    continue;
                }

                let mut merged: HashMap<u32, Vec<u16>> = HashMap::new();
                for candidate in candidates {
                    if let Some(posting) = field_postings.get(candidate) {
                        for (&doc_id, positions) in &posting.positions {
                            merged.entry(doc_id).or_default().extend(positions);
                        }
                    }
                }
                for positions in merged.values_mut() {
                    positions.sort_unstable();
                    positions.dedup();
                }

                matched.push(TokenPostings {
                    token: query_token.clone(),
                    positions: merged,
                });
            }

            if matched.is_empty() {
                continue;
            }

            let mut doc_ids: RoaringBitmap =
                matched[0].positions.keys().copied().collect();
            for token_postings in &matched[1..] {
                let other: RoaringBitmap = token_postings.positions.keys().copied().collect();
                doc_ids &= other;
            }
            if let Some(filter_ids) = &filter_ids {
                doc_ids &= filter_ids;
            }
            if doc_ids.is_empty() {
                continue;
            }

            let query_index = searched_queries.len();
            let field_order_index = (search_fields.len() - field_index) as i32;

            for seq_id in doc_ids.iter() {
                let token_positions: Vec<Vec<u16>> = matched
                    .iter()
                    .map(|tp| tp.positions.get(&seq_id).cloned().unwrap_or_default())
                    .collect();
                let mscore = MatchScore::evaluate(&token_positions);
                let (primary_attr, secondary_attr) = self.sort_attrs(seq_id, sort_fields);

                topster.push(
                    field_order_index,
                    Candidate {
                        match_score: mscore.score(),
                        primary_attr,
                        secondary_attr,
                        key: seq_id,
                        query_index,
                    },
                );
            }

            shard_result_ids |= &doc_ids;
            searched_queries.push(QueryExpansion { tokens: matched });
        }

        *all_result_ids_len += shard_result_ids.len() as usize;

        for facet in facets.iter_mut() {
            let Some(per_doc) = self.values.get(&facet.field_name) else {
                continue;
            };
            for seq_id in shard_result_ids.iter() {
                if let Some(FieldValues::Strings(doc_values)) = per_doc.get(&seq_id) {
                    for value in doc_values {
                        *facet.counts.entry(value.clone()).or_insert(0) += 1;
                    }
                }
            }
        }

        field_order_kvs.extend(topster.into_sorted());
        Ok(())
    }

    fn eval_filter(&self, conditions: &[FilterCondition]) -> RoaringBitmap {
        let mut result = self.seq_ids.clone();

        for condition in conditions {
            let per_doc = self.values.get(&condition.field);
            let mut passing = RoaringBitmap::new();

            if let Some(per_doc) = per_doc {
                for seq_id in result.iter() {
                    let matches = match per_doc.get(&seq_id) {
                        Some(FieldValues::Strings(v)) => condition.matches_strings(v),
                        Some(FieldValues::Ints(v)) => condition.matches_ints(v),
                        Some(FieldValues::Floats(v)) => condition.matches_floats(v),
                        None => false,
                    };
                    if matches {
                        passing.insert(seq_id);
                    }
                }
            }

            result = passing;
            if result.is_empty() {
                break;
            }
        }

        result
    }

    /// Ranking attributes below `match_score` in the global tuple: the
    /// requested sort-field values, or the document's points when the
    /// request has no sort fields.
    fn sort_attrs(&self, seq_id: u32, sort_fields: &[(String, SortOrder)]) -> (i64, i64) {
        if sort_fields.is_empty() {
            let points = self.points.get(&seq_id).copied().unwrap_or(0);
            return (points as i64, 0);
        }

        let primary = self.sort_attr(seq_id, &sort_fields[0]);
        let secondary = sort_fields
            .get(1)
            .map(|sf| self.sort_attr(seq_id, sf))
            .unwrap_or(0);
        (primary, secondary)
    }

    fn sort_attr(&self, seq_id: u32, sort_field: &(String, SortOrder)) -> i64 {
        let (name, order) = sort_field;
        let raw = match self.values.get(name).and_then(|m| m.get(&seq_id)) {
            Some(FieldValues::Ints(v)) => v.first().copied().unwrap_or(0),
            Some(FieldValues::Floats(v)) => {
                float_to_ordered_i64(v.first().copied().unwrap_or(0.0))
            }
            _ => 0,
        };

        // The global merge sorts descending, so ASC negates.
        match order {
            SortOrder::Desc => raw,
            SortOrder::Asc => raw.saturating_neg(),
        }
    }
}

/// Order-preserving f64 → i64 transform for sort attributes.
fn float_to_ordered_i64(f: f64) -> i64 {
    let bits = f.to_bits() as i64;
    bits ^ ((bits >> 63) | i64::MIN)
}

/// Expand a query token against a field's vocabulary: exact match first,
/// then prefix completions (final token only), then typo variants within
/// the allowed edit distance.
fn expand_token<'a>(
    field_postings: &'a HashMap<String, PostingList>,
    query_token: &str,
    num_typos: usize,
    prefix: bool,
    token_order: TokenOrder,
) -> Vec<&'a str> {
    struct Expansion<'a> {
        token: &'a str,
        distance: usize,
        doc_freq: usize,
    }

    let mut expansions: Vec<Expansion<'a>> = Vec::new();

    if let Some((token, posting)) = field_postings.get_key_value(query_token) {
        expansions.push(Expansion {
            token,
            distance: 0,
            doc_freq: posting.doc_frequency(),
        });
    }

    if prefix {
        for (token, posting) in field_postings {
            if token != query_token && token.starts_with(query_token) {
                expansions.push(Expansion {
                    token,
                    distance: 1,
                    doc_freq: posting.doc_frequency(),
                });
            }
        }
    }

    // Typo variants are a fallback, explored only when the token itself
    // yields nothing.
    if expansions.is_empty() && num_typos > 0 {
        for (token, posting) in field_postings {
            if let Some(distance) = levenshtein_within(token, query_token, num_typos) {
                expansions.push(Expansion {
                    token,
                    distance,
                    doc_freq: posting.doc_frequency(),
                });
            }
        }
    }

    match token_order {
        TokenOrder::Frequency => expansions.sort_unstable_by(|a, b| {
            (a.distance, std::cmp::Reverse(a.doc_freq), a.token)
                .cmp(&(b.distance, std::cmp::Reverse(b.doc_freq), b.token))
        }),
        TokenOrder::MaxScore => expansions
            .sort_unstable_by(|a, b| (a.distance, a.token).cmp(&(b.distance, b.token))),
    }

    expansions
        .into_iter()
        .take(MAX_TOKEN_CANDIDATES)
        .map(|e| e.token)
        .collect()
}

/// Levenshtein distance if it is at most `max`, None otherwise.
fn levenshtein_within(a: &str, b: &str, max: usize) -> Option<usize> {
    let a = a.as_bytes();
    let b = b.as_bytes();

    if a.len().abs_diff(b.len()) > max {
        return None;
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr_row[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr_row[j] = (prev_row[j] + 1)
                .min(curr_row[j - 1] + 1)
                .min(prev_row[j - 1] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    let distance = prev_row[b.len()];
    (distance <= max).then_some(distance)
}
