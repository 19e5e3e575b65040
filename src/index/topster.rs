//! Bounded top-K candidate collection.
//!
//! Each shard accumulates its candidates in a [`Topster`] so a search over
//! a large shard hands back at most `page * per_page` entries, which is the
//! most any single shard can contribute to the merged page. Entries are
//! keyed by document: a document matching several search fields keeps only
//! its best-ranked entry, so it occupies exactly one capacity slot.

use std::collections::HashMap;

/// Per-candidate ranking record produced by a shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub match_score: i64,
    pub primary_attr: i64,
    pub secondary_attr: i64,
    /// seq_id of the document
    pub key: u32,
    /// Index into the searched-queries accumulator
    pub query_index: usize,
}

/// The global descending rank tuple.
///
/// `field_order_index` encodes request-order field priority; `key` is last
/// so the ordering is total and the merge deterministic.
pub(crate) fn rank_key(entry: &(i32, Candidate)) -> (i64, i64, i64, i32, u32) {
    let (field_order_index, kv) = entry;
    (
        kv.match_score,
        kv.primary_attr,
        kv.secondary_attr,
        *field_order_index,
        kv.key,
    )
}

/// Sort candidates descending by the global rank tuple.
pub(crate) fn sort_candidates(candidates: &mut [(i32, Candidate)]) {
    candidates.sort_unstable_by(|a, b| rank_key(b).cmp(&rank_key(a)));
}

/// Bounded top-K collector keyed by the global rank tuple, holding at most
/// one entry per document.
pub struct Topster {
    capacity: usize,
    entries: HashMap<u32, (i32, Candidate)>,
}

impl Topster {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    /// Insert a candidate. A document already present keeps whichever of
    /// its entries ranks higher, so re-pushing from another search field
    /// never consumes an extra capacity slot.
    pub fn push(&mut self, field_order_index: i32, kv: Candidate) {
        let entry = (field_order_index, kv);
        match self.entries.get_mut(&kv.key) {
            Some(existing) => {
                if rank_key(&entry) > rank_key(existing) {
                    *existing = entry;
                }
            }
            None => {
                self.entries.insert(kv.key, entry);
                if self.entries.len() >= self.capacity * 2 {
                    self.shrink();
                }
            }
        }
    }

    fn shrink(&mut self) {
        let mut kept: Vec<(i32, Candidate)> = self.entries.values().copied().collect();
        sort_candidates(&mut kept);
        kept.truncate(self.capacity);
        self.entries = kept.into_iter().map(|entry| (entry.1.key, entry)).collect();
    }

    /// The kept candidates, best first.
    pub fn into_sorted(self) -> Vec<(i32, Candidate)> {
        let mut kept: Vec<(i32, Candidate)> = self.entries.into_values().collect();
        sort_candidates(&mut kept);
        kept.truncate(self.capacity);
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(match_score: i64, key: u32) -> Candidate {
        Candidate {
            match_score,
            primary_attr: 0,
            secondary_attr: 0,
            key,
            query_index: 0,
        }
    }

    #[test]
    fn test_topster_keeps_best() {
        let mut topster = Topster::new(2);
        for i in 0..10 {
            topster.push(1, candidate(i, i as u32));
        }
        let kept = topster.into_sorted();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].1.match_score, 9);
        assert_eq!(kept[1].1.match_score, 8);
    }

    #[test]
    fn test_topster_keeps_one_slot_per_document() {
        // Capacity 2; document 7 matches two fields with the two highest
        // scores. It must not crowd out the other documents.
        let mut topster = Topster::new(2);
        topster.push(2, candidate(100, 7));
        topster.push(1, candidate(99, 7));
        topster.push(1, candidate(50, 1));
        topster.push(1, candidate(40, 2));

        let kept = topster.into_sorted();
        assert_eq!(kept.len(), 2);
        assert_eq!((kept[0].0, kept[0].1.key), (2, 7));
        assert_eq!(kept[1].1.key, 1);
    }

    #[test]
    fn test_topster_repush_keeps_best_entry() {
        let mut topster = Topster::new(4);
        topster.push(1, candidate(10, 3));
        topster.push(2, candidate(90, 3));
        topster.push(1, candidate(20, 3));

        let kept = topster.into_sorted();
        assert_eq!(kept.len(), 1);
        assert_eq!((kept[0].0, kept[0].1.match_score), (2, 90));
    }

    #[test]
    fn test_rank_tuple_tie_breaks() {
        // Equal scores: higher field_order_index (earlier-listed field) wins,
        // then higher key.
        let mut kvs = vec![
            (1, candidate(5, 3)),
            (2, candidate(5, 1)),
            (1, candidate(5, 9)),
        ];
        sort_candidates(&mut kvs);
        assert_eq!((kvs[0].0, kvs[0].1.key), (2, 1));
        assert_eq!((kvs[1].0, kvs[1].1.key), (1, 9));
        assert_eq!((kvs[2].0, kvs[2].1.key), (1, 3));
    }

    #[test]
    fn test_primary_attr_outranks_field_order() {
        let mut kvs = vec![
            (
                2,
                Candidate {
                    match_score: 5,
                    primary_attr: 1,
                    secondary_attr: 0,
                    key: 1,
                    query_index: 0,
                },
            ),
            (
                1,
                Candidate {
                    match_score: 5,
                    primary_attr: 2,
                    secondary_attr: 0,
                    key: 2,
                    query_index: 0,
                },
            ),
        ];
        sort_candidates(&mut kvs);
        assert_eq!(kvs[0].1.key, 2);
    }
}
