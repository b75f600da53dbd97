//! Ranking and de-duplication of description-level match rows.
//!
//! The term index reports one row per matching description. These helpers
//! collapse rows to one per concept and put the survivors in result order.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::traits::{ExactMatchRow, FuzzyMatchRow};
use crate::SctId;

/// Sort key for word-match rows: `(match_rank, term_length, term)`.
fn exact_order(a: &ExactMatchRow, b: &ExactMatchRow) -> Ordering {
    a.match_rank
        .cmp(&b.match_rank)
        .then(a.term_length.cmp(&b.term_length))
        .then_with(|| a.term.cmp(&b.term))
        .then(a.concept_id.cmp(&b.concept_id))
}

/// Sort key for fuzzy rows: `(score desc, term_length, term)`.
fn fuzzy_order(a: &FuzzyMatchRow, b: &FuzzyMatchRow) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(a.term_length.cmp(&b.term_length))
        .then_with(|| a.term.cmp(&b.term))
        .then(a.concept_id.cmp(&b.concept_id))
}

/// Keeps the best-ranked row per concept and sorts by match quality.
///
/// Best means lowest `(match_rank, term_length)`; ties fall back to the term
/// so the outcome never depends on row order.
pub fn rank_exact(rows: Vec<ExactMatchRow>) -> Vec<ExactMatchRow> {
    let mut ranked = dedupe_by_concept(rows, |candidate, current| {
        exact_order(candidate, current) == Ordering::Less
    });
    ranked.sort_by(exact_order);
    ranked
}

/// Keeps the highest-scoring row per concept and sorts by score.
pub fn rank_fuzzy(rows: Vec<FuzzyMatchRow>) -> Vec<FuzzyMatchRow> {
    let mut ranked = dedupe_by_concept(rows, |candidate, current| {
        fuzzy_order(candidate, current) == Ordering::Less
    });
    ranked.sort_by(fuzzy_order);
    ranked
}

/// Keeps the best row per concept and orders by concept id.
///
/// Used for paging, where a stable order matters more than match quality.
pub fn rank_exact_by_concept_id(rows: Vec<ExactMatchRow>) -> Vec<ExactMatchRow> {
    let mut ranked = dedupe_by_concept(rows, |candidate, current| {
        exact_order(candidate, current) == Ordering::Less
    });
    ranked.sort_by_key(|row| row.concept_id);
    ranked
}

/// Keeps the highest-scoring row per concept and orders by
/// `(score desc, concept_id)`.
pub fn rank_fuzzy_by_score_then_id(rows: Vec<FuzzyMatchRow>) -> Vec<FuzzyMatchRow> {
    let mut ranked = dedupe_by_concept(rows, |candidate, current| {
        fuzzy_order(candidate, current) == Ordering::Less
    });
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.concept_id.cmp(&b.concept_id))
    });
    ranked
}

/// Returns the `[offset, offset + size)` slice of `items`, clipped to bounds.
pub fn window<T>(items: Vec<T>, offset: usize, size: usize) -> Vec<T> {
    items.into_iter().skip(offset).take(size).collect()
}

/// Collapses rows to one per concept, replacing the kept row whenever
/// `better(candidate, kept)` holds. Output order is unspecified.
fn dedupe_by_concept<R, F>(rows: Vec<R>, better: F) -> Vec<R>
where
    R: ConceptRow,
    F: Fn(&R, &R) -> bool,
{
    let mut best: HashMap<SctId, R> = HashMap::with_capacity(rows.len());
    for row in rows {
        match best.entry(row.concept_id()) {
            Entry::Occupied(mut kept) => {
                if better(&row, kept.get()) {
                    kept.insert(row);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
        }
    }
    best.into_values().collect()
}

/// Rows that belong to a concept.
trait ConceptRow {
    fn concept_id(&self) -> SctId;
}

impl ConceptRow for ExactMatchRow {
    fn concept_id(&self) -> SctId {
        self.concept_id
    }
}

impl ConceptRow for FuzzyMatchRow {
    fn concept_id(&self) -> SctId {
        self.concept_id
    }
}

/// Accumulates results from several ordered lists, keeping the first
/// occurrence of each concept.
///
/// Earlier lists win over later ones regardless of how well a concept
/// matched in either.
#[derive(Debug)]
pub struct FirstSeenMerger<T> {
    seen: HashSet<SctId>,
    items: Vec<T>,
}

impl<T> Default for FirstSeenMerger<T> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }
}

impl<T> FirstSeenMerger<T> {
    /// Creates an empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every item whose concept has not been seen yet.
    pub fn extend<I, K>(&mut self, items: I, key: K)
    where
        I: IntoIterator<Item = T>,
        K: Fn(&T) -> SctId,
    {
        for item in items {
            if self.seen.insert(key(&item)) {
                self.items.push(item);
            }
        }
    }

    /// Number of distinct concepts merged so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing has been merged.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the merged items, truncated to `limit`.
    pub fn finish(mut self, limit: usize) -> Vec<T> {
        self.items.truncate(limit);
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::MatchRank;

    fn exact(concept_id: SctId, term: &str, rank: MatchRank) -> ExactMatchRow {
        ExactMatchRow {
            concept_id,
            term: term.to_string(),
            semantic_tag: "finding".to_string(),
            match_rank: rank,
            term_length: term.chars().count(),
        }
    }

    fn fuzzy(concept_id: SctId, term: &str, score: f32) -> FuzzyMatchRow {
        FuzzyMatchRow {
            concept_id,
            term: term.to_string(),
            semantic_tag: "finding".to_string(),
            score,
            term_length: term.chars().count(),
        }
    }

    #[test]
    fn test_rank_exact_orders_exact_prefix_substring() {
        let rows = vec![
            exact(3, "Pain in chest", MatchRank::Substring),
            exact(2, "Chest pain at rest", MatchRank::Prefix),
            exact(1, "Chest pain", MatchRank::Exact),
        ];
        let ranked = rank_exact(rows);
        let ids: Vec<SctId> = ranked.iter().map(|r| r.concept_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_exact_keeps_best_row_per_concept() {
        let rows = vec![
            exact(1, "Pain in chest", MatchRank::Substring),
            exact(1, "Chest pain", MatchRank::Exact),
            exact(2, "Chest pain radiating", MatchRank::Prefix),
        ];
        let ranked = rank_exact(rows);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].concept_id, 1);
        assert_eq!(ranked[0].term, "Chest pain");
    }

    #[test]
    fn test_rank_exact_breaks_ties_by_length_then_term() {
        let rows = vec![
            exact(1, "Pain chest b", MatchRank::Substring),
            exact(2, "Pain chest a", MatchRank::Substring),
            exact(3, "Chest pain, long", MatchRank::Substring),
            exact(4, "Chest-pain", MatchRank::Substring),
        ];
        let ranked = rank_exact(rows);
        let ids: Vec<SctId> = ranked.iter().map(|r| r.concept_id).collect();
        assert_eq!(ids, vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_rank_fuzzy_keeps_max_score_per_concept() {
        let rows = vec![
            fuzzy(1, "Headache", 0.4),
            fuzzy(1, "Cephalalgia", 0.35),
            fuzzy(1, "Head ache", 0.6),
            fuzzy(2, "Heartache", 0.5),
        ];
        let ranked = rank_fuzzy(rows);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].concept_id, 1);
        assert_eq!(ranked[0].term, "Head ache");
        assert_eq!(ranked[1].concept_id, 2);
    }

    #[test]
    fn test_rank_fuzzy_ties_prefer_shorter_term() {
        let rows = vec![fuzzy(1, "Headaches", 0.5), fuzzy(2, "Headache", 0.5)];
        let ranked = rank_fuzzy(rows);
        assert_eq!(ranked[0].concept_id, 2);
    }

    #[test]
    fn test_rank_exact_by_concept_id() {
        let rows = vec![
            exact(30, "Chest pain", MatchRank::Exact),
            exact(10, "Pain in chest", MatchRank::Substring),
            exact(20, "Chest pain on exertion", MatchRank::Prefix),
            exact(10, "Chest pain (left)", MatchRank::Prefix),
        ];
        let ranked = rank_exact_by_concept_id(rows);
        let ids: Vec<SctId> = ranked.iter().map(|r| r.concept_id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
        assert_eq!(ranked[0].term, "Chest pain (left)");
    }

    #[test]
    fn test_rank_fuzzy_by_score_then_id() {
        let rows = vec![
            fuzzy(30, "Headache", 0.5),
            fuzzy(10, "Headaches", 0.5),
            fuzzy(20, "Head", 0.9),
        ];
        let ranked = rank_fuzzy_by_score_then_id(rows);
        let ids: Vec<SctId> = ranked.iter().map(|r| r.concept_id).collect();
        assert_eq!(ids, vec![20, 10, 30]);
    }

    #[test]
    fn test_window() {
        let items: Vec<u32> = (1..=12).collect();
        assert_eq!(window(items.clone(), 5, 5), vec![6, 7, 8, 9, 10]);
        assert_eq!(window(items.clone(), 10, 5), vec![11, 12]);
        assert!(window(items, 20, 5).is_empty());
    }

    #[test]
    fn test_first_seen_merger_preserves_list_order() {
        let mut merger = FirstSeenMerger::new();
        merger.extend(vec![(5, "Headache"), (6, "Migraine")], |item| item.0);
        merger.extend(vec![(7, "Cranial pain"), (5, "Headache again")], |item| {
            item.0
        });

        assert_eq!(merger.len(), 3);
        let merged = merger.finish(10);
        assert_eq!(merged, vec![(5, "Headache"), (6, "Migraine"), (7, "Cranial pain")]);
    }

    #[test]
    fn test_first_seen_merger_truncates_on_finish() {
        let mut merger = FirstSeenMerger::new();
        merger.extend(1..=5u64, |id| *id);
        merger.extend(6..=9u64, |id| *id);
        assert_eq!(merger.len(), 9);
        assert_eq!(merger.finish(4), vec![1, 2, 3, 4]);
    }
}
