//! Collaborator traits the search core runs against.
//!
//! The core never touches storage directly. It asks a [`TermIndex`] for
//! matching descriptions, a [`ConceptGraph`] for concept metadata and is-a
//! edges, and an optional [`SuggestionSource`] for clinical rewordings of a
//! patient's words.
//!
//! # Architecture Note
//!
//! Exactly one store adapter is expected per deployment. Implement both
//! store traits on the same type and hand it to the funnels and resolvers
//! at composition time:
//!
//! ```ignore
//! use std::sync::Arc;
//! use snomed_search::{HierarchyResolver, SearchFunnel};
//!
//! let store = Arc::new(MyStore::open()?);
//! let funnel = SearchFunnel::new(store.clone(), store.clone());
//! let resolver = HierarchyResolver::new(store);
//! ```
//!
//! Every store call receives a [`CancellationToken`]. Implementations should
//! check it before and during long scans and return
//! [`SearchError::Cancelled`](crate::SearchError::Cancelled) once it fires.

use tokio_util::sync::CancellationToken;

use crate::error::SearchResult;
use crate::predicate::{FuzzyPredicate, MatchRank, TermPredicate, WordMatchPredicate};
use crate::types::SemanticTagInfo;
use crate::SctId;

// =============================================================================
// Match rows
// =============================================================================

/// A description that satisfied a [`WordMatchPredicate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactMatchRow {
    /// Concept the description belongs to.
    pub concept_id: SctId,
    /// The matching term.
    pub term: String,
    /// The concept's semantic tag.
    pub semantic_tag: String,
    /// Agreement between term and whole query.
    pub match_rank: MatchRank,
    /// Term length in characters.
    pub term_length: usize,
}

/// A description that satisfied a [`FuzzyPredicate`].
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatchRow {
    /// Concept the description belongs to.
    pub concept_id: SctId,
    /// The matching term.
    pub term: String,
    /// The concept's semantic tag.
    pub semantic_tag: String,
    /// Trigram similarity between term and query, `0.0..=1.0`.
    pub score: f32,
    /// Term length in characters.
    pub term_length: usize,
}

// =============================================================================
// Store traits
// =============================================================================

/// Description-level term matching.
///
/// Only active descriptions of active concepts whose semantic tag passes the
/// predicate's tag filter may be returned. Rows are per description; a
/// concept with several matching descriptions yields several rows.
pub trait TermIndex: Send + Sync {
    /// Returns every description containing all predicate words.
    fn exact_word_match(
        &self,
        predicate: &WordMatchPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<ExactMatchRow>>;

    /// Returns every description at least as similar to the query as the
    /// predicate's threshold.
    fn fuzzy_match(
        &self,
        predicate: &FuzzyPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<FuzzyMatchRow>>;

    /// Counts distinct concepts with at least one description satisfying
    /// the predicate.
    fn count_distinct_concepts(
        &self,
        predicate: &TermPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<u64>;
}

/// Concept metadata and is-a traversal.
///
/// Only active concepts, descriptions and relationships are visible.
/// Unknown or inactive concepts behave like concepts with no data.
pub trait ConceptGraph: Send + Sync {
    /// Returns true if the concept exists and is active.
    fn is_active(&self, concept_id: SctId) -> SearchResult<bool>;

    /// Active concepts that are the source of an active is-a edge pointing
    /// at `concept_id`.
    fn children_of(&self, concept_id: SctId) -> SearchResult<Vec<SctId>>;

    /// Active concepts that are the destination of an active is-a edge
    /// leaving `concept_id`.
    fn parents_of(&self, concept_id: SctId) -> SearchResult<Vec<SctId>>;

    /// Display term: the shortest active synonym (ties broken
    /// alphabetically), else the fully specified name.
    fn preferred_term(&self, concept_id: SctId) -> SearchResult<Option<String>>;

    /// Sorted, distinct active synonym terms.
    fn synonyms(&self, concept_id: SctId) -> SearchResult<Vec<String>>;

    /// First active text definition.
    fn definition(&self, concept_id: SctId) -> SearchResult<Option<String>>;

    /// Number of active is-a edges whose destination is `concept_id`.
    fn child_count(&self, concept_id: SctId) -> SearchResult<u64>;

    /// Fully specified name and semantic tag.
    fn semantic_tag_of(&self, concept_id: SctId) -> SearchResult<Option<SemanticTagInfo>>;

    /// Number of concepts per semantic tag, for tags in `allow_list` only.
    ///
    /// Tags with no concepts may be omitted.
    fn semantic_tag_histogram(&self, allow_list: &[&str]) -> SearchResult<Vec<(String, u64)>>;
}

/// Maps a patient's wording to clinical terms.
pub trait SuggestionSource: Send + Sync {
    /// Returns at most `max_suggestions` terms, best first.
    ///
    /// A source with no better idea may echo the query back as the only
    /// suggestion. An `Err` means the source is unavailable.
    fn suggest(&self, query: &str, max_suggestions: usize) -> SearchResult<Vec<String>>;
}

impl<T: TermIndex + ?Sized> TermIndex for std::sync::Arc<T> {
    fn exact_word_match(
        &self,
        predicate: &WordMatchPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<ExactMatchRow>> {
        (**self).exact_word_match(predicate, cancel)
    }

    fn fuzzy_match(
        &self,
        predicate: &FuzzyPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<FuzzyMatchRow>> {
        (**self).fuzzy_match(predicate, cancel)
    }

    fn count_distinct_concepts(
        &self,
        predicate: &TermPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<u64> {
        (**self).count_distinct_concepts(predicate, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use std::sync::Arc;

    /// Suggestion source that always fails.
    struct OfflineSource;

    impl SuggestionSource for OfflineSource {
        fn suggest(&self, _query: &str, _max: usize) -> SearchResult<Vec<String>> {
            Err(SearchError::SuggestionUnavailable("offline".to_string()))
        }
    }

    /// Term index returning one canned row.
    struct OneRowIndex;

    impl TermIndex for OneRowIndex {
        fn exact_word_match(
            &self,
            predicate: &WordMatchPredicate,
            _cancel: &CancellationToken,
        ) -> SearchResult<Vec<ExactMatchRow>> {
            let term = "Headache".to_string();
            Ok(vec![ExactMatchRow {
                concept_id: 25064002,
                match_rank: predicate.rank(&term),
                term_length: term.chars().count(),
                term,
                semantic_tag: "finding".to_string(),
            }])
        }

        fn fuzzy_match(
            &self,
            _predicate: &FuzzyPredicate,
            _cancel: &CancellationToken,
        ) -> SearchResult<Vec<FuzzyMatchRow>> {
            Ok(Vec::new())
        }

        fn count_distinct_concepts(
            &self,
            _predicate: &TermPredicate,
            _cancel: &CancellationToken,
        ) -> SearchResult<u64> {
            Ok(1)
        }
    }

    #[test]
    fn test_suggestion_source_error_is_reported() {
        let err = OfflineSource.suggest("head pain", 5).unwrap_err();
        assert!(matches!(err, SearchError::SuggestionUnavailable(_)));
    }

    #[test]
    fn test_arc_delegates_term_index() {
        let index: Arc<dyn TermIndex> = Arc::new(OneRowIndex);
        let predicate =
            WordMatchPredicate::from_query("headache", crate::TagFilter::default()).unwrap();
        let rows = index
            .exact_word_match(&predicate, &CancellationToken::new())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].match_rank, MatchRank::Exact);
        assert_eq!(rows[0].term_length, 8);
    }
}
