//! Paged chief-complaint search with exact totals.
//!
//! Two tiers only: word match, then fuzzy. Pages are ordered for stable
//! pagination rather than by match quality:
//!
//! | Tier | Order |
//! |------|-------|
//! | Word match | concept id ascending |
//! | Fuzzy | score descending, then concept id ascending |
//!
//! The fuzzy tier runs when the word-match *total* is zero, so asking for a
//! page past the end of a non-empty word-match result yields an empty page
//! with the word-match total rather than fuzzy results. There is no
//! suggestion tier here.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::PagingConfig;
use crate::error::{SearchError, SearchResult};
use crate::hierarchy::display_term;
use crate::predicate::{FuzzyPredicate, TermPredicate, WordMatchPredicate};
use crate::ranking::{rank_exact_by_concept_id, rank_fuzzy_by_score_then_id, window};
use crate::traits::{ConceptGraph, TermIndex};
use crate::types::{ChiefComplaint, PagedResult};
use crate::SctId;

/// Two-tier paged search.
///
/// # Example
///
/// ```ignore
/// use snomed_search::PagedSearchFunnel;
/// use tokio_util::sync::CancellationToken;
///
/// let funnel = PagedSearchFunnel::new(store.clone(), store);
/// let page = funnel.search_paged("headache", 2, 5, &CancellationToken::new())?;
/// println!("{} of {}", page.items.len(), page.total_count);
/// ```
pub struct PagedSearchFunnel {
    index: Arc<dyn TermIndex>,
    graph: Arc<dyn ConceptGraph>,
    config: PagingConfig,
}

impl PagedSearchFunnel {
    /// Creates a paged funnel with default paging configuration.
    pub fn new(index: Arc<dyn TermIndex>, graph: Arc<dyn ConceptGraph>) -> Self {
        Self {
            index,
            graph,
            config: PagingConfig::default(),
        }
    }

    /// Replaces the paging configuration.
    pub fn with_config(mut self, config: PagingConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the paging configuration.
    pub fn config(&self) -> &PagingConfig {
        &self.config
    }

    /// Returns one page of matches for `search_term`.
    ///
    /// `page` is one-based. Out-of-range `page` and `page_size` values are
    /// clamped (see [`PagingConfig`]). Blank search terms return an empty
    /// page.
    ///
    /// # Errors
    ///
    /// * [`SearchError::Cancelled`] once `cancel` fires
    /// * [`SearchError::Timeout`] when the configured deadline passes
    /// * [`SearchError::Store`] when the store fails
    #[instrument(level = "debug", skip(self, cancel))]
    pub fn search_paged(
        &self,
        search_term: &str,
        page: i64,
        page_size: i64,
        cancel: &CancellationToken,
    ) -> SearchResult<PagedResult<ChiefComplaint>> {
        let (page, page_size) = self.config.clamp(page, page_size);
        let guard = Deadline::new(cancel, &self.config);

        let Some(predicate) =
            WordMatchPredicate::from_query(search_term, self.config.semantic_tags.clone())
        else {
            return Ok(PagedResult::empty(page, page_size));
        };

        let offset = (page as usize - 1).saturating_mul(page_size as usize);
        let size = page_size as usize;

        let words = TermPredicate::Words(predicate.clone());
        let total = guard.run(|token| self.index.count_distinct_concepts(&words, token))?;
        if total > 0 {
            let rows = guard.run(|token| self.index.exact_word_match(&predicate, token))?;
            let hits = window(rank_exact_by_concept_id(rows), offset, size)
                .into_iter()
                .map(|row| (row.concept_id, row.term, row.semantic_tag));
            let items = self.complaints(hits, &guard)?;
            debug!(total, returned = items.len(), "word match page");
            return Ok(PagedResult::new(items, total, page, page_size));
        }

        let Some(fuzzy) = FuzzyPredicate::from_query(
            search_term,
            self.config.semantic_tags.clone(),
            self.config.min_similarity,
        ) else {
            return Ok(PagedResult::empty(page, page_size));
        };

        let similar = TermPredicate::Fuzzy(fuzzy.clone());
        let total = guard.run(|token| self.index.count_distinct_concepts(&similar, token))?;
        if total == 0 {
            debug!("no word or fuzzy matches");
            return Ok(PagedResult::empty(page, page_size));
        }

        let rows = guard.run(|token| self.index.fuzzy_match(&fuzzy, token))?;
        let ranked: Vec<_> = rank_fuzzy_by_score_then_id(rows)
            .into_iter()
            .filter(|row| fuzzy.accepts(row.score))
            .collect();
        let hits = window(ranked, offset, size)
            .into_iter()
            .map(|row| (row.concept_id, row.term, row.semantic_tag));
        let items = self.complaints(hits, &guard)?;
        debug!(total, returned = items.len(), "fuzzy page");
        Ok(PagedResult::new(items, total, page, page_size))
    }

    fn complaints<I>(&self, hits: I, guard: &Deadline<'_>) -> SearchResult<Vec<ChiefComplaint>>
    where
        I: Iterator<Item = (SctId, String, String)>,
    {
        hits.map(|(concept_id, term, semantic_tag)| {
            guard.check()?;
            Ok(ChiefComplaint {
                concept_id,
                preferred_term: display_term(self.graph.as_ref(), concept_id, Some(&term))?,
                semantic_tag: Some(semantic_tag),
            })
        })
        .collect()
    }
}

/// Caller's cancellation token plus optional deadline.
///
/// Store calls receive a child token that a watchdog thread cancels when
/// the deadline passes. The watchdog exits once the guard is dropped.
struct Deadline<'a> {
    cancel: &'a CancellationToken,
    token: CancellationToken,
    started: Instant,
    timeout: Option<Duration>,
    _watchdog: Option<Sender<()>>,
}

impl<'a> Deadline<'a> {
    fn new(cancel: &'a CancellationToken, config: &PagingConfig) -> Self {
        let token = cancel.child_token();
        let started = Instant::now();
        let watchdog = config.timeout.map(|timeout| {
            let (done, finished) = mpsc::channel::<()>();
            let expired = token.clone();
            thread::spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = finished.recv_timeout(timeout) {
                    expired.cancel();
                }
            });
            done
        });
        Self {
            cancel,
            token,
            started,
            timeout: config.timeout,
            _watchdog: watchdog,
        }
    }

    fn check(&self) -> SearchResult<()> {
        if self.cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        match self.timeout {
            Some(timeout) if self.token.is_cancelled() || self.started.elapsed() >= timeout => {
                Err(SearchError::Timeout(timeout))
            }
            _ => Ok(()),
        }
    }

    /// Runs one store call under the deadline token.
    fn run<T>(
        &self,
        call: impl FnOnce(&CancellationToken) -> SearchResult<T>,
    ) -> SearchResult<T> {
        self.check()?;
        match call(&self.token) {
            Err(SearchError::Cancelled) => {
                self.check()?;
                Err(SearchError::Cancelled)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ExactMatchRow, FuzzyMatchRow};
    use crate::types::SemanticTagInfo;
    use std::collections::HashSet;

    /// Index over `(id, term, fuzzy score)` triples.
    struct MockIndex {
        terms: Vec<(SctId, String, f32)>,
    }

    impl MockIndex {
        fn numbered(count: u64, term: &str) -> Self {
            Self {
                terms: (1..=count)
                    .map(|i| (i * 10, format!("{term} {i}"), 0.0))
                    .collect(),
            }
        }
    }

    impl TermIndex for MockIndex {
        fn exact_word_match(
            &self,
            predicate: &WordMatchPredicate,
            cancel: &CancellationToken,
        ) -> SearchResult<Vec<ExactMatchRow>> {
            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
            Ok(self
                .terms
                .iter()
                .filter(|(_, term, _)| predicate.matches(term))
                .map(|(id, term, _)| ExactMatchRow {
                    concept_id: *id,
                    term: term.clone(),
                    semantic_tag: "finding".to_string(),
                    match_rank: predicate.rank(term),
                    term_length: term.chars().count(),
                })
                .collect())
        }

        fn fuzzy_match(
            &self,
            predicate: &FuzzyPredicate,
            _cancel: &CancellationToken,
        ) -> SearchResult<Vec<FuzzyMatchRow>> {
            Ok(self
                .terms
                .iter()
                .filter(|(_, _, score)| predicate.accepts(*score))
                .map(|(id, term, score)| FuzzyMatchRow {
                    concept_id: *id,
                    term: term.clone(),
                    semantic_tag: "finding".to_string(),
                    score: *score,
                    term_length: term.chars().count(),
                })
                .collect())
        }

        fn count_distinct_concepts(
            &self,
            predicate: &TermPredicate,
            cancel: &CancellationToken,
        ) -> SearchResult<u64> {
            let ids: HashSet<SctId> = match predicate {
                TermPredicate::Words(p) => self
                    .exact_word_match(p, cancel)?
                    .into_iter()
                    .map(|r| r.concept_id)
                    .collect(),
                TermPredicate::Fuzzy(p) => self
                    .fuzzy_match(p, cancel)?
                    .into_iter()
                    .map(|r| r.concept_id)
                    .collect(),
            };
            Ok(ids.len() as u64)
        }
    }

    struct NoGraph;

    impl ConceptGraph for NoGraph {
        fn is_active(&self, _id: SctId) -> SearchResult<bool> {
            Ok(true)
        }
        fn children_of(&self, _id: SctId) -> SearchResult<Vec<SctId>> {
            Ok(Vec::new())
        }
        fn parents_of(&self, _id: SctId) -> SearchResult<Vec<SctId>> {
            Ok(Vec::new())
        }
        fn preferred_term(&self, _id: SctId) -> SearchResult<Option<String>> {
            Ok(None)
        }
        fn synonyms(&self, _id: SctId) -> SearchResult<Vec<String>> {
            Ok(Vec::new())
        }
        fn definition(&self, _id: SctId) -> SearchResult<Option<String>> {
            Ok(None)
        }
        fn child_count(&self, _id: SctId) -> SearchResult<u64> {
            Ok(0)
        }
        fn semantic_tag_of(&self, _id: SctId) -> SearchResult<Option<SemanticTagInfo>> {
            Ok(None)
        }
        fn semantic_tag_histogram(&self, _allow: &[&str]) -> SearchResult<Vec<(String, u64)>> {
            Ok(Vec::new())
        }
    }

    fn funnel(index: MockIndex) -> PagedSearchFunnel {
        PagedSearchFunnel::new(Arc::new(index), Arc::new(NoGraph))
    }

    fn ids(page: &PagedResult<ChiefComplaint>) -> Vec<SctId> {
        page.items.iter().map(|c| c.concept_id).collect()
    }

    #[test]
    fn test_second_page_of_twelve() {
        let funnel = funnel(MockIndex::numbered(12, "Headache"));
        let page = funnel
            .search_paged("headache", 2, 5, &CancellationToken::new())
            .unwrap();

        assert_eq!(page.total_count, 12);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 5);
        assert_eq!(ids(&page), vec![60, 70, 80, 90, 100]);
    }

    #[test]
    fn test_pages_cover_every_match_once() {
        let funnel = funnel(MockIndex::numbered(12, "Headache"));
        let cancel = CancellationToken::new();
        let first = funnel.search_paged("headache", 1, 5, &cancel).unwrap();

        let mut seen = Vec::new();
        for page in 1..=first.total_pages() as i64 {
            seen.extend(ids(&funnel.search_paged("headache", page, 5, &cancel).unwrap()));
        }
        let distinct: HashSet<SctId> = seen.iter().copied().collect();
        assert_eq!(seen.len(), 12);
        assert_eq!(distinct.len(), 12);
    }

    #[test]
    fn test_page_past_end_keeps_word_total() {
        let funnel = funnel(MockIndex::numbered(3, "Headache"));
        let page = funnel
            .search_paged("headache", 9, 5, &CancellationToken::new())
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn test_fuzzy_fallback_orders_by_score_then_id() {
        let funnel = funnel(MockIndex {
            terms: vec![
                (30, "Headache".to_string(), 0.5),
                (10, "Headaches".to_string(), 0.5),
                (20, "Head ache".to_string(), 0.8),
                (40, "Backache".to_string(), 0.1),
            ],
        });
        let page = funnel
            .search_paged("hedake", 1, 10, &CancellationToken::new())
            .unwrap();

        assert_eq!(page.total_count, 3);
        assert_eq!(ids(&page), vec![20, 10, 30]);
    }

    #[test]
    fn test_blank_term_returns_empty_page() {
        let funnel = funnel(MockIndex::numbered(3, "Headache"));
        let page = funnel
            .search_paged("   ", 1, 10, &CancellationToken::new())
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_non_positive_paging_is_clamped() {
        let funnel = funnel(MockIndex::numbered(12, "Headache"));
        let page = funnel
            .search_paged("headache", 0, 0, &CancellationToken::new())
            .unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.items.len(), 10);
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let funnel = funnel(MockIndex::numbered(3, "Headache"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = funnel.search_paged("headache", 1, 5, &cancel).unwrap_err();
        assert_eq!(err, SearchError::Cancelled);
    }

    #[test]
    fn test_deadline_reports_timeout() {
        let cancel = CancellationToken::new();
        let config = PagingConfig::default().with_timeout(Duration::from_millis(1));
        let guard = Deadline::new(&cancel, &config);
        assert!(guard.check().is_ok());

        std::thread::sleep(Duration::from_millis(5));
        let err = guard.check().unwrap_err();
        assert_eq!(err, SearchError::Timeout(Duration::from_millis(1)));
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_deadline_without_timeout() {
        let cancel = CancellationToken::new();
        let guard = Deadline::new(&cancel, &PagingConfig::default());
        assert!(guard.check().is_ok());
        cancel.cancel();
        assert_eq!(guard.check().unwrap_err(), SearchError::Cancelled);
    }

    /// Index whose count scans slowly, checking the token at every step.
    struct SlowIndex {
        steps: u32,
    }

    impl TermIndex for SlowIndex {
        fn exact_word_match(
            &self,
            _predicate: &WordMatchPredicate,
            _cancel: &CancellationToken,
        ) -> SearchResult<Vec<ExactMatchRow>> {
            Ok(Vec::new())
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
            cancel: &CancellationToken,
        ) -> SearchResult<u64> {
            for _ in 0..self.steps {
                if cancel.is_cancelled() {
                    return Err(SearchError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(1)
        }
    }

    #[test]
    fn test_timeout_stops_running_store_call() {
        let index = SlowIndex { steps: 2_000 };
        let config = PagingConfig::default().with_timeout(Duration::from_millis(10));
        let funnel = PagedSearchFunnel::new(Arc::new(index), Arc::new(NoGraph)).with_config(config);

        let started = Instant::now();
        let err = funnel
            .search_paged("headache", 1, 5, &CancellationToken::new())
            .unwrap_err();

        assert_eq!(err, SearchError::Timeout(Duration::from_millis(10)));
        assert!(started.elapsed() < Duration::from_millis(1_000));
    }

    #[test]
    fn test_fast_search_beats_deadline() {
        let funnel = funnel(MockIndex::numbered(3, "Headache"))
            .with_config(PagingConfig::default().with_timeout(Duration::from_secs(5)));
        let page = funnel
            .search_paged("headache", 1, 5, &CancellationToken::new())
            .unwrap();
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn test_caller_cancel_reaches_store_call() {
        let index = SlowIndex { steps: 2_000 };
        let cancel = CancellationToken::new();
        let guard = Deadline::new(&cancel, &PagingConfig::default());
        let err = guard
            .run(|token| {
                cancel.cancel();
                index.count_distinct_concepts(&words("headache"), token)
            })
            .unwrap_err();
        assert_eq!(err, SearchError::Cancelled);
    }

    fn words(query: &str) -> TermPredicate {
        TermPredicate::Words(WordMatchPredicate::from_query(query, Default::default()).unwrap())
    }

    #[test]
    fn test_preferred_term_falls_back_to_matched_term() {
        let funnel = funnel(MockIndex::numbered(1, "Headache"));
        let page = funnel
            .search_paged("headache", 1, 5, &CancellationToken::new())
            .unwrap();
        assert_eq!(page.items[0].preferred_term, "Headache 1");
        assert_eq!(page.items[0].semantic_tag.as_deref(), Some("finding"));
    }
}
