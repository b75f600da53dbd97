//! Tiered chief-complaint search.
//!
//! The funnel tries progressively looser strategies and stops at the first
//! one that finds anything:
//!
//! 1. **Word match** - every query word appears in the term. Ranked exact,
//!    then prefix, then substring, then by term length.
//! 2. **Fuzzy** - trigram similarity against the raw query. Ranked by score.
//! 3. **Semantic** - the suggestion source rewords the query into clinical
//!    terms and each suggestion is word-matched in turn. Results keep
//!    suggestion order.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::{FunnelConfig, SearchOptions};
use crate::error::SearchResult;
use crate::hierarchy::display_term;
use crate::predicate::{FuzzyPredicate, TagFilter, WordMatchPredicate};
use crate::ranking::{rank_exact, rank_fuzzy, FirstSeenMerger};
use crate::traits::{ConceptGraph, ExactMatchRow, SuggestionSource, TermIndex};
use crate::types::ConceptSummary;
use crate::SctId;

/// The strategy that produced a set of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SearchTier {
    /// All query words found in a term.
    WordMatch,
    /// Trigram similarity.
    Fuzzy,
    /// Word match on suggested clinical terms.
    Semantic,
}

/// Results of one search plus the tier that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Ranked, de-duplicated results.
    pub items: Vec<ConceptSummary>,
    /// Producing tier, `None` when nothing matched.
    pub tier: Option<SearchTier>,
}

impl SearchOutcome {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            tier: None,
        }
    }
}

/// Three-tier search over the terminology.
///
/// Holds no per-call state and can be shared across threads.
///
/// # Example
///
/// ```ignore
/// use snomed_search::{SearchFunnel, SearchOptions};
///
/// let funnel = SearchFunnel::new(store.clone(), store.clone())
///     .with_suggestions(suggestions);
///
/// for hit in funnel.search("head pain", &SearchOptions::default())? {
///     println!("{} {}", hit.concept_id, hit.preferred_term);
/// }
/// ```
pub struct SearchFunnel {
    index: Arc<dyn TermIndex>,
    graph: Arc<dyn ConceptGraph>,
    suggestions: Option<Arc<dyn SuggestionSource>>,
    config: FunnelConfig,
}

impl SearchFunnel {
    /// Creates a funnel without a suggestion source; tier 3 never runs.
    pub fn new(index: Arc<dyn TermIndex>, graph: Arc<dyn ConceptGraph>) -> Self {
        Self {
            index,
            graph,
            suggestions: None,
            config: FunnelConfig::default(),
        }
    }

    /// Attaches a suggestion source, enabling tier 3.
    pub fn with_suggestions(mut self, source: Arc<dyn SuggestionSource>) -> Self {
        self.suggestions = Some(source);
        self
    }

    /// Replaces the funnel configuration.
    pub fn with_config(mut self, config: FunnelConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the funnel configuration.
    pub fn config(&self) -> &FunnelConfig {
        &self.config
    }

    /// Returns true if a suggestion source is attached.
    pub fn has_suggestions(&self) -> bool {
        self.suggestions.is_some()
    }

    /// Searches for concepts matching free text.
    ///
    /// Blank queries return an empty list. Returns at most `options.limit`
    /// results, never with a repeated concept.
    pub fn search(&self, query: &str, options: &SearchOptions) -> SearchResult<Vec<ConceptSummary>> {
        self.search_with_tier(query, options).map(|outcome| outcome.items)
    }

    /// Like [`search`](Self::search), also reporting which tier matched.
    #[instrument(level = "debug", skip(self, options), fields(limit = options.limit))]
    pub fn search_with_tier(&self, query: &str, options: &SearchOptions) -> SearchResult<SearchOutcome> {
        let cancel = CancellationToken::new();
        let tags = &options.semantic_tags;
        let limit = options.limit;

        let Some(predicate) = WordMatchPredicate::from_query(query, tags.clone()) else {
            return Ok(SearchOutcome::empty());
        };
        if limit == 0 {
            return Ok(SearchOutcome::empty());
        }

        let rows = self.word_match(&predicate, limit, &cancel)?;
        if !rows.is_empty() {
            debug!(hits = rows.len(), "word match tier");
            return self.finish(rows_to_hits(rows), SearchTier::WordMatch);
        }

        let hits = self.fuzzy_match(query, tags, limit, &cancel)?;
        if !hits.is_empty() {
            debug!(hits = hits.len(), "fuzzy tier");
            return self.finish(hits, SearchTier::Fuzzy);
        }

        if !options.allow_semantic_fallback {
            debug!("no matches, semantic fallback disabled");
            return Ok(SearchOutcome::empty());
        }

        let hits = self.semantic_match(predicate.query(), tags, limit, &cancel)?;
        if hits.is_empty() {
            debug!("no matches in any tier");
            return Ok(SearchOutcome::empty());
        }
        debug!(hits = hits.len(), "semantic tier");
        self.finish(hits, SearchTier::Semantic)
    }

    // =========================================================================
    // Tiers
    // =========================================================================

    fn word_match(
        &self,
        predicate: &WordMatchPredicate,
        limit: usize,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<ExactMatchRow>> {
        let rows = self.index.exact_word_match(predicate, cancel)?;
        let mut ranked = rank_exact(rows);
        ranked.truncate(limit);
        Ok(ranked)
    }

    fn fuzzy_match(
        &self,
        query: &str,
        tags: &TagFilter,
        limit: usize,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<Hit>> {
        let Some(predicate) =
            FuzzyPredicate::from_query(query, tags.clone(), self.config.min_similarity)
        else {
            return Ok(Vec::new());
        };
        let rows = self.index.fuzzy_match(&predicate, cancel)?;
        let hits = rank_fuzzy(rows)
            .into_iter()
            .filter(|row| predicate.accepts(row.score))
            .take(limit)
            .map(|row| Hit {
                concept_id: row.concept_id,
                term: row.term,
                semantic_tag: row.semantic_tag,
            })
            .collect();
        Ok(hits)
    }

    fn semantic_match(
        &self,
        query: &str,
        tags: &TagFilter,
        limit: usize,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<Hit>> {
        let Some(source) = &self.suggestions else {
            debug!("no suggestion source attached");
            return Ok(Vec::new());
        };

        let mut suggestions = match source.suggest(query, self.config.max_suggestions) {
            Ok(suggestions) => suggestions,
            Err(err) => {
                warn!(error = %err, "suggestion source failed, skipping semantic tier");
                return Ok(Vec::new());
            }
        };
        suggestions.truncate(self.config.max_suggestions);
        debug!(?suggestions, "semantic suggestions");

        let per_suggestion = self.match_suggestions(&suggestions, tags, cancel)?;

        // Every suggestion is merged before truncating.
        let mut merger = FirstSeenMerger::new();
        for rows in per_suggestion {
            merger.extend(rows_to_hits(rows), |hit| hit.concept_id);
        }
        Ok(merger.finish(limit))
    }

    /// Word-matches each suggestion, returning results in suggestion order.
    fn match_suggestions(
        &self,
        suggestions: &[String],
        tags: &TagFilter,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<Vec<ExactMatchRow>>> {
        let cap = self.config.per_suggestion_limit;
        let run = |suggestion: &String| -> SearchResult<Vec<ExactMatchRow>> {
            match WordMatchPredicate::from_query(suggestion, tags.clone()) {
                Some(predicate) => self.word_match(&predicate, cap, cancel),
                None => Ok(Vec::new()),
            }
        };

        #[cfg(feature = "parallel")]
        {
            if self.config.parallel_suggestions {
                use rayon::prelude::*;
                // Indexed collect keeps suggestion order.
                return suggestions.par_iter().map(run).collect();
            }
        }

        suggestions.iter().map(run).collect()
    }

    // =========================================================================
    // Enrichment
    // =========================================================================

    fn finish(&self, hits: Vec<Hit>, tier: SearchTier) -> SearchResult<SearchOutcome> {
        let items = hits
            .into_iter()
            .map(|hit| self.summarize(hit))
            .collect::<SearchResult<Vec<_>>>()?;
        Ok(SearchOutcome {
            items,
            tier: Some(tier),
        })
    }

    fn summarize(&self, hit: Hit) -> SearchResult<ConceptSummary> {
        let preferred_term = display_term(self.graph.as_ref(), hit.concept_id, Some(&hit.term))?;
        let children_count = self.graph.child_count(hit.concept_id)?;
        Ok(ConceptSummary {
            concept_id: hit.concept_id,
            preferred_term,
            semantic_tag: Some(hit.semantic_tag),
            children_count,
        })
    }
}

/// A matched concept before enrichment.
#[derive(Debug, Clone)]
struct Hit {
    concept_id: SctId,
    term: String,
    semantic_tag: String,
}

fn rows_to_hits(rows: Vec<ExactMatchRow>) -> Vec<Hit> {
    rows.into_iter()
        .map(|row| Hit {
            concept_id: row.concept_id,
            term: row.term,
            semantic_tag: row.semantic_tag,
        })
        .collect()
}
