//! Lazily opened, shared store handle.
//!
//! [`StorePool`] defers opening the store until the first request, opens it
//! at most once even when many threads race for it, and then hands out
//! cheap `Arc` clones. A failed open leaves the pool closed so a later call
//! can try again.
//!
//! The pool implements [`TermIndex`] and [`ConceptGraph`] itself, so it can
//! be handed to the funnels directly:
//!
//! ```
//! use std::sync::Arc;
//! use snomed_search::SearchFunnel;
//! use snomed_search_store::{MemoryStore, StorePool};
//!
//! let pool = Arc::new(StorePool::new(|| Ok(MemoryStore::new())));
//! let _funnel = SearchFunnel::new(pool.clone(), pool.clone());
//! assert!(!pool.is_open());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use snomed_search::{
    CancellationToken, ConceptGraph, ExactMatchRow, FuzzyMatchRow, FuzzyPredicate, SctId,
    SearchResult, SemanticTagInfo, TermIndex, TermPredicate, WordMatchPredicate,
};
use tracing::{info, warn};

use crate::error::StoreResult;

type Opener<S> = Box<dyn Fn() -> StoreResult<S> + Send + Sync>;

/// Opens a store on first use and shares it afterwards.
pub struct StorePool<S> {
    opener: Opener<S>,
    slot: RwLock<Option<Arc<S>>>,
    opens: AtomicUsize,
}

impl<S: Send + Sync + 'static> StorePool<S> {
    /// Creates a closed pool that will call `opener` on first use.
    pub fn new<F>(opener: F) -> Self
    where
        F: Fn() -> StoreResult<S> + Send + Sync + 'static,
    {
        Self {
            opener: Box::new(opener),
            slot: RwLock::new(None),
            opens: AtomicUsize::new(0),
        }
    }

    /// Creates a pool around an already open store.
    pub fn from_store(store: S) -> Self {
        let pool = Self::new(|| {
            Err(crate::StoreError::Unavailable(
                "pool was created from an open store".to_string(),
            ))
        });
        *pool.slot.write() = Some(Arc::new(store));
        pool
    }

    /// Returns the shared store, opening it if needed.
    pub fn get(&self) -> StoreResult<Arc<S>> {
        if let Some(store) = self.slot.read().as_ref() {
            return Ok(Arc::clone(store));
        }

        let mut slot = self.slot.write();
        // Another thread may have opened it while we waited.
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }

        match (self.opener)() {
            Ok(store) => {
                let store = Arc::new(store);
                let opens = self.opens.fetch_add(1, Ordering::Relaxed) + 1;
                info!(opens, "terminology store opened");
                *slot = Some(Arc::clone(&store));
                Ok(store)
            }
            Err(err) => {
                warn!(error = %err, "failed to open terminology store");
                Err(err)
            }
        }
    }

    /// Returns true once the store has been opened.
    pub fn is_open(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Number of successful opens. Stays at one however many callers race.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }
}

impl<S: TermIndex + 'static> TermIndex for StorePool<S> {
    fn exact_word_match(
        &self,
        predicate: &WordMatchPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<ExactMatchRow>> {
        self.get()?.exact_word_match(predicate, cancel)
    }

    fn fuzzy_match(
        &self,
        predicate: &FuzzyPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<FuzzyMatchRow>> {
        self.get()?.fuzzy_match(predicate, cancel)
    }

    fn count_distinct_concepts(
        &self,
        predicate: &TermPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<u64> {
        self.get()?.count_distinct_concepts(predicate, cancel)
    }
}

impl<S: ConceptGraph + 'static> ConceptGraph for StorePool<S> {
    fn is_active(&self, concept_id: SctId) -> SearchResult<bool> {
        self.get()?.is_active(concept_id)
    }

    fn children_of(&self, concept_id: SctId) -> SearchResult<Vec<SctId>> {
        self.get()?.children_of(concept_id)
    }

    fn parents_of(&self, concept_id: SctId) -> SearchResult<Vec<SctId>> {
        self.get()?.parents_of(concept_id)
    }

    fn preferred_term(&self, concept_id: SctId) -> SearchResult<Option<String>> {
        self.get()?.preferred_term(concept_id)
    }

    fn synonyms(&self, concept_id: SctId) -> SearchResult<Vec<String>> {
        self.get()?.synonyms(concept_id)
    }

    fn definition(&self, concept_id: SctId) -> SearchResult<Option<String>> {
        self.get()?.definition(concept_id)
    }

    fn child_count(&self, concept_id: SctId) -> SearchResult<u64> {
        self.get()?.child_count(concept_id)
    }

    fn semantic_tag_of(&self, concept_id: SctId) -> SearchResult<Option<SemanticTagInfo>> {
        self.get()?.semantic_tag_of(concept_id)
    }

    fn semantic_tag_histogram(&self, allow_list: &[&str]) -> SearchResult<Vec<(String, u64)>> {
        self.get()?.semantic_tag_histogram(allow_list)
    }
}
