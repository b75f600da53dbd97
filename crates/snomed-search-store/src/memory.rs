//! In-memory terminology store.
//!
//! [`MemoryStore`] holds the concept, description and relationship tables
//! in hash maps and implements both [`TermIndex`] and [`ConceptGraph`].
//! It is immutable once built, so a single instance can be shared across
//! threads behind an `Arc`.
//!
//! # Example
//!
//! ```
//! use snomed_search_store::MemoryStore;
//!
//! let mut store = MemoryStore::new();
//! store.insert_concept(404684003, "Clinical finding (finding)", &["Clinical finding"]);
//! store.insert_concept(25064002, "Headache (finding)", &["Headache", "Cephalgia"]);
//! store.insert_is_a(25064002, 404684003);
//!
//! assert_eq!(store.concept_count(), 2);
//! ```

use std::path::Path;

use hashbrown::{HashMap, HashSet};
use snomed_search::{
    semantic_tag_from_fsn, well_known, CancellationToken, ConceptGraph, Description,
    ExactMatchRow, FuzzyMatchRow, FuzzyPredicate, Relationship, SctId, SearchError,
    SearchResult, SemanticTagInfo, TagFilter, TermIndex, TermPredicate, WordMatchPredicate,
};
use tracing::{debug, info, instrument};

use crate::error::StoreResult;
use crate::snapshot::{ConceptRecord, StoreSnapshot};
use crate::trigram::TrigramSet;

/// Descriptions scanned between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// A searchable description with its precomputed trigrams.
#[derive(Debug, Clone)]
struct IndexedTerm {
    description: Description,
    lowered: String,
    trigrams: TrigramSet,
    term_length: usize,
}

/// Concept, description and relationship tables held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Concept id to active flag.
    concepts: HashMap<SctId, bool>,
    /// FSN and synonym descriptions, in insertion order.
    terms: Vec<IndexedTerm>,
    /// Concept id to positions in `terms`.
    terms_by_concept: HashMap<SctId, Vec<usize>>,
    /// Concept id to its text definitions.
    definitions: HashMap<SctId, Vec<Description>>,
    /// Every relationship, active or not.
    relationships: Vec<Relationship>,
    /// Parent id to children over active is-a edges.
    children: HashMap<SctId, Vec<SctId>>,
    /// Child id to parents over active is-a edges.
    parents: HashMap<SctId, Vec<SctId>>,
    /// Semantic tags set explicitly; these win over FSN-derived tags.
    explicit_tags: HashMap<SctId, SemanticTagInfo>,
    /// Next id handed out by the convenience inserters.
    next_generated_id: SctId,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            next_generated_id: 1,
            ..Self::default()
        }
    }

    /// Builds a store from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::new();
        for record in snapshot.concepts {
            store.add_concept(record.concept_id, record.active);
        }
        for description in snapshot.descriptions {
            store.add_description(description);
        }
        for relationship in snapshot.relationships {
            store.add_relationship(relationship);
        }
        for tag in snapshot.semantic_tags {
            store.add_semantic_tag(tag);
        }
        store
    }

    /// Loads a store from a JSON snapshot file.
    pub fn from_snapshot_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let snapshot = StoreSnapshot::read(path)?;
        let store = Self::from_snapshot(snapshot);
        info!(
            path = %path.display(),
            concepts = store.concept_count(),
            descriptions = store.description_count(),
            "loaded terminology snapshot"
        );
        Ok(store)
    }

    /// Dumps the store back into snapshot form.
    pub fn to_snapshot(&self) -> StoreSnapshot {
        let mut concepts: Vec<ConceptRecord> = self
            .concepts
            .iter()
            .map(|(&concept_id, &active)| ConceptRecord { concept_id, active })
            .collect();
        concepts.sort_by_key(|record| record.concept_id);

        let mut descriptions: Vec<Description> =
            self.terms.iter().map(|t| t.description.clone()).collect();
        let mut definition_ids: Vec<&SctId> = self.definitions.keys().collect();
        definition_ids.sort();
        for id in definition_ids {
            descriptions.extend(self.definitions[id].iter().cloned());
        }

        let mut semantic_tags: Vec<SemanticTagInfo> =
            self.explicit_tags.values().cloned().collect();
        semantic_tags.sort_by_key(|tag| tag.concept_id);

        StoreSnapshot {
            concepts,
            descriptions,
            relationships: self.relationships.clone(),
            semantic_tags,
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Adds or replaces a concept.
    pub fn add_concept(&mut self, concept_id: SctId, active: bool) {
        self.concepts.insert(concept_id, active);
    }

    /// Adds a description. Definitions are kept apart from searchable terms.
    pub fn add_description(&mut self, description: Description) {
        self.bump_generated_id(description.description_id);
        if description.is_definition() {
            self.definitions
                .entry(description.concept_id)
                .or_default()
                .push(description);
            return;
        }

        let position = self.terms.len();
        self.terms_by_concept
            .entry(description.concept_id)
            .or_default()
            .push(position);
        self.terms.push(IndexedTerm {
            lowered: description.term.to_lowercase(),
            trigrams: TrigramSet::new(&description.term),
            term_length: description.term.chars().count(),
            description,
        });
    }

    /// Adds a relationship. Only active is-a edges enter the hierarchy.
    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.bump_generated_id(relationship.relationship_id);
        if relationship.is_active_is_a() {
            self.children
                .entry(relationship.destination_id)
                .or_default()
                .push(relationship.source_id);
            self.parents
                .entry(relationship.source_id)
                .or_default()
                .push(relationship.destination_id);
        }
        self.relationships.push(relationship);
    }

    /// Sets a concept's semantic tag explicitly.
    pub fn add_semantic_tag(&mut self, tag: SemanticTagInfo) {
        self.explicit_tags.insert(tag.concept_id, tag);
    }

    /// Adds an active concept with an FSN and synonyms in one call.
    ///
    /// Description ids are generated.
    pub fn insert_concept(&mut self, concept_id: SctId, fsn: &str, synonyms: &[&str]) {
        self.add_concept(concept_id, true);
        self.insert_term(concept_id, well_known::FSN_TYPE, fsn);
        for synonym in synonyms {
            self.insert_term(concept_id, well_known::SYNONYM_TYPE, synonym);
        }
    }

    /// Adds an active description of the given type with a generated id.
    pub fn insert_term(&mut self, concept_id: SctId, type_id: SctId, term: &str) {
        let description_id = self.next_generated_id;
        self.add_description(Description {
            description_id,
            concept_id,
            active: true,
            language_code: "en".to_string(),
            type_id,
            term: term.to_string(),
        });
    }

    /// Adds an active is-a edge with a generated id.
    pub fn insert_is_a(&mut self, child: SctId, parent: SctId) {
        let relationship_id = self.next_generated_id;
        self.add_relationship(Relationship {
            relationship_id,
            source_id: child,
            destination_id: parent,
            type_id: well_known::IS_A,
            active: true,
        });
    }

    fn bump_generated_id(&mut self, used: SctId) {
        self.next_generated_id = self.next_generated_id.max(used.saturating_add(1));
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Number of concepts, active or not.
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// Number of FSN and synonym descriptions, active or not.
    pub fn description_count(&self) -> usize {
        self.terms.len()
    }

    /// Number of relationships, active or not.
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    fn concept_active(&self, concept_id: SctId) -> bool {
        self.concepts.get(&concept_id).copied().unwrap_or(false)
    }

    fn active_terms(&self, concept_id: SctId) -> impl Iterator<Item = &Description> + '_ {
        self.terms_by_concept
            .get(&concept_id)
            .into_iter()
            .flatten()
            .map(move |&position| &self.terms[position].description)
            .filter(|description| description.active)
    }

    fn fsn(&self, concept_id: SctId) -> Option<&str> {
        self.active_terms(concept_id)
            .find(|description| description.is_fsn())
            .map(|description| description.term.as_str())
    }

    fn tag_info(&self, concept_id: SctId) -> Option<SemanticTagInfo> {
        if let Some(tag) = self.explicit_tags.get(&concept_id) {
            return Some(tag.clone());
        }
        let fsn = self.fsn(concept_id)?;
        let tag = semantic_tag_from_fsn(fsn)?;
        Some(SemanticTagInfo {
            concept_id,
            fully_specified_name: fsn.to_string(),
            semantic_tag: tag.to_string(),
        })
    }

    /// Tag of a searchable concept, if it passes the filter.
    fn searchable_tag(
        &self,
        concept_id: SctId,
        tags: &TagFilter,
        cache: &mut HashMap<SctId, Option<String>>,
    ) -> Option<String> {
        cache
            .entry(concept_id)
            .or_insert_with(|| {
                if !self.concept_active(concept_id) {
                    return None;
                }
                self.tag_info(concept_id)
                    .map(|info| info.semantic_tag)
                    .filter(|tag| tags.contains(tag))
            })
            .clone()
    }

    /// Visits every active description of a searchable concept.
    fn scan<F>(&self, tags: &TagFilter, cancel: &CancellationToken, mut visit: F) -> SearchResult<()>
    where
        F: FnMut(&IndexedTerm, &str),
    {
        let mut tag_cache: HashMap<SctId, Option<String>> = HashMap::new();
        for (position, term) in self.terms.iter().enumerate() {
            if position % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
            if !term.description.active {
                continue;
            }
            if let Some(tag) = self.searchable_tag(term.description.concept_id, tags, &mut tag_cache)
            {
                visit(term, &tag);
            }
        }
        Ok(())
    }

    fn word_matches(term: &IndexedTerm, predicate: &WordMatchPredicate) -> bool {
        predicate
            .words()
            .iter()
            .all(|word| term.lowered.contains(word.as_str()))
    }
}

// =============================================================================
// TermIndex
// =============================================================================

impl TermIndex for MemoryStore {
    #[instrument(level = "debug", skip_all, fields(query = predicate.query()))]
    fn exact_word_match(
        &self,
        predicate: &WordMatchPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<ExactMatchRow>> {
        let mut rows = Vec::new();
        self.scan(predicate.tags(), cancel, |term, tag| {
            if Self::word_matches(term, predicate) {
                rows.push(ExactMatchRow {
                    concept_id: term.description.concept_id,
                    term: term.description.term.clone(),
                    semantic_tag: tag.to_string(),
                    match_rank: predicate.rank(&term.description.term),
                    term_length: term.term_length,
                });
            }
        })?;
        debug!(rows = rows.len(), "word match scan finished");
        Ok(rows)
    }

    #[instrument(level = "debug", skip_all, fields(query = predicate.query()))]
    fn fuzzy_match(
        &self,
        predicate: &FuzzyPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<Vec<FuzzyMatchRow>> {
        let query = TrigramSet::new(predicate.query());
        let mut rows = Vec::new();
        self.scan(predicate.tags(), cancel, |term, tag| {
            let score = term.trigrams.similarity(&query);
            if predicate.accepts(score) {
                rows.push(FuzzyMatchRow {
                    concept_id: term.description.concept_id,
                    term: term.description.term.clone(),
                    semantic_tag: tag.to_string(),
                    score,
                    term_length: term.term_length,
                });
            }
        })?;
        debug!(rows = rows.len(), "fuzzy scan finished");
        Ok(rows)
    }

    fn count_distinct_concepts(
        &self,
        predicate: &TermPredicate,
        cancel: &CancellationToken,
    ) -> SearchResult<u64> {
        let mut concepts: HashSet<SctId> = HashSet::new();
        match predicate {
            TermPredicate::Words(words) => {
                self.scan(words.tags(), cancel, |term, _| {
                    if Self::word_matches(term, words) {
                        concepts.insert(term.description.concept_id);
                    }
                })?;
            }
            TermPredicate::Fuzzy(fuzzy) => {
                let query = TrigramSet::new(fuzzy.query());
                self.scan(fuzzy.tags(), cancel, |term, _| {
                    if fuzzy.accepts(term.trigrams.similarity(&query)) {
                        concepts.insert(term.description.concept_id);
                    }
                })?;
            }
        }
        Ok(concepts.len() as u64)
    }
}

// =============================================================================
// ConceptGraph
// =============================================================================

impl ConceptGraph for MemoryStore {
    fn is_active(&self, concept_id: SctId) -> SearchResult<bool> {
        Ok(self.concept_active(concept_id))
    }

    fn children_of(&self, concept_id: SctId) -> SearchResult<Vec<SctId>> {
        Ok(self
            .children
            .get(&concept_id)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&child| self.concept_active(child))
            .collect())
    }

    fn parents_of(&self, concept_id: SctId) -> SearchResult<Vec<SctId>> {
        Ok(self
            .parents
            .get(&concept_id)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&parent| self.concept_active(parent))
            .collect())
    }

    fn preferred_term(&self, concept_id: SctId) -> SearchResult<Option<String>> {
        if !self.concept_active(concept_id) {
            return Ok(None);
        }
        let shortest = self
            .active_terms(concept_id)
            .filter(|description| description.is_synonym())
            .map(|description| description.term.as_str())
            .min_by(|a, b| {
                a.chars()
                    .count()
                    .cmp(&b.chars().count())
                    .then_with(|| a.cmp(b))
            });
        Ok(shortest.or_else(|| self.fsn(concept_id)).map(str::to_string))
    }

    fn synonyms(&self, concept_id: SctId) -> SearchResult<Vec<String>> {
        if !self.concept_active(concept_id) {
            return Ok(Vec::new());
        }
        let mut synonyms: Vec<String> = self
            .active_terms(concept_id)
            .filter(|description| description.is_synonym())
            .map(|description| description.term.clone())
            .collect();
        synonyms.sort();
        synonyms.dedup();
        Ok(synonyms)
    }

    fn definition(&self, concept_id: SctId) -> SearchResult<Option<String>> {
        if !self.concept_active(concept_id) {
            return Ok(None);
        }
        Ok(self
            .definitions
            .get(&concept_id)
            .into_iter()
            .flatten()
            .find(|description| description.active)
            .map(|description| description.term.clone()))
    }

    fn child_count(&self, concept_id: SctId) -> SearchResult<u64> {
        Ok(self
            .children
            .get(&concept_id)
            .map_or(0, |children| children.len() as u64))
    }

    fn semantic_tag_of(&self, concept_id: SctId) -> SearchResult<Option<SemanticTagInfo>> {
        if !self.concept_active(concept_id) {
            return Ok(None);
        }
        Ok(self.tag_info(concept_id))
    }

    fn semantic_tag_histogram(&self, allow_list: &[&str]) -> SearchResult<Vec<(String, u64)>> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for (&concept_id, &active) in &self.concepts {
            if !active {
                continue;
            }
            if let Some(info) = self.tag_info(concept_id) {
                if allow_list.contains(&info.semantic_tag.as_str()) {
                    *counts.entry(info.semantic_tag).or_insert(0) += 1;
                }
            }
        }
        Ok(counts.into_iter().collect())
    }
}
