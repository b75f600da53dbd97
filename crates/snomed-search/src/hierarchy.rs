//! Is-a hierarchy browsing and concept detail lookup.
//!
//! The resolver walks one level of the is-a hierarchy at a time: direct
//! children (`GetChildren`) or direct parents (`GetParents`). Every related
//! concept comes back as a [`ConceptSummary`] with its display term, semantic
//! tag and child count filled in.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::HierarchyConfig;
use crate::error::SearchResult;
use crate::traits::ConceptGraph;
use crate::types::{Concept, ConceptSummary, HierarchyResponse};
use crate::SctId;

/// Resolves a concept's display term.
///
/// Uses the graph's preferred term, then `fallback`, then the id itself.
pub(crate) fn display_term(
    graph: &dyn ConceptGraph,
    concept_id: SctId,
    fallback: Option<&str>,
) -> SearchResult<String> {
    Ok(graph
        .preferred_term(concept_id)?
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_else(|| concept_id.to_string()))
}

/// Browses direct is-a neighbours of concepts.
///
/// # Example
///
/// ```ignore
/// use snomed_search::HierarchyResolver;
///
/// let resolver = HierarchyResolver::new(store);
///
/// // Direct children of Clinical finding, first 50 by name
/// let children = resolver.get_children(404684003, None)?;
/// for child in &children.items {
///     println!("{} {}", child.concept_id, child.preferred_term);
/// }
///
/// // Full details, or None if the concept is missing or inactive
/// if let Some(concept) = resolver.get_concept_details(25064002)? {
///     println!("{:?}", concept.synonyms);
/// }
/// ```
pub struct HierarchyResolver {
    graph: Arc<dyn ConceptGraph>,
    config: HierarchyConfig,
}

impl HierarchyResolver {
    /// Creates a resolver with the default children limit.
    pub fn new(graph: Arc<dyn ConceptGraph>) -> Self {
        Self {
            graph,
            config: HierarchyConfig::default(),
        }
    }

    /// Replaces the resolver configuration.
    pub fn with_config(mut self, config: HierarchyConfig) -> Self {
        self.config = config;
        self
    }

    /// Direct children of a concept, sorted by display term.
    ///
    /// Returns at most `limit` children, or the configured default (50) when
    /// `limit` is `None`.
    #[instrument(level = "debug", skip(self))]
    pub fn get_children(
        &self,
        concept_id: SctId,
        limit: Option<usize>,
    ) -> SearchResult<HierarchyResponse> {
        let limit = limit.unwrap_or(self.config.children_limit);
        let child_ids = self.graph.children_of(concept_id)?;
        let mut response = self.respond(concept_id, child_ids)?;
        response.items.truncate(limit);
        debug!(children = response.total(), "resolved children");
        Ok(response)
    }

    /// Direct parents of a concept, sorted by display term.
    #[instrument(level = "debug", skip(self))]
    pub fn get_parents(&self, concept_id: SctId) -> SearchResult<HierarchyResponse> {
        let parent_ids = self.graph.parents_of(concept_id)?;
        let response = self.respond(concept_id, parent_ids)?;
        debug!(parents = response.total(), "resolved parents");
        Ok(response)
    }

    /// Sorted, distinct active synonyms of a concept.
    pub fn get_synonyms(&self, concept_id: SctId) -> SearchResult<Vec<String>> {
        let mut synonyms = self.graph.synonyms(concept_id)?;
        synonyms.sort();
        synonyms.dedup();
        Ok(synonyms)
    }

    /// Full details of an active concept.
    ///
    /// Returns `None` when the concept is missing or inactive.
    #[instrument(level = "debug", skip(self))]
    pub fn get_concept_details(&self, concept_id: SctId) -> SearchResult<Option<Concept>> {
        if !self.graph.is_active(concept_id)? {
            debug!("concept missing or inactive");
            return Ok(None);
        }

        let tag_info = self.graph.semantic_tag_of(concept_id)?;
        let (fsn, semantic_tag) = match tag_info {
            Some(info) => (Some(info.fully_specified_name), Some(info.semantic_tag)),
            None => (None, None),
        };

        let synonyms = self.get_synonyms(concept_id)?;
        let preferred_term = synonyms.first().cloned().or_else(|| fsn.clone());

        Ok(Some(Concept {
            concept_id,
            active: true,
            fsn,
            semantic_tag,
            preferred_term,
            synonyms,
            definition: self.graph.definition(concept_id)?,
            parents: self.get_parents(concept_id)?.items,
            children_count: self.graph.child_count(concept_id)?,
        }))
    }

    /// Summarizes related concepts and sorts them by display term.
    fn respond(
        &self,
        concept_id: SctId,
        mut related: Vec<SctId>,
    ) -> SearchResult<HierarchyResponse> {
        related.sort_unstable();
        related.dedup();

        let mut items = related
            .into_iter()
            .map(|id| self.summarize(id))
            .collect::<SearchResult<Vec<_>>>()?;
        items.sort_by(|a, b| {
            a.preferred_term
                .cmp(&b.preferred_term)
                .then(a.concept_id.cmp(&b.concept_id))
        });

        Ok(HierarchyResponse {
            concept_id,
            preferred_term: display_term(self.graph.as_ref(), concept_id, None)?,
            items,
        })
    }

    fn summarize(&self, concept_id: SctId) -> SearchResult<ConceptSummary> {
        Ok(ConceptSummary {
            concept_id,
            preferred_term: display_term(self.graph.as_ref(), concept_id, None)?,
            semantic_tag: self
                .graph
                .semantic_tag_of(concept_id)?
                .map(|info| info.semantic_tag),
            children_count: self.graph.child_count(concept_id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SemanticTagInfo;
    use std::collections::{HashMap, HashSet};

    /// Mock graph for testing hierarchy resolution.
    struct MockGraph {
        active: HashSet<SctId>,
        terms: HashMap<SctId, &'static str>,
        children: HashMap<SctId, Vec<SctId>>,
        parents: HashMap<SctId, Vec<SctId>>,
        synonyms: HashMap<SctId, Vec<&'static str>>,
    }

    impl MockGraph {
        fn new() -> Self {
            Self {
                active: HashSet::new(),
                terms: HashMap::new(),
                children: HashMap::new(),
                parents: HashMap::new(),
                synonyms: HashMap::new(),
            }
        }

        fn add_concept(&mut self, id: SctId, term: &'static str) {
            self.active.insert(id);
            self.terms.insert(id, term);
        }

        fn add_is_a(&mut self, child: SctId, parent: SctId) {
            self.children.entry(parent).or_default().push(child);
            self.parents.entry(child).or_default().push(parent);
        }
    }

    impl ConceptGraph for MockGraph {
        fn is_active(&self, id: SctId) -> SearchResult<bool> {
            Ok(self.active.contains(&id))
        }

        fn children_of(&self, id: SctId) -> SearchResult<Vec<SctId>> {
            Ok(self.children.get(&id).cloned().unwrap_or_default())
        }

        fn parents_of(&self, id: SctId) -> SearchResult<Vec<SctId>> {
            Ok(self.parents.get(&id).cloned().unwrap_or_default())
        }

        fn preferred_term(&self, id: SctId) -> SearchResult<Option<String>> {
            Ok(self.terms.get(&id).map(|t| t.to_string()))
        }

        fn synonyms(&self, id: SctId) -> SearchResult<Vec<String>> {
            Ok(self
                .synonyms
                .get(&id)
                .map(|s| s.iter().map(|t| t.to_string()).collect())
                .unwrap_or_default())
        }

        fn definition(&self, _id: SctId) -> SearchResult<Option<String>> {
            Ok(None)
        }

        fn child_count(&self, id: SctId) -> SearchResult<u64> {
            Ok(self.children.get(&id).map_or(0, |c| c.len() as u64))
        }

        fn semantic_tag_of(&self, id: SctId) -> SearchResult<Option<SemanticTagInfo>> {
            Ok(self.terms.get(&id).map(|term| SemanticTagInfo {
                concept_id: id,
                fully_specified_name: format!("{term} (finding)"),
                semantic_tag: "finding".to_string(),
            }))
        }

        fn semantic_tag_histogram(&self, _allow: &[&str]) -> SearchResult<Vec<(String, u64)>> {
            Ok(Vec::new())
        }
    }

    /// Creates a test hierarchy:
    /// ```text
    ///          100 Clinical finding
    ///         /        |         \
    ///   300 Pain   200 Fever   400 Cough
    ///      |
    ///   500 Headache
    /// ```
    fn create_test_graph() -> MockGraph {
        let mut graph = MockGraph::new();
        graph.add_concept(100, "Clinical finding");
        graph.add_concept(200, "Fever");
        graph.add_concept(300, "Pain");
        graph.add_concept(400, "Cough");
        graph.add_concept(500, "Headache");
        graph.add_is_a(200, 100);
        graph.add_is_a(300, 100);
        graph.add_is_a(400, 100);
        graph.add_is_a(500, 300);
        graph
    }

    fn resolver() -> HierarchyResolver {
        HierarchyResolver::new(Arc::new(create_test_graph()))
    }

    #[test]
    fn test_children_sorted_by_term() {
        let response = resolver().get_children(100, None).unwrap();
        assert_eq!(response.preferred_term, "Clinical finding");
        let terms: Vec<&str> = response
            .items
            .iter()
            .map(|s| s.preferred_term.as_str())
            .collect();
        assert_eq!(terms, vec!["Cough", "Fever", "Pain"]);
        assert_eq!(response.total(), 3);
    }

    #[test]
    fn test_children_enriched_with_child_count() {
        let response = resolver().get_children(100, None).unwrap();
        let pain = response.items.iter().find(|s| s.concept_id == 300).unwrap();
        assert_eq!(pain.children_count, 1);
        assert!(pain.has_children());
        assert_eq!(pain.semantic_tag.as_deref(), Some("finding"));
    }

    #[test]
    fn test_children_limit() {
        let response = resolver().get_children(100, Some(2)).unwrap();
        assert_eq!(response.total(), 2);
        assert_eq!(response.items[0].preferred_term, "Cough");
        assert_eq!(response.items[1].preferred_term, "Fever");
    }

    #[test]
    fn test_children_default_limit_from_config() {
        let resolver = resolver().with_config(HierarchyConfig { children_limit: 1 });
        let response = resolver.get_children(100, None).unwrap();
        assert_eq!(response.total(), 1);
    }

    #[test]
    fn test_parents() {
        let response = resolver().get_parents(500).unwrap();
        assert_eq!(response.preferred_term, "Headache");
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].concept_id, 300);
    }

    #[test]
    fn test_unknown_concept_uses_id_as_term() {
        let response = resolver().get_children(999, None).unwrap();
        assert_eq!(response.preferred_term, "999");
        assert!(response.items.is_empty());
    }

    #[test]
    fn test_children_parents_round_trip() {
        let resolver = resolver();
        for parent in [100, 300] {
            for child in resolver.get_children(parent, None).unwrap().items {
                let parents = resolver.get_parents(child.concept_id).unwrap();
                assert!(parents.items.iter().any(|p| p.concept_id == parent));
            }
        }
    }

    #[test]
    fn test_concept_details() {
        let mut graph = create_test_graph();
        graph
            .synonyms
            .insert(500, vec!["Headache", "Cephalgia", "Headache"]);
        let resolver = HierarchyResolver::new(Arc::new(graph));

        let concept = resolver.get_concept_details(500).unwrap().unwrap();
        assert_eq!(concept.concept_id, 500);
        assert!(concept.active);
        assert_eq!(concept.fsn.as_deref(), Some("Headache (finding)"));
        assert_eq!(concept.semantic_tag.as_deref(), Some("finding"));
        assert_eq!(concept.synonyms, vec!["Cephalgia", "Headache"]);
        assert_eq!(concept.preferred_term.as_deref(), Some("Cephalgia"));
        assert_eq!(concept.parents.len(), 1);
        assert_eq!(concept.parents[0].preferred_term, "Pain");
        assert_eq!(concept.children_count, 0);
    }

    #[test]
    fn test_concept_details_falls_back_to_fsn() {
        let concept = resolver().get_concept_details(200).unwrap().unwrap();
        assert!(concept.synonyms.is_empty());
        assert_eq!(concept.preferred_term.as_deref(), Some("Fever (finding)"));
    }

    #[test]
    fn test_concept_details_not_found() {
        assert!(resolver().get_concept_details(999).unwrap().is_none());
    }
}
