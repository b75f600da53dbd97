//! Data model for search results and hierarchy browsing.
//!
//! Every type here is a read-only projection of the terminology store.

use crate::SctId;

/// Well-known SNOMED CT identifiers used by search and hierarchy lookups.
pub mod well_known {
    use crate::SctId;

    /// |Is a (attribute)| - the only relationship type the hierarchy follows.
    pub const IS_A: SctId = 116680003;

    /// |Fully specified name (core metadata concept)| description type.
    pub const FSN_TYPE: SctId = 900000000000003001;

    /// |Synonym (core metadata concept)| description type.
    pub const SYNONYM_TYPE: SctId = 900000000000013009;

    /// |Definition (core metadata concept)| description type.
    pub const DEFINITION_TYPE: SctId = 900000000000550004;

    /// Semantic tag searched when the caller does not choose one.
    pub const DEFAULT_SEMANTIC_TAG: &str = "finding";
}

/// A fully resolved concept, as returned by concept detail lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Concept {
    /// Concept identifier.
    pub concept_id: SctId,
    /// Whether the concept is active.
    pub active: bool,
    /// Fully specified name, if the store knows one.
    pub fsn: Option<String>,
    /// Semantic tag, e.g. `finding` or `disorder`.
    pub semantic_tag: Option<String>,
    /// Display term: first synonym, else the FSN.
    pub preferred_term: Option<String>,
    /// Sorted, distinct active synonyms.
    pub synonyms: Vec<String>,
    /// First active text definition, if any.
    pub definition: Option<String>,
    /// Direct is-a parents.
    pub parents: Vec<ConceptSummary>,
    /// Number of active is-a children.
    pub children_count: u64,
}

/// Lightweight summary of a concept for lists and trees.
///
/// Serializes with a derived `hasChildren` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ConceptSummary {
    /// Concept identifier.
    pub concept_id: SctId,
    /// Display term.
    pub preferred_term: String,
    /// Semantic tag, if known.
    pub semantic_tag: Option<String>,
    /// Number of active is-a children.
    pub children_count: u64,
}

impl ConceptSummary {
    /// Returns true if the concept has at least one active child.
    pub fn has_children(&self) -> bool {
        self.children_count > 0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ConceptSummary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("ConceptSummary", 5)?;
        state.serialize_field("conceptId", &self.concept_id)?;
        state.serialize_field("preferredTerm", &self.preferred_term)?;
        state.serialize_field("semanticTag", &self.semantic_tag)?;
        state.serialize_field("childrenCount", &self.children_count)?;
        state.serialize_field("hasChildren", &self.has_children())?;
        state.end()
    }
}

/// A single chief-complaint search hit, as returned by paged search.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ChiefComplaint {
    /// Concept identifier.
    pub concept_id: SctId,
    /// Display term.
    pub preferred_term: String,
    /// Semantic tag, if known.
    pub semantic_tag: Option<String>,
}

/// One page of results plus the exact number of matches across all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PagedResult<T> {
    /// Items on this page, in result order.
    pub items: Vec<T>,
    /// Number of distinct matches across every page.
    pub total_count: u64,
    /// One-based page number.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, total_count: u64, page: u32, page_size: u32) -> Self {
        Self {
            items,
            total_count,
            page,
            page_size,
        }
    }

    /// Creates an empty page with a zero total.
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self::new(Vec::new(), 0, page, page_size)
    }

    /// Returns the number of pages needed to hold `total_count` items.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.page_size))
    }

    /// Returns true if a page exists after this one.
    pub fn has_next_page(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    /// Returns true if this is not the first page.
    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }
}

/// Children or parents of a concept.
///
/// Serializes with a derived `total`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HierarchyResponse {
    /// The queried concept.
    pub concept_id: SctId,
    /// Display term of the queried concept, or its id when it has none.
    pub preferred_term: String,
    /// Related concepts sorted by preferred term.
    pub items: Vec<ConceptSummary>,
}

impl HierarchyResponse {
    /// Number of related concepts returned.
    pub fn total(&self) -> usize {
        self.items.len()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for HierarchyResponse {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("HierarchyResponse", 4)?;
        state.serialize_field("conceptId", &self.concept_id)?;
        state.serialize_field("preferredTerm", &self.preferred_term)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("total", &self.total())?;
        state.end()
    }
}

/// Fully specified name and semantic tag of a concept.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SemanticTagInfo {
    /// Concept identifier.
    pub concept_id: SctId,
    /// Fully specified name, e.g. `Headache (finding)`.
    pub fully_specified_name: String,
    /// Semantic tag, e.g. `finding`.
    pub semantic_tag: String,
}

/// A textual name attached to a concept.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Description {
    /// Description identifier.
    pub description_id: SctId,
    /// Concept the description names.
    pub concept_id: SctId,
    /// Whether the description is active.
    pub active: bool,
    /// Language code, e.g. `en`.
    pub language_code: String,
    /// Description type (FSN, synonym or definition).
    pub type_id: SctId,
    /// The term itself.
    pub term: String,
}

impl Description {
    /// Returns true for synonym-type descriptions.
    pub fn is_synonym(&self) -> bool {
        self.type_id == well_known::SYNONYM_TYPE
    }

    /// Returns true for fully-specified-name descriptions.
    pub fn is_fsn(&self) -> bool {
        self.type_id == well_known::FSN_TYPE
    }

    /// Returns true for text definitions.
    pub fn is_definition(&self) -> bool {
        self.type_id == well_known::DEFINITION_TYPE
    }
}

/// A directed edge between two concepts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Relationship {
    /// Relationship identifier.
    pub relationship_id: SctId,
    /// Source concept (the child for is-a edges).
    pub source_id: SctId,
    /// Destination concept (the parent for is-a edges).
    pub destination_id: SctId,
    /// Relationship type.
    pub type_id: SctId,
    /// Whether the relationship is active.
    pub active: bool,
}

impl Relationship {
    /// Returns true for active is-a edges, the only edges the hierarchy follows.
    pub fn is_active_is_a(&self) -> bool {
        self.active && self.type_id == well_known::IS_A
    }
}

/// Extracts the semantic tag from a fully specified name.
///
/// `"Headache (finding)"` yields `Some("finding")`. Returns `None` when the
/// name does not end in a parenthesised tag.
pub fn semantic_tag_from_fsn(fsn: &str) -> Option<&str> {
    let trimmed = fsn.trim_end();
    let body = trimmed.strip_suffix(')')?;
    let open = body.rfind('(')?;
    let tag = body[open + 1..].trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_summary_has_children() {
        let mut summary = ConceptSummary {
            concept_id: 25064002,
            preferred_term: "Headache".to_string(),
            semantic_tag: Some("finding".to_string()),
            children_count: 0,
        };
        assert!(!summary.has_children());
        summary.children_count = 3;
        assert!(summary.has_children());
    }

    #[test]
    fn test_paged_result_pages() {
        let page: PagedResult<u64> = PagedResult::new(vec![6, 7, 8, 9, 10], 12, 2, 5);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next_page());
        assert!(page.has_previous_page());

        let last: PagedResult<u64> = PagedResult::new(vec![11, 12], 12, 3, 5);
        assert!(!last.has_next_page());
    }

    #[test]
    fn test_paged_result_empty() {
        let page: PagedResult<ChiefComplaint> = PagedResult::empty(1, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next_page());
        assert!(!page.has_previous_page());
    }

    #[test]
    fn test_hierarchy_response_total() {
        let response = HierarchyResponse {
            concept_id: 404684003,
            preferred_term: "Clinical finding".to_string(),
            items: vec![ConceptSummary {
                concept_id: 25064002,
                preferred_term: "Headache".to_string(),
                semantic_tag: None,
                children_count: 0,
            }],
        };
        assert_eq!(response.total(), 1);
    }

    #[test]
    fn test_description_types() {
        let mut description = Description {
            description_id: 1,
            concept_id: 25064002,
            active: true,
            language_code: "en".to_string(),
            type_id: well_known::SYNONYM_TYPE,
            term: "Headache".to_string(),
        };
        assert!(description.is_synonym());
        assert!(!description.is_fsn());

        description.type_id = well_known::FSN_TYPE;
        assert!(description.is_fsn());

        description.type_id = well_known::DEFINITION_TYPE;
        assert!(description.is_definition());
    }

    #[test]
    fn test_relationship_is_active_is_a() {
        let mut rel = Relationship {
            relationship_id: 1,
            source_id: 25064002,
            destination_id: 404684003,
            type_id: well_known::IS_A,
            active: true,
        };
        assert!(rel.is_active_is_a());

        rel.active = false;
        assert!(!rel.is_active_is_a());

        rel.active = true;
        rel.type_id = 363698007;
        assert!(!rel.is_active_is_a());
    }

    #[test]
    fn test_semantic_tag_from_fsn() {
        assert_eq!(semantic_tag_from_fsn("Headache (finding)"), Some("finding"));
        assert_eq!(
            semantic_tag_from_fsn("Structure of head (body structure)"),
            Some("body structure")
        );
        assert_eq!(
            semantic_tag_from_fsn("Pain of (left) arm (finding)"),
            Some("finding")
        );
        assert_eq!(semantic_tag_from_fsn("Headache"), None);
        assert_eq!(semantic_tag_from_fsn("Odd ()"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = ConceptSummary {
            concept_id: 25064002,
            preferred_term: "Headache".to_string(),
            semantic_tag: Some("finding".to_string()),
            children_count: 2,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["conceptId"], 25064002);
        assert_eq!(json["preferredTerm"], "Headache");
        assert_eq!(json["childrenCount"], 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_derived_fields_are_serialized() {
        let response = HierarchyResponse {
            concept_id: 404684003,
            preferred_term: "Clinical finding".to_string(),
            items: vec![
                ConceptSummary {
                    concept_id: 25064002,
                    preferred_term: "Headache".to_string(),
                    semantic_tag: Some("finding".to_string()),
                    children_count: 2,
                },
                ConceptSummary {
                    concept_id: 386661006,
                    preferred_term: "Fever".to_string(),
                    semantic_tag: None,
                    children_count: 0,
                },
            ],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["items"][0]["hasChildren"], true);
        assert_eq!(json["items"][1]["hasChildren"], false);

        let back: HierarchyResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back, response);
    }
}
