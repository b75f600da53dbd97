//! Semantic tag statistics.
//!
//! Counts concepts per semantic tag, limited to the clinically meaningful
//! top-level categories.

use std::sync::Arc;

use tracing::instrument;

use crate::error::SearchResult;
use crate::traits::ConceptGraph;

/// Semantic tags reported by [`StatsAggregator`].
pub const CLINICAL_SEMANTIC_TAGS: [&str; 9] = [
    "finding",
    "disorder",
    "situation",
    "procedure",
    "body structure",
    "substance",
    "organism",
    "observable entity",
    "physical object",
];

/// Number of concepts carrying one semantic tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagCount {
    /// Semantic tag.
    pub tag: String,
    /// Concepts carrying it.
    pub count: u64,
}

/// Semantic tag histogram, largest count first.
///
/// Ties are ordered by tag name so repeated calls on unchanged data agree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TagStats {
    entries: Vec<TagCount>,
}

impl TagStats {
    /// Count for a tag, if it was reported.
    pub fn get(&self, tag: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| entry.count)
    }

    /// Entries in report order.
    pub fn iter(&self) -> impl Iterator<Item = &TagCount> {
        self.entries.iter()
    }

    /// Number of tags reported.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no tag was reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all reported counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|entry| entry.count).sum()
    }
}

impl<'a> IntoIterator for &'a TagStats {
    type Item = &'a TagCount;
    type IntoIter = std::slice::Iter<'a, TagCount>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Computes the semantic tag histogram.
pub struct StatsAggregator {
    graph: Arc<dyn ConceptGraph>,
}

impl StatsAggregator {
    /// Creates an aggregator over a concept graph.
    pub fn new(graph: Arc<dyn ConceptGraph>) -> Self {
        Self { graph }
    }

    /// Concept counts for the nine [`CLINICAL_SEMANTIC_TAGS`].
    ///
    /// Any other tag is left out whatever its count.
    #[instrument(level = "debug", skip(self))]
    pub fn get_semantic_tag_stats(&self) -> SearchResult<TagStats> {
        let rows = self.graph.semantic_tag_histogram(&CLINICAL_SEMANTIC_TAGS)?;

        let mut entries: Vec<TagCount> = Vec::with_capacity(rows.len());
        for (tag, count) in rows {
            if !CLINICAL_SEMANTIC_TAGS.contains(&tag.as_str()) {
                continue;
            }
            match entries.iter_mut().find(|entry| entry.tag == tag) {
                Some(entry) => entry.count += count,
                None => entries.push(TagCount { tag, count }),
            }
        }
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));

        Ok(TagStats { entries })
    }
}
