//! Fixed-table suggestion source.
//!
//! Maps a handful of lay phrasings to clinical terms. Anything not in the
//! table is echoed back unchanged, so the semantic tier still gets one
//! sub-search for it.

use hashbrown::HashMap;
use snomed_search::{SearchResult, SuggestionSource};
use tracing::debug;

/// [`SuggestionSource`] backed by a case-insensitive lookup table.
#[derive(Debug, Clone)]
pub struct StaticSuggestionSource {
    mappings: HashMap<String, Vec<String>>,
}

impl StaticSuggestionSource {
    /// Creates a source with no mappings; every query is echoed.
    pub fn empty() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    /// Adds or replaces the suggestions for a phrase.
    pub fn with_mapping<I, S>(mut self, phrase: &str, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mappings.insert(
            normalize(phrase),
            suggestions.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Number of phrases with explicit suggestions.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl Default for StaticSuggestionSource {
    /// The built-in lay-term table.
    fn default() -> Self {
        Self::empty()
            .with_mapping(
                "stomach ache",
                ["Abdominal pain", "Epigastric pain", "Stomach ache"],
            )
            .with_mapping(
                "can't speak",
                ["Aphasia", "Dysarthria", "Difficulty speaking"],
            )
            .with_mapping("head pain", ["Headache", "Cranial pain"])
            .with_mapping("hedake", ["Headache"])
    }
}

impl SuggestionSource for StaticSuggestionSource {
    fn suggest(&self, query: &str, max_suggestions: usize) -> SearchResult<Vec<String>> {
        let key = normalize(query);
        let mut suggestions = match self.mappings.get(&key) {
            Some(terms) => terms.clone(),
            None => vec![query.trim().to_string()],
        };
        suggestions.truncate(max_suggestions);
        debug!(query = %key, count = suggestions.len(), "static suggestions");
        Ok(suggestions)
    }
}

fn normalize(phrase: &str) -> String {
    phrase.trim().to_lowercase()
}
