//! Configuration types for search and hierarchy operations.

use std::time::Duration;

use crate::predicate::TagFilter;

/// Default trigram similarity threshold for the fuzzy tier.
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.3;

/// Per-call options for unpaged search.
///
/// # Example
///
/// ```rust
/// use snomed_search::SearchOptions;
///
/// let options = SearchOptions::builder()
///     .with_limit(10)
///     .with_semantic_tags(["finding", "disorder"])
///     .with_semantic_fallback(false)
///     .build();
///
/// assert_eq!(options.limit, 10);
/// assert!(options.semantic_tags.contains("disorder"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Maximum number of results (default 20).
    pub limit: usize,
    /// Accepted semantic tags (default `finding`).
    pub semantic_tags: TagFilter,
    /// Whether the suggestion tier may run (default true).
    pub allow_semantic_fallback: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 20,
            semantic_tags: TagFilter::default(),
            allow_semantic_fallback: true,
        }
    }
}

impl SearchOptions {
    /// Creates a new builder for SearchOptions.
    pub fn builder() -> SearchOptionsBuilder {
        SearchOptionsBuilder::default()
    }
}

/// Builder for SearchOptions.
#[derive(Debug, Clone, Default)]
pub struct SearchOptionsBuilder {
    options: SearchOptions,
}

impl SearchOptionsBuilder {
    /// Sets the maximum number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.options.limit = limit;
        self
    }

    /// Replaces the accepted semantic tags.
    pub fn with_semantic_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.semantic_tags = TagFilter::new(tags);
        self
    }

    /// Enables or disables the suggestion tier.
    pub fn with_semantic_fallback(mut self, allow: bool) -> Self {
        self.options.allow_semantic_fallback = allow;
        self
    }

    /// Builds the SearchOptions.
    pub fn build(self) -> SearchOptions {
        self.options
    }
}

/// Tuning for the [`SearchFunnel`](crate::SearchFunnel).
#[derive(Debug, Clone, PartialEq)]
pub struct FunnelConfig {
    /// Fuzzy tier threshold.
    pub min_similarity: f32,
    /// Suggestions requested from the suggestion source.
    pub max_suggestions: usize,
    /// Results kept per suggestion before merging.
    pub per_suggestion_limit: usize,
    /// Run suggestion sub-searches in parallel (requires `parallel` feature).
    pub parallel_suggestions: bool,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_MIN_SIMILARITY,
            max_suggestions: 5,
            per_suggestion_limit: 10,
            parallel_suggestions: false,
        }
    }
}

impl FunnelConfig {
    /// Creates a new builder for FunnelConfig.
    pub fn builder() -> FunnelConfigBuilder {
        FunnelConfigBuilder::default()
    }
}

/// Builder for FunnelConfig.
#[derive(Debug, Clone, Default)]
pub struct FunnelConfigBuilder {
    config: FunnelConfig,
}

impl FunnelConfigBuilder {
    /// Sets the fuzzy tier threshold.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.config.min_similarity = min_similarity;
        self
    }

    /// Sets how many suggestions to request.
    pub fn with_max_suggestions(mut self, max_suggestions: usize) -> Self {
        self.config.max_suggestions = max_suggestions;
        self
    }

    /// Sets how many results each suggestion may contribute.
    pub fn with_per_suggestion_limit(mut self, limit: usize) -> Self {
        self.config.per_suggestion_limit = limit;
        self
    }

    /// Enables or disables parallel suggestion sub-searches.
    pub fn with_parallel_suggestions(mut self, parallel: bool) -> Self {
        self.config.parallel_suggestions = parallel;
        self
    }

    /// Builds the FunnelConfig.
    pub fn build(self) -> FunnelConfig {
        self.config
    }
}

/// Tuning for the [`PagedSearchFunnel`](crate::PagedSearchFunnel).
///
/// Out-of-range paging is clamped, never rejected: a page below 1 becomes
/// page 1, a page size of 0 becomes `default_page_size`, and a page size
/// above `max_page_size` becomes `max_page_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct PagingConfig {
    /// Accepted semantic tags (default `finding`).
    pub semantic_tags: TagFilter,
    /// Page size used when the caller passes 0.
    pub default_page_size: u32,
    /// Largest page size honoured.
    pub max_page_size: u32,
    /// Fuzzy tier threshold.
    pub min_similarity: f32,
    /// Deadline for one paged search (None = no deadline).
    pub timeout: Option<Duration>,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            semantic_tags: TagFilter::default(),
            default_page_size: 10,
            max_page_size: 100,
            min_similarity: DEFAULT_MIN_SIMILARITY,
            timeout: None,
        }
    }
}

impl PagingConfig {
    /// Sets the deadline for one paged search.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the accepted semantic tags.
    pub fn with_semantic_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.semantic_tags = TagFilter::new(tags);
        self
    }

    /// Clamps a requested page and page size to the honoured range.
    pub fn clamp(&self, page: i64, page_size: i64) -> (u32, u32) {
        let page = page.clamp(1, i64::from(u32::MAX)) as u32;
        let max = self.max_page_size.max(1);
        let page_size = if page_size < 1 {
            self.default_page_size.clamp(1, max)
        } else {
            page_size.min(i64::from(max)) as u32
        };
        (page, page_size)
    }
}

/// Tuning for the [`HierarchyResolver`](crate::HierarchyResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyConfig {
    /// Children returned when the caller does not pass a limit.
    pub children_limit: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self { children_limit: 50 }
    }
}
