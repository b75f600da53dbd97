//! Wiring between command-line settings and the search services.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use snomed_search::{
    CancellationToken, ChiefComplaint, Concept, FunnelConfig, HierarchyConfig, HierarchyResolver,
    HierarchyResponse, PagedResult, PagedSearchFunnel, PagingConfig, SctId, SearchFunnel,
    SearchOptions, SearchOutcome, SearchResult, StatsAggregator, TagStats,
};
use snomed_search_store::{MemoryStore, StaticSuggestionSource, StoreError, StorePool};

/// Search tuning shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Maximum results per search
    #[arg(long, env = "SNOMED_SEARCH_LIMIT", default_value_t = 20, global = true)]
    pub limit: usize,

    /// Semantic tags to search, comma separated
    #[arg(
        long = "tags",
        env = "SNOMED_SEARCH_TAGS",
        value_delimiter = ',',
        default_value = "finding",
        global = true
    )]
    pub semantic_tags: Vec<String>,

    /// Disable the suggested-term fallback
    #[arg(long, global = true)]
    pub no_semantic: bool,

    /// Fuzzy match threshold
    #[arg(long, env = "SNOMED_SEARCH_MIN_SIMILARITY", default_value_t = 0.3, global = true)]
    pub min_similarity: f32,

    /// Suggestions requested for the fallback tier
    #[arg(long, default_value_t = 5, global = true)]
    pub max_suggestions: usize,

    /// Results kept per suggestion in the fallback tier
    #[arg(long, default_value_t = 10, global = true)]
    pub per_suggestion_limit: usize,

    /// Run suggestion sub-searches in parallel
    #[arg(long, global = true)]
    pub parallel: bool,

    /// Deadline for paged searches, in milliseconds
    #[arg(long, env = "SNOMED_SEARCH_TIMEOUT_MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Children listed when no limit is given
    #[arg(long, default_value_t = 50, global = true)]
    pub children_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limit: 20,
            semantic_tags: vec!["finding".to_string()],
            no_semantic: false,
            min_similarity: 0.3,
            max_suggestions: 5,
            per_suggestion_limit: 10,
            parallel: false,
            timeout_ms: None,
            children_limit: 50,
        }
    }
}

impl Settings {
    /// Per-call search options.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions::builder()
            .with_limit(self.limit)
            .with_semantic_tags(self.semantic_tags.iter().cloned())
            .with_semantic_fallback(!self.no_semantic)
            .build()
    }

    /// Funnel configuration.
    pub fn funnel_config(&self) -> FunnelConfig {
        FunnelConfig::builder()
            .with_min_similarity(self.min_similarity)
            .with_max_suggestions(self.max_suggestions)
            .with_per_suggestion_limit(self.per_suggestion_limit)
            .with_parallel_suggestions(self.parallel)
            .build()
    }

    /// Paging configuration.
    pub fn paging_config(&self) -> PagingConfig {
        let mut config = PagingConfig {
            min_similarity: self.min_similarity,
            ..PagingConfig::default()
        }
        .with_semantic_tags(self.semantic_tags.iter().cloned());
        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        config
    }
}

/// Opens the snapshot named on the command line, lazily.
pub fn snapshot_pool(snapshot: Option<PathBuf>) -> Arc<StorePool<MemoryStore>> {
    Arc::new(StorePool::new(move || match &snapshot {
        Some(path) => MemoryStore::from_snapshot_file(path),
        None => Err(StoreError::Unavailable(
            "no snapshot configured; pass --snapshot or set SNOMED_SNAPSHOT".to_string(),
        )),
    }))
}

/// Every service the front end talks to.
pub struct App {
    funnel: SearchFunnel,
    paged: PagedSearchFunnel,
    resolver: HierarchyResolver,
    stats: StatsAggregator,
    options: SearchOptions,
}

impl App {
    /// Builds the services over a store pool.
    pub fn new(pool: Arc<StorePool<MemoryStore>>, settings: &Settings) -> Self {
        let funnel = SearchFunnel::new(pool.clone(), pool.clone())
            .with_suggestions(Arc::new(StaticSuggestionSource::default()))
            .with_config(settings.funnel_config());
        let paged = PagedSearchFunnel::new(pool.clone(), pool.clone())
            .with_config(settings.paging_config());
        let resolver = HierarchyResolver::new(pool.clone()).with_config(HierarchyConfig {
            children_limit: settings.children_limit,
        });
        let stats = StatsAggregator::new(pool);

        Self {
            funnel,
            paged,
            resolver,
            stats,
            options: settings.search_options(),
        }
    }

    /// Builds the services over an already loaded store.
    #[cfg(test)]
    pub fn with_store(store: MemoryStore, settings: &Settings) -> Self {
        Self::new(Arc::new(StorePool::from_store(store)), settings)
    }

    /// Tiered search.
    pub fn search(&self, query: &str) -> SearchResult<SearchOutcome> {
        self.funnel.search_with_tier(query, &self.options)
    }

    /// One page of paged search.
    pub fn page(
        &self,
        term: &str,
        page: i64,
        size: i64,
    ) -> SearchResult<PagedResult<ChiefComplaint>> {
        self.paged
            .search_paged(term, page, size, &CancellationToken::new())
    }

    /// Direct children.
    pub fn children(&self, concept_id: SctId, limit: Option<usize>) -> SearchResult<HierarchyResponse> {
        self.resolver.get_children(concept_id, limit)
    }

    /// Direct parents.
    pub fn parents(&self, concept_id: SctId) -> SearchResult<HierarchyResponse> {
        self.resolver.get_parents(concept_id)
    }

    /// Concept details, `None` if missing or inactive.
    pub fn details(&self, concept_id: SctId) -> SearchResult<Option<Concept>> {
        self.resolver.get_concept_details(concept_id)
    }

    /// Active synonyms.
    pub fn synonyms(&self, concept_id: SctId) -> SearchResult<Vec<String>> {
        self.resolver.get_synonyms(concept_id)
    }

    /// Semantic tag histogram.
    pub fn stats(&self) -> SearchResult<TagStats> {
        self.stats.get_semantic_tag_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snomed_search::{SearchError, SearchTier};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_concept(404684003, "Clinical finding (finding)", &["Clinical finding"]);
        store.insert_concept(25064002, "Headache (finding)", &["Headache"]);
        store.insert_is_a(25064002, 404684003);
        store
    }

    #[test]
    fn test_settings_defaults_match_library_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.search_options(), SearchOptions::default());
        assert_eq!(settings.funnel_config(), FunnelConfig::default());
        assert_eq!(settings.paging_config(), PagingConfig::default());
    }

    #[test]
    fn test_timeout_setting() {
        let settings = Settings {
            timeout_ms: Some(250),
            ..Settings::default()
        };
        assert_eq!(
            settings.paging_config().timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_funnel_settings_reach_config() {
        let settings = Settings {
            max_suggestions: 3,
            per_suggestion_limit: 2,
            ..Settings::default()
        };
        let config = settings.funnel_config();
        assert_eq!(config.max_suggestions, 3);
        assert_eq!(config.per_suggestion_limit, 2);
    }

    #[test]
    fn test_app_search_and_browse() {
        let app = App::with_store(store(), &Settings::default());

        let outcome = app.search("head pain").unwrap();
        assert_eq!(outcome.tier, Some(SearchTier::Semantic));
        assert_eq!(outcome.items[0].concept_id, 25064002);

        let children = app.children(404684003, None).unwrap();
        assert_eq!(children.items[0].preferred_term, "Headache");
        assert_eq!(app.parents(25064002).unwrap().total(), 1);
        assert_eq!(app.synonyms(25064002).unwrap(), vec!["Headache"]);
        assert_eq!(app.stats().unwrap().get("finding"), Some(2));
    }

    #[test]
    fn test_missing_snapshot_is_a_store_error() {
        let app = App::new(snapshot_pool(None), &Settings::default());
        let err = app.details(25064002).unwrap_err();
        assert!(matches!(err, SearchError::Store(message) if message.contains("SNOMED_SNAPSHOT")));
    }
}
