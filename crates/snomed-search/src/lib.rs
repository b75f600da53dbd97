//! # snomed-search
//!
//! Chief-complaint search and hierarchy browsing over SNOMED CT.
//!
//! This crate turns a patient's free-text complaint into SNOMED CT concepts
//! and lets callers browse the is-a hierarchy around them. It holds the
//! decision logic only; storage sits behind the [`TermIndex`] and
//! [`ConceptGraph`] traits and clinical rewording behind
//! [`SuggestionSource`].
//!
//! ## Key Features
//!
//! - **Tiered search** - word match, then trigram fuzzy match, then
//!   suggested clinical terms, stopping at the first tier with results
//! - **Paged search** - stable ordering and exact totals for UI paging
//! - **Hierarchy** - direct children and parents with display terms and
//!   child counts, plus full concept details
//! - **Statistics** - concept counts for the clinical semantic tags
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use snomed_search::{SearchFunnel, SearchOptions};
//! use snomed_search_store::{MemoryStore, StaticSuggestionSource};
//!
//! let store = Arc::new(MemoryStore::from_snapshot_file("snapshot.json")?);
//! let funnel = SearchFunnel::new(store.clone(), store.clone())
//!     .with_suggestions(Arc::new(StaticSuggestionSource::default()));
//!
//! for hit in funnel.search("head pain", &SearchOptions::default())? {
//!     println!("{} {}", hit.concept_id, hit.preferred_term);
//! }
//! ```
//!
//! ## Search Tiers
//!
//! | Tier | Runs when | Ranking |
//! |------|-----------|---------|
//! | Word match | always | exact, prefix, substring; shorter terms first |
//! | Fuzzy | word match is empty | similarity score (>= 0.3) |
//! | Semantic | both above are empty | suggestion order, first seen wins |
//!
//! ## Feature Flags
//!
//! - `parallel` - runs suggestion sub-searches on the rayon pool
//! - `serde` - derives `Serialize`/`Deserialize` on the data model
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       snomed-search                          │
//! │                                                              │
//! │  SearchFunnel ──────┐                                        │
//! │  PagedSearchFunnel ─┼── TermIndex    (word / fuzzy match)    │
//! │                     └── ConceptGraph (terms, is-a edges)     │
//! │  HierarchyResolver ──── ConceptGraph                         │
//! │  StatsAggregator ────── ConceptGraph                         │
//! │  SearchFunnel ───────── SuggestionSource (optional)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod config;
mod error;
mod funnel;
mod hierarchy;
mod paged;
mod predicate;
mod ranking;
mod statistics;
mod traits;
mod types;

// Public re-exports
pub use config::{
    FunnelConfig, FunnelConfigBuilder, HierarchyConfig, PagingConfig, SearchOptions,
    SearchOptionsBuilder, DEFAULT_MIN_SIMILARITY,
};
pub use error::{SearchError, SearchResult};
pub use funnel::{SearchFunnel, SearchOutcome, SearchTier};
pub use hierarchy::HierarchyResolver;
pub use paged::PagedSearchFunnel;
pub use predicate::{
    FuzzyPredicate, MatchRank, SqlClause, TagFilter, TermPredicate, WordMatchPredicate,
};
pub use ranking::{
    rank_exact, rank_exact_by_concept_id, rank_fuzzy, rank_fuzzy_by_score_then_id, window,
    FirstSeenMerger,
};
pub use statistics::{StatsAggregator, TagCount, TagStats, CLINICAL_SEMANTIC_TAGS};
pub use traits::{ConceptGraph, ExactMatchRow, FuzzyMatchRow, SuggestionSource, TermIndex};
pub use types::{
    semantic_tag_from_fsn, well_known, ChiefComplaint, Concept, ConceptSummary, Description,
    HierarchyResponse, PagedResult, Relationship, SemanticTagInfo,
};

// Re-export the cancellation token the paged funnel and stores accept
pub use tokio_util::sync::CancellationToken;

/// SNOMED CT Identifier type (64-bit unsigned integer).
pub type SctId = u64;
