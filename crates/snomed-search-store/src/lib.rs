//! # snomed-search-store
//!
//! In-memory SNOMED CT terminology store for
//! [`snomed-search`](snomed_search).
//!
//! [`MemoryStore`] implements both [`TermIndex`](snomed_search::TermIndex)
//! and [`ConceptGraph`](snomed_search::ConceptGraph) over the concept,
//! description and relationship tables. Fuzzy matching uses the same
//! trigram similarity as PostgreSQL's `pg_trgm`, so thresholds carry over
//! from a database-backed deployment unchanged.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use snomed_search::{SearchFunnel, SearchOptions};
//! use snomed_search_store::{MemoryStore, StaticSuggestionSource};
//!
//! let mut store = MemoryStore::new();
//! store.insert_concept(25064002, "Headache (finding)", &["Headache"]);
//! let store = Arc::new(store);
//!
//! let funnel = SearchFunnel::new(store.clone(), store)
//!     .with_suggestions(Arc::new(StaticSuggestionSource::default()));
//!
//! let hits = funnel.search("head pain", &SearchOptions::default()).unwrap();
//! assert_eq!(hits[0].preferred_term, "Headache");
//! ```
//!
//! ## Modules
//!
//! - [`memory`] - the store itself
//! - [`snapshot`] - JSON snapshot format
//! - [`trigram`] - `pg_trgm` compatible similarity
//! - [`pool`] - lazily opened shared handle
//! - [`suggest`] - fixed-table suggestion source

#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod pool;
pub mod snapshot;
pub mod suggest;
pub mod trigram;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use pool::StorePool;
pub use snapshot::{ConceptRecord, StoreSnapshot};
pub use suggest::StaticSuggestionSource;
pub use trigram::{similarity, TrigramSet};
