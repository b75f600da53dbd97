//! JSON snapshot format for [`MemoryStore`](crate::MemoryStore).
//!
//! A snapshot is a plain dump of the four terminology tables:
//!
//! ```json
//! {
//!   "concepts": [{ "conceptId": 25064002, "active": true }],
//!   "descriptions": [{
//!     "descriptionId": 41990019, "conceptId": 25064002, "active": true,
//!     "languageCode": "en", "typeId": 900000000000013009, "term": "Headache"
//!   }],
//!   "relationships": [{
//!     "relationshipId": 1, "sourceId": 25064002, "destinationId": 404684003,
//!     "typeId": 116680003, "active": true
//!   }],
//!   "semanticTags": []
//! }
//! ```
//!
//! `semanticTags` may be omitted; tags are then taken from the fully
//! specified names. Text definitions travel in `descriptions` with the
//! definition type id.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use snomed_search::{Description, Relationship, SctId, SemanticTagInfo};

use crate::error::{StoreError, StoreResult};

/// One row of the concept table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptRecord {
    /// Concept identifier.
    pub concept_id: SctId,
    /// Whether the concept is active.
    pub active: bool,
}

/// Serialized contents of a terminology store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Concept table.
    #[serde(default)]
    pub concepts: Vec<ConceptRecord>,
    /// Description table, including text definitions.
    #[serde(default)]
    pub descriptions: Vec<Description>,
    /// Relationship table.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Explicit semantic tags. Overrides tags parsed from FSNs.
    #[serde(default)]
    pub semantic_tags: Vec<SemanticTagInfo>,
}

impl StoreSnapshot {
    /// Parses a snapshot from JSON text.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a snapshot file.
    pub fn read(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Writes the snapshot as pretty-printed JSON.
    pub fn write(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Total number of rows across all tables.
    pub fn row_count(&self) -> usize {
        self.concepts.len()
            + self.descriptions.len()
            + self.relationships.len()
            + self.semantic_tags.len()
    }
}
