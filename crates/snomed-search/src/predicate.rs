//! Term predicates pushed down to the [`TermIndex`](crate::TermIndex).
//!
//! A predicate is built once per query and handed to the store, which
//! evaluates it against every active description. The same predicate also
//! renders as a parameterized SQL clause for SQL-backed stores, so user text
//! never ends up inside the statement itself.
//!
//! ```rust
//! use snomed_search::{MatchRank, TagFilter, WordMatchPredicate};
//!
//! let predicate = WordMatchPredicate::from_query("chest pain", TagFilter::default()).unwrap();
//! assert!(predicate.matches("Pain in chest"));
//! assert_eq!(predicate.rank("Chest pain"), MatchRank::Exact);
//!
//! let clause = predicate.to_sql("d.term", 1);
//! assert_eq!(clause.sql, "(d.term ILIKE $1 AND d.term ILIKE $2)");
//! assert_eq!(clause.params, vec!["%chest%", "%pain%"]);
//! ```

use std::fmt;

use crate::types::well_known;

// =============================================================================
// Semantic tag filter
// =============================================================================

/// Ordered, duplicate-free set of semantic tags a result must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    tags: Vec<String>,
}

impl TagFilter {
    /// Creates a filter from any list of tags. Duplicates are dropped, first
    /// occurrence wins.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self { tags: Vec::new() };
        for tag in tags {
            let tag = tag.into();
            if !filter.tags.contains(&tag) {
                filter.tags.push(tag);
            }
        }
        filter
    }

    /// Returns true if the tag is accepted by this filter.
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns the accepted tags in insertion order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns true if no tag is accepted.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl Default for TagFilter {
    /// Accepts only `finding`.
    fn default() -> Self {
        Self::new([well_known::DEFAULT_SEMANTIC_TAG])
    }
}

// =============================================================================
// Match rank
// =============================================================================

/// How closely a matching term agrees with the whole query.
///
/// Ordered best first, so `Exact < Prefix < Substring`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchRank {
    /// The term equals the query, ignoring case.
    Exact = 0,
    /// The term starts with the query, ignoring case.
    Prefix = 1,
    /// The term merely contains every query word.
    Substring = 2,
}

impl MatchRank {
    /// Numeric rank, `0` for exact through `2` for substring.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// =============================================================================
// Predicates
// =============================================================================

/// All-words-present predicate.
///
/// A term satisfies it when it contains every whitespace-separated query
/// word as a case-insensitive substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordMatchPredicate {
    query: String,
    query_lower: String,
    words: Vec<String>,
    tags: TagFilter,
}

impl WordMatchPredicate {
    /// Builds a predicate from free text.
    ///
    /// Returns `None` when the query holds no words.
    pub fn from_query(query: &str, tags: TagFilter) -> Option<Self> {
        let query = query.trim();
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            return None;
        }
        Some(Self {
            query: query.to_string(),
            query_lower: query.to_lowercase(),
            words,
            tags,
        })
    }

    /// The trimmed query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Lower-cased query words.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Accepted semantic tags.
    pub fn tags(&self) -> &TagFilter {
        &self.tags
    }

    /// Returns true if `term` contains every query word, ignoring case.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.words.iter().all(|word| term.contains(word.as_str()))
    }

    /// Ranks a term against the whole query.
    pub fn rank(&self, term: &str) -> MatchRank {
        let term = term.to_lowercase();
        if term == self.query_lower {
            MatchRank::Exact
        } else if term.starts_with(&self.query_lower) {
            MatchRank::Prefix
        } else {
            MatchRank::Substring
        }
    }

    /// Renders the word conditions as a parameterized `ILIKE` clause.
    ///
    /// Placeholders are numbered from `first_param`. LIKE metacharacters in
    /// the words are escaped with a backslash.
    pub fn to_sql(&self, column: &str, first_param: usize) -> SqlClause {
        let conditions: Vec<String> = (0..self.words.len())
            .map(|i| format!("{column} ILIKE ${}", first_param + i))
            .collect();
        let params = self
            .words
            .iter()
            .map(|word| format!("%{}%", escape_like(word)))
            .collect();
        SqlClause {
            sql: format!("({})", conditions.join(" AND ")),
            params,
        }
    }
}

/// Trigram-similarity predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyPredicate {
    query: String,
    tags: TagFilter,
    min_similarity: f32,
}

impl FuzzyPredicate {
    /// Builds a predicate from free text.
    ///
    /// Returns `None` when the query is blank.
    pub fn from_query(query: &str, tags: TagFilter, min_similarity: f32) -> Option<Self> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        Some(Self {
            query: query.to_string(),
            tags,
            min_similarity,
        })
    }

    /// The trimmed query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Accepted semantic tags.
    pub fn tags(&self) -> &TagFilter {
        &self.tags
    }

    /// Lowest similarity score a term may have and still match.
    pub fn min_similarity(&self) -> f32 {
        self.min_similarity
    }

    /// Returns true if `score` clears the threshold.
    pub fn accepts(&self, score: f32) -> bool {
        score >= self.min_similarity
    }

    /// Renders the similarity condition as a parameterized clause.
    ///
    /// Uses `similarity()` from `pg_trgm`; placeholders start at `first_param`.
    pub fn to_sql(&self, column: &str, first_param: usize) -> SqlClause {
        SqlClause {
            sql: format!(
                "similarity({column}, ${}) >= ${}",
                first_param,
                first_param + 1
            ),
            params: vec![self.query.clone(), self.min_similarity.to_string()],
        }
    }
}

/// Either predicate, for operations that accept both (distinct counts).
#[derive(Debug, Clone, PartialEq)]
pub enum TermPredicate {
    /// All query words must appear in the term.
    Words(WordMatchPredicate),
    /// The term must be similar enough to the query.
    Fuzzy(FuzzyPredicate),
}

impl TermPredicate {
    /// Accepted semantic tags.
    pub fn tags(&self) -> &TagFilter {
        match self {
            Self::Words(p) => p.tags(),
            Self::Fuzzy(p) => p.tags(),
        }
    }
}

impl From<WordMatchPredicate> for TermPredicate {
    fn from(predicate: WordMatchPredicate) -> Self {
        Self::Words(predicate)
    }
}

impl From<FuzzyPredicate> for TermPredicate {
    fn from(predicate: FuzzyPredicate) -> Self {
        Self::Fuzzy(predicate)
    }
}

// =============================================================================
// SQL rendering
// =============================================================================

/// A SQL condition with positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlClause {
    /// Condition text with `$n` placeholders.
    pub sql: String,
    /// Parameter values, in placeholder order.
    pub params: Vec<String>,
}

impl fmt::Display for SqlClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

fn escape_like(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for c in word.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
