//! Trigram similarity compatible with PostgreSQL's `pg_trgm`.
//!
//! Text is lower-cased and split into words on non-alphanumeric characters.
//! Each word is padded with two spaces in front and one behind, and every
//! three-character window becomes a trigram. Similarity is the number of
//! shared trigrams divided by the number of distinct trigrams in either
//! string.

use hashbrown::HashSet;

/// Distinct trigrams of a string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrigramSet {
    trigrams: HashSet<[char; 3]>,
}

impl TrigramSet {
    /// Extracts the trigrams of `text`.
    pub fn new(text: &str) -> Self {
        let mut trigrams = HashSet::new();
        let lowered = text.to_lowercase();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let padded: Vec<char> = "  "
                .chars()
                .chain(word.chars())
                .chain(std::iter::once(' '))
                .collect();
            for window in padded.windows(3) {
                trigrams.insert([window[0], window[1], window[2]]);
            }
        }
        Self { trigrams }
    }

    /// Number of distinct trigrams.
    pub fn len(&self) -> usize {
        self.trigrams.len()
    }

    /// Returns true if the text had no alphanumeric content.
    pub fn is_empty(&self) -> bool {
        self.trigrams.is_empty()
    }

    /// Similarity in `0.0..=1.0`; 0 when either side is empty.
    pub fn similarity(&self, other: &TrigramSet) -> f32 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let shared = small
            .trigrams
            .iter()
            .filter(|t| large.trigrams.contains(*t))
            .count();
        let union = self.len() + other.len() - shared;
        shared as f32 / union as f32
    }
}

/// Similarity between two strings.
pub fn similarity(a: &str, b: &str) -> f32 {
    TrigramSet::new(a).similarity(&TrigramSet::new(b))
}
