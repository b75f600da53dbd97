//! Text and JSON rendering of results.

use std::io::{self, Write};

use serde::Serialize;
use snomed_search::{
    ChiefComplaint, Concept, ConceptSummary, HierarchyResponse, PagedResult, SearchOutcome,
    SearchTier, TagStats,
};

const RULE: &str = "------------------------------";

/// Search results plus the tier that produced them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport<'a> {
    /// Query as typed.
    pub query: &'a str,
    /// Producing tier, absent when nothing matched.
    pub tier: Option<SearchTier>,
    /// Ranked results.
    pub items: &'a [ConceptSummary],
}

impl<'a> SearchReport<'a> {
    /// Wraps an outcome for rendering.
    pub fn new(query: &'a str, outcome: &'a SearchOutcome) -> Self {
        Self {
            query,
            tier: outcome.tier,
            items: &outcome.items,
        }
    }
}

/// Pretty-printed JSON followed by a newline.
pub fn json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

fn tier_label(tier: SearchTier) -> &'static str {
    match tier {
        SearchTier::WordMatch => "word match",
        SearchTier::Fuzzy => "fuzzy match",
        SearchTier::Semantic => "suggested terms",
    }
}

/// Numbered search results.
pub fn search<W: Write>(out: &mut W, report: &SearchReport<'_>) -> io::Result<()> {
    let Some(tier) = report.tier.filter(|_| !report.items.is_empty()) else {
        return writeln!(out, "No results found.");
    };
    writeln!(
        out,
        "\nFound {} results ({}):",
        report.items.len(),
        tier_label(tier)
    )?;
    writeln!(out, "{RULE}")?;
    for (index, item) in report.items.iter().enumerate() {
        writeln!(
            out,
            "{}. {} [{}]",
            index + 1,
            item.preferred_term,
            item.concept_id
        )?;
    }
    writeln!(out, "{RULE}")
}

/// One page of paged search.
pub fn page<W: Write>(out: &mut W, page: &PagedResult<ChiefComplaint>) -> io::Result<()> {
    if page.items.is_empty() {
        return writeln!(
            out,
            "No results on page {} ({} total).",
            page.page, page.total_count
        );
    }
    writeln!(
        out,
        "Page {} of {} ({} total):",
        page.page,
        page.total_pages(),
        page.total_count
    )?;
    let first = u64::from(page.page.saturating_sub(1)) * u64::from(page.page_size);
    for (index, item) in page.items.iter().enumerate() {
        writeln!(
            out,
            "{}. {} [{}]",
            first + index as u64 + 1,
            item.preferred_term,
            item.concept_id
        )?;
    }
    Ok(())
}

/// Children or parents of a concept.
pub fn hierarchy<W: Write>(
    out: &mut W,
    relation: &str,
    response: &HierarchyResponse,
) -> io::Result<()> {
    writeln!(
        out,
        "{} of [{}] {} ({}):",
        relation,
        response.concept_id,
        response.preferred_term,
        response.total()
    )?;
    for item in &response.items {
        let marker = if item.has_children() { "+" } else { " " };
        writeln!(
            out,
            "  {} [{}] {}",
            marker, item.concept_id, item.preferred_term
        )?;
    }
    Ok(())
}

/// Concept details block.
pub fn details<W: Write>(out: &mut W, concept: Option<&Concept>) -> io::Result<()> {
    let Some(concept) = concept else {
        return writeln!(out, "Concept not found.");
    };
    writeln!(out, "\n--- CONCEPT DETAILS ---")?;
    writeln!(out, "ID: {}", concept.concept_id)?;
    writeln!(out, "FSN: {}", concept.fsn.as_deref().unwrap_or_default())?;
    writeln!(
        out,
        "Preferred Term: {}",
        concept.preferred_term.as_deref().unwrap_or_default()
    )?;
    writeln!(
        out,
        "Semantic Tag: {}",
        concept.semantic_tag.as_deref().unwrap_or_default()
    )?;
    writeln!(out, "Synonyms: {}", concept.synonyms.join(", "))?;
    if let Some(definition) = concept.definition.as_deref().filter(|d| !d.is_empty()) {
        writeln!(out, "Definition: {definition}")?;
    }
    if !concept.parents.is_empty() {
        writeln!(out, "Parents:")?;
        for parent in &concept.parents {
            writeln!(out, "  - [{}] {}", parent.concept_id, parent.preferred_term)?;
        }
    }
    writeln!(out, "Children Count: {}", concept.children_count)?;
    writeln!(out, "-----------------------")
}

/// Synonym list.
pub fn synonyms<W: Write>(out: &mut W, synonyms: &[String]) -> io::Result<()> {
    if synonyms.is_empty() {
        return writeln!(out, "No synonyms.");
    }
    for synonym in synonyms {
        writeln!(out, "  {synonym}")?;
    }
    Ok(())
}

/// Semantic tag histogram.
pub fn stats<W: Write>(out: &mut W, stats: &TagStats) -> io::Result<()> {
    let width = stats.iter().map(|e| e.tag.len()).max().unwrap_or(0);
    for entry in stats {
        writeln!(out, "{:<width$}  {:>8}", entry.tag, entry.count)?;
    }
    writeln!(out, "{:<width$}  {:>8}", "total", stats.total())
}
