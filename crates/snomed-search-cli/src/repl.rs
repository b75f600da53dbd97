//! Interactive session and command execution.
//!
//! One-shot subcommands and REPL lines both end up in
//! [`Repl::execute`], so they print the same way.

use std::io::{self, BufRead, Write};

use snomed_search::{ConceptSummary, SearchError};
use tracing::debug;

use crate::app::App;
use crate::command::{help_text, parse_line, ReplCommand};
use crate::render::{self, SearchReport};

/// Errors raised while executing a command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The search services failed.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Writing output or reading input failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Executes commands against an [`App`] and prints the results.
pub struct Repl<'a> {
    app: &'a App,
    json: bool,
}

impl<'a> Repl<'a> {
    /// Creates a session; `json` switches output to JSON.
    pub fn new(app: &'a App, json: bool) -> Self {
        Self { app, json }
    }

    /// Runs one command. Returns the search hits, if the command searched.
    pub fn execute<W: Write>(
        &self,
        command: &ReplCommand,
        out: &mut W,
    ) -> Result<Vec<ConceptSummary>, CliError> {
        match command {
            ReplCommand::Quit => {}
            ReplCommand::Help => write!(out, "{}", help_text())?,
            ReplCommand::Search(query) => {
                let outcome = self.app.search(query)?;
                let report = SearchReport::new(query, &outcome);
                if self.json {
                    render::json(out, &report)?;
                } else {
                    render::search(out, &report)?;
                }
                return Ok(outcome.items);
            }
            ReplCommand::Page { page, size, term } => {
                let result = self.app.page(term, *page, *size)?;
                if self.json {
                    render::json(out, &result)?;
                } else {
                    render::page(out, &result)?;
                }
            }
            ReplCommand::Children(id) => {
                let response = self.app.children(*id, None)?;
                if self.json {
                    render::json(out, &response)?;
                } else {
                    render::hierarchy(out, "Children", &response)?;
                }
            }
            ReplCommand::Parents(id) => {
                let response = self.app.parents(*id)?;
                if self.json {
                    render::json(out, &response)?;
                } else {
                    render::hierarchy(out, "Parents", &response)?;
                }
            }
            ReplCommand::Details(id) => {
                let concept = self.app.details(*id)?;
                if self.json {
                    render::json(out, &concept)?;
                } else {
                    render::details(out, concept.as_ref())?;
                }
            }
            ReplCommand::Synonyms(id) => {
                let synonyms = self.app.synonyms(*id)?;
                if self.json {
                    render::json(out, &synonyms)?;
                } else {
                    render::synonyms(out, &synonyms)?;
                }
            }
            ReplCommand::Stats => {
                let stats = self.app.stats()?;
                if self.json {
                    render::json(out, &stats)?;
                } else {
                    render::stats(out, &stats)?;
                }
            }
        }
        Ok(Vec::new())
    }

    /// Reads commands until `exit`, an empty line, or end of input.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut out: W) -> io::Result<()> {
        writeln!(out, "========================================")?;
        writeln!(out, " SNOMED CT Chief Complaint Search")?;
        writeln!(out, "========================================")?;
        writeln!(out, "Type 'exit' to quit, ':help' for commands.")?;

        loop {
            let Some(line) = prompt(&mut input, &mut out, "\nEnter search query: ")? else {
                break;
            };
            let command = match parse_line(&line) {
                Ok(ReplCommand::Quit) => break,
                Ok(command) => command,
                Err(err) => {
                    writeln!(out, "{err}")?;
                    continue;
                }
            };
            debug!(?command, "repl command");

            if let ReplCommand::Search(query) = &command {
                writeln!(out, "Searching for '{query}'...")?;
            }
            let hits = match self.execute(&command, &mut out) {
                Ok(hits) => hits,
                Err(CliError::Search(err)) => {
                    writeln!(out, "Error: {err}")?;
                    continue;
                }
                Err(CliError::Io(err)) => return Err(err),
            };
            if hits.is_empty() || self.json {
                continue;
            }

            let Some(choice) = prompt(
                &mut input,
                &mut out,
                "\nEnter number for details (or Enter to search again): ",
            )?
            else {
                break;
            };
            if let Some(hit) = pick(&hits, &choice) {
                match self.execute(&ReplCommand::Details(hit.concept_id), &mut out) {
                    Ok(_) => {}
                    Err(CliError::Search(err)) => writeln!(out, "Error: {err}")?,
                    Err(CliError::Io(err)) => return Err(err),
                }
            }
        }
        Ok(())
    }
}

/// Writes a prompt and reads one line; `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, text: &str) -> io::Result<Option<String>> {
    write!(out, "{text}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// One-based selection from the last result list.
fn pick<'h>(hits: &'h [ConceptSummary], choice: &str) -> Option<&'h ConceptSummary> {
    let index: usize = choice.trim().parse().ok()?;
    index.checked_sub(1).and_then(|i| hits.get(i))
}
