//! `snomed-search` command line.
//!
//! Loads a terminology snapshot and runs chief-complaint searches and
//! hierarchy lookups against it, either one-shot or interactively.
//!
//! # Environment Variables
//! - `SNOMED_SNAPSHOT`: JSON snapshot to load (same as `--snapshot`)
//! - `SNOMED_SEARCH_LIMIT`, `SNOMED_SEARCH_TAGS`, `SNOMED_SEARCH_MIN_SIMILARITY`,
//!   `SNOMED_SEARCH_TIMEOUT_MS`: search tuning
//! - `RUST_LOG`: log filter (default `snomed_search=info`)
//!
//! Variables may also be set in a `.env` file.

mod app;
mod command;
mod render;
mod repl;

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use snomed_search::SctId;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::{snapshot_pool, App, Settings};
use crate::command::ReplCommand;
use crate::repl::Repl;

#[derive(Parser)]
#[command(name = "snomed-search")]
#[command(version, about = "SNOMED CT chief complaint search")]
struct Cli {
    /// JSON terminology snapshot
    #[arg(long, env = "SNOMED_SNAPSHOT", global = true)]
    snapshot: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Tiered search for a complaint
    Search {
        /// Free-text complaint
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// One page of paged search
    Page {
        /// Free-text complaint
        #[arg(required = true, num_args = 1..)]
        term: Vec<String>,
        /// One-based page number
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        page: i64,
        /// Results per page
        #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
        size: i64,
    },
    /// Direct children of a concept
    Children {
        /// Concept id
        concept_id: SctId,
    },
    /// Direct parents of a concept
    Parents {
        /// Concept id
        concept_id: SctId,
    },
    /// Full details of a concept
    Details {
        /// Concept id
        concept_id: SctId,
    },
    /// Active synonyms of a concept
    Synonyms {
        /// Concept id
        concept_id: SctId,
    },
    /// Concept counts per clinical semantic tag
    Stats,
    /// Interactive session (default)
    Repl,
}

impl Commands {
    fn into_command(self) -> Option<ReplCommand> {
        Some(match self {
            Commands::Search { query } => ReplCommand::Search(query.join(" ")),
            Commands::Page { term, page, size } => ReplCommand::Page {
                page,
                size,
                term: term.join(" "),
            },
            Commands::Children { concept_id } => ReplCommand::Children(concept_id),
            Commands::Parents { concept_id } => ReplCommand::Parents(concept_id),
            Commands::Details { concept_id } => ReplCommand::Details(concept_id),
            Commands::Synonyms { concept_id } => ReplCommand::Synonyms(concept_id),
            Commands::Stats => ReplCommand::Stats,
            Commands::Repl => return None,
        })
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("snomed_search=info,snomed_search_store=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let app = App::new(snapshot_pool(cli.snapshot), &cli.settings);
    let repl = Repl::new(&app, cli.json);

    match cli.command.and_then(Commands::into_command) {
        Some(command) => {
            let stdout = io::stdout();
            repl.execute(&command, &mut stdout.lock())?;
        }
        None => {
            let stdin = io::stdin();
            repl.run(stdin.lock(), io::stdout())?;
        }
    }
    Ok(())
}
