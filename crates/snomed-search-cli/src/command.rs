//! REPL command parser.
//!
//! Plain input is a search query. Input starting with `:` is a command:
//!
//! | Command | Action |
//! |---------|--------|
//! | `:children <id>` | direct children |
//! | `:parents <id>` | direct parents |
//! | `:details <id>` | concept details |
//! | `:synonyms <id>` | active synonyms |
//! | `:page <n> <size> <term>` | one page of paged search |
//! | `:stats` | semantic tag histogram |
//! | `:help` | command list |
//!
//! `exit`, `quit` or an empty line ends the session.

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{all_consuming, map, map_res, opt, recognize, rest, value, verify},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use snomed_search::SctId;

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// End the session.
    Quit,
    /// Tiered search for free text.
    Search(String),
    /// Direct children of a concept.
    Children(SctId),
    /// Direct parents of a concept.
    Parents(SctId),
    /// Full concept details.
    Details(SctId),
    /// Active synonyms of a concept.
    Synonyms(SctId),
    /// One page of paged search.
    Page {
        /// One-based page number as typed.
        page: i64,
        /// Page size as typed.
        size: i64,
        /// Search term.
        term: String,
    },
    /// Semantic tag histogram.
    Stats,
    /// Command list.
    Help,
}

/// Errors from parsing a `:` command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The command name is not known.
    #[error("unknown command ':{0}' (try :help)")]
    Unknown(String),

    /// The command is known but its arguments are malformed.
    #[error("usage: {0}")]
    Usage(&'static str),
}

const USAGE: [(&str, &str); 7] = [
    ("children", ":children <concept id>"),
    ("parents", ":parents <concept id>"),
    ("details", ":details <concept id>"),
    ("synonyms", ":synonyms <concept id>"),
    ("page", ":page <page> <page size> <term>"),
    ("stats", ":stats"),
    ("help", ":help"),
];

/// Help text listing every command.
pub fn help_text() -> String {
    let mut text = String::from("Type a complaint to search, or one of:\n");
    for (_, usage) in USAGE {
        text.push_str("  ");
        text.push_str(usage);
        text.push('\n');
    }
    text.push_str("  exit\n");
    text
}

/// Parses one REPL line.
pub fn parse_line(line: &str) -> Result<ReplCommand, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Ok(ReplCommand::Quit);
    }
    if !line.starts_with(':') {
        return Ok(ReplCommand::Search(line.to_string()));
    }

    match all_consuming(delimited(char(':'), command, multispace0))(line) {
        Ok((_, command)) => Ok(command),
        Err(_) => {
            let name = line[1..]
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            match USAGE.iter().find(|(known, _)| *known == name) {
                Some((_, usage)) => Err(CommandError::Usage(*usage)),
                None => Err(CommandError::Unknown(name)),
            }
        }
    }
}

// ============================================================================
// Grammar
// ============================================================================

fn command(input: &str) -> IResult<&str, ReplCommand> {
    alt((
        concept_command,
        page_command,
        value(ReplCommand::Stats, tag_no_case("stats")),
        value(ReplCommand::Help, alt((tag_no_case("help"), tag_no_case("?")))),
    ))(input)
}

fn concept_command(input: &str) -> IResult<&str, ReplCommand> {
    alt((
        map(with_id("children"), ReplCommand::Children),
        map(with_id("parents"), ReplCommand::Parents),
        map(with_id("details"), ReplCommand::Details),
        map(with_id("synonyms"), ReplCommand::Synonyms),
    ))(input)
}

fn with_id<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, SctId> {
    preceded(pair(tag_no_case(name), multispace1), sct_id)
}

fn page_command(input: &str) -> IResult<&str, ReplCommand> {
    let (input, (page, size, term)) = preceded(
        pair(tag_no_case("page"), multispace1),
        tuple((
            signed_int,
            preceded(multispace1, signed_int),
            preceded(multispace1, verify(rest, |s: &str| !s.trim().is_empty())),
        )),
    )(input)?;
    Ok((
        input,
        ReplCommand::Page {
            page,
            size,
            term: term.trim().to_string(),
        },
    ))
}

fn sct_id(input: &str) -> IResult<&str, SctId> {
    map_res(digit1, str::parse::<SctId>)(input)
}

fn signed_int(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<i64>)(input)
}
