//! Command-line argument parsing.

use std::path::PathBuf;

use anyhow::{bail, Result};

pub const USAGE: &str = "\
Usage: lessonloader [--content-dir DIR] <command>

Commands:
  list                 List every registered lesson id
  lesson <id>          Load one lesson and print it as JSON
  collection <id>      Load a whole module, reporting progress on stderr
  stats                Show cache and registry counts
  help                 Show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Lesson(String),
    Collection(String),
    Stats,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub content_dir: Option<PathBuf>,
    pub command: Command,
}

/// Parse arguments, excluding the program name.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Invocation> {
    let mut content_dir = None;
    let mut positional = Vec::new();

    let mut iter = args.iter().map(AsRef::as_ref);
    while let Some(arg) = iter.next() {
        match arg {
            "--content-dir" => match iter.next() {
                Some(dir) => content_dir = Some(PathBuf::from(dir)),
                None => bail!("--content-dir requires a directory"),
            },
            "-h" | "--help" => positional.insert(0, "help"),
            other if other.starts_with('-') => bail!("Unknown option: {}\n\n{}", other, USAGE),
            other => positional.push(other),
        }
    }

    let command = match positional.as_slice() {
        [] | ["help", ..] => Command::Help,
        ["list"] => Command::List,
        ["stats"] => Command::Stats,
        ["lesson", id] => Command::Lesson(id.to_string()),
        ["collection", id] => Command::Collection(id.to_string()),
        ["lesson"] | ["collection"] => bail!("Missing id\n\n{}", USAGE),
        other => bail!("Unrecognized command: {}\n\n{}", other.join(" "), USAGE),
    };

    Ok(Invocation {
        content_dir,
        command,
    })
}
