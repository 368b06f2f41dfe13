//! Line-oriented commands driving a tree, one command per line.

use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};

use crate::avl_tree::BalancedTree;

pub const HELP: &str = "\
insert <key>   (i, +)  add a key
delete <key>   (d, -)  remove a key
clear                  remove every key
print          (p)     show the tree
help           (?)     show this text
quit           (q)     leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<K> {
    Insert(K),
    Delete(K),
    Clear,
    Print,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownVerb(String),
    #[error("`{verb}` needs a key")]
    MissingKey { verb: String },
    #[error("invalid key `{input}`")]
    InvalidKey { input: String },
    #[error("unexpected trailing input `{0}`")]
    Trailing(String),
}

/// Parses one input line. Blank lines and `#` comments are `Ok(None)`.
pub fn parse_command<K: FromStr>(line: &str) -> Result<Option<Command<K>>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let mut key = || -> Result<K, CommandError> {
        let input = words.next().ok_or_else(|| CommandError::MissingKey {
            verb: verb.to_string(),
        })?;
        input.parse().map_err(|_| CommandError::InvalidKey {
            input: input.to_string(),
        })
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "insert" | "i" | "+" => Command::Insert(key()?),
        "delete" | "d" | "-" => Command::Delete(key()?),
        "clear" => Command::Clear,
        "print" | "p" => Command::Print,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => return Err(CommandError::UnknownVerb(verb.to_string())),
    };

    let rest = words.collect::<Vec<_>>();
    if !rest.is_empty() {
        return Err(CommandError::Trailing(rest.join(" ")));
    }
    Ok(Some(command))
}

/// What the caller should do after a line has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The tree may have changed (or a print was asked for): redraw it.
    Redraw,
    Help,
    Quit,
    /// Blank line or comment.
    Ignored,
    /// The line did not parse; the tree was not touched.
    Rejected(CommandError),
}

/// A tree plus the command loop state around it.
pub struct Session<K: Ord> {
    tree: BalancedTree<K>,
}

impl<K: Ord> Session<K> {
    pub fn new() -> Self {
        Session {
            tree: BalancedTree::new(),
        }
    }

    pub fn with_tree(tree: BalancedTree<K>) -> Self {
        Session { tree }
    }

    pub fn tree(&self) -> &BalancedTree<K> {
        &self.tree
    }

    pub fn apply(&mut self, command: Command<K>) -> Outcome {
        match command {
            Command::Insert(key) => {
                self.tree.insert(key);
                Outcome::Redraw
            }
            Command::Delete(key) => {
                self.tree.delete(&key);
                Outcome::Redraw
            }
            Command::Clear => {
                info!(removed = self.tree.len(), "clearing tree");
                self.tree.clear();
                Outcome::Redraw
            }
            Command::Print => Outcome::Redraw,
            Command::Help => Outcome::Help,
            Command::Quit => Outcome::Quit,
        }
    }

    pub fn handle_line(&mut self, line: &str) -> Outcome
    where
        K: FromStr,
    {
        match parse_command(line) {
            Ok(Some(command)) => self.apply(command),
            Ok(None) => Outcome::Ignored,
            Err(e) => {
                warn!(%e, line, "discarding input");
                Outcome::Rejected(e)
            }
        }
    }
}

impl<K: Ord> Default for Session<K> {
    fn default() -> Self {
        Session::new()
    }
}
