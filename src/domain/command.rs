//! Chat commands understood by a session, and parsing of the private setup message.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub const DEFAULT_START_COMMAND: &str = "!hangman-start";
pub const DEFAULT_RESET_COMMAND: &str = "!hangman-reset";

/// Control commands recognised in any message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Reset
}

/// The command tokens a deployment answers to, compared case-insensitively against the
/// first word of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSet {
    pub start: String,
    pub reset: String
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::new(DEFAULT_START_COMMAND, DEFAULT_RESET_COMMAND)
    }
}

impl CommandSet {
    pub fn new(start: &str, reset: &str) -> Self {
        Self { start: start.trim().to_lowercase(), reset: reset.trim().to_lowercase() }
    }

    pub fn classify(&self, text: &str) -> Option<Command> {
        let first = text.split_whitespace().next()?.to_lowercase();
        if first == self.reset {
            Some(Command::Reset)
        } else if first == self.start {
            Some(Command::Start)
        } else {
            None
        }
    }
}

/// A valid setup message: the fail limit and the phrase to guess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupRequest {
    pub max_fails: u32,
    pub secret:    String
}

/// One reason a setup message was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupProblem {
    EmptyMessage,
    FailLimit { max_allowed: u32 },
    MissingSecret
}

impl Display for SetupProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupProblem::EmptyMessage => write!(f, "Your message was empty. "),
            SetupProblem::FailLimit { max_allowed } => {
                write!(f, "Start with a number in the range 1 to {}. ", max_allowed)
            }
            SetupProblem::MissingSecret => write!(f, "Failed to identify a guessing sentence or word. ")
        }
    }
}

/// Every problem found in a setup message, reported together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupRejection {
    pub problems: Vec<SetupProblem>
}

impl Display for SetupRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to read your message. ")?;
        for problem in &self.problems {
            write!(f, "{}", problem)?;
        }
        Ok(())
    }
}

/// Upper-case, drop ASCII punctuation and collapse runs of whitespace into single spaces
pub fn normalize_setup(text: &str) -> String {
    let stripped: String = text.to_uppercase().chars().filter(|c| !c.is_ascii_punctuation()).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse `<fails> <phrase...>` where `fails` is in `1..=max_allowed`
pub fn parse_setup(text: &str, max_allowed: u32) -> Result<SetupRequest, SetupRejection> {
    let normalized = normalize_setup(text);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();

    let mut problems = Vec::new();
    if words.is_empty() {
        problems.push(SetupProblem::EmptyMessage);
    }

    let max_fails = words.first().and_then(|w| w.parse::<u32>().ok()).filter(|n| (1..=max_allowed).contains(n));
    if max_fails.is_none() {
        problems.push(SetupProblem::FailLimit { max_allowed });
    }

    let secret = words.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
    if secret.is_empty() {
        problems.push(SetupProblem::MissingSecret);
    }

    match max_fails {
        Some(max_fails) if problems.is_empty() => Ok(SetupRequest { max_fails, secret }),
        _ => Err(SetupRejection { problems })
    }
}
