//! The guessing engine: one round of hangman as a pure state machine.
//!
//! The engine knows nothing about chats, sessions or threads. It keeps the secret, what has
//! been revealed, what has been guessed and how many fails were spent, and decides when the
//! round is won or lost.

use std::collections::BTreeSet;

use crate::domain::error::HangmanError;

/// Shown in place of characters that are still hidden
pub const PLACEHOLDER: char = '_';

/// Result of a round at a given point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    Won,
    Lost
}

/// Snapshot of a round for display purposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    /// One entry per secret character; hidden ones are [`PLACEHOLDER`]
    pub revealed:        Vec<char>,
    pub guessed_letters: Vec<char>,
    pub guessed_words:   Vec<String>,
    /// Equal to the fail count; `max_fails + 1` means the round is lost
    pub stage:           usize,
    pub max_fails:       u32
}

impl GameView {
    /// Revealed cells separated by spaces, so word lengths and gaps stay visible
    pub fn status_line(&self) -> String {
        self.revealed.iter().fold(String::with_capacity(self.revealed.len() * 2), |mut line, c| {
            line.push(*c);
            line.push(' ');
            line
        })
    }
}

/// One round of the guessing game.
///
/// Letters and words are case-folded to upper case, the secret included, so matching is
/// exact equality after folding. Any guess repeated within a round counts as a fail.
#[derive(Debug, Clone)]
pub struct GuessEngine {
    secret:          Vec<char>,
    revealed:        Vec<Option<char>>,
    guessed_letters: BTreeSet<char>,
    guessed_words:   BTreeSet<String>,
    fail_count:      u32,
    max_fails:       u32
}

impl GuessEngine {
    /// Start a round for `secret` allowing `max_fails` fails, where `max_fails` must be in
    /// `1..=max_allowed_fails`. The round is lost on fail number `max_fails + 1`.
    pub fn new(secret: &str, max_fails: u32, max_allowed_fails: u32) -> Result<Self, HangmanError> {
        let mut problems = Vec::new();
        if secret.chars().all(|c| c == ' ') {
            problems.push("the secret must contain at least one non-space character".to_string());
        }
        if !(1..=max_allowed_fails).contains(&max_fails) {
            problems.push(format!("allowed fails must be in the range 1 to {}", max_allowed_fails));
        }
        if !problems.is_empty() {
            return Err(HangmanError::InvalidConfig(problems.join(", ")));
        }

        let secret: Vec<char> = secret.chars().map(fold_case).collect();
        let revealed = secret.iter().map(|c| (*c == ' ').then_some(' ')).collect();

        Ok(Self {
            secret,
            revealed,
            guessed_letters: BTreeSet::new(),
            guessed_words: BTreeSet::new(),
            fail_count: 0,
            max_fails
        })
    }

    /// Guess a single letter. Returns true when the secret contains it.
    pub fn guess_letter(&mut self, letter: char) -> Result<bool, HangmanError> {
        self.ensure_in_progress()?;
        let letter = fold_case(letter);

        if !self.guessed_letters.insert(letter) {
            self.fail_count += 1;
            return Ok(false);
        }

        let mut hit = false;
        for (cell, c) in self.revealed.iter_mut().zip(&self.secret) {
            if *c == letter {
                *cell = Some(letter);
                hit = true;
            }
        }
        if !hit {
            self.fail_count += 1;
        }
        Ok(hit)
    }

    /// Guess the whole secret. Returns true on an exact match, which reveals everything.
    ///
    /// A repeated word costs one fail for the repeat on top of the fail for the mismatch.
    pub fn guess_word(&mut self, word: &str) -> Result<bool, HangmanError> {
        self.ensure_in_progress()?;
        let word: String = word.chars().map(fold_case).collect();

        let matched = word.chars().eq(self.secret.iter().copied());
        if !self.guessed_words.insert(word) {
            self.fail_count += 1;
        }

        if matched {
            self.revealed = self.secret.iter().copied().map(Some).collect();
        } else {
            self.fail_count += 1;
        }
        Ok(matched)
    }

    /// Current outcome; fails with `InvariantViolation` if the round is both won and lost
    pub fn outcome(&self) -> Result<Outcome, HangmanError> {
        let won = self.revealed.iter().all(Option::is_some);
        let lost = self.fail_count > self.max_fails;
        match (won, lost) {
            (true, true) => Err(HangmanError::InvariantViolation(format!(
                "round is both won and lost ({} fails of {})",
                self.fail_count, self.max_fails
            ))),
            (true, false) => Ok(Outcome::Won),
            (false, true) => Ok(Outcome::Lost),
            (false, false) => Ok(Outcome::InProgress)
        }
    }

    pub fn is_won(&self) -> Result<bool, HangmanError> {
        Ok(self.outcome()? == Outcome::Won)
    }

    pub fn is_lost(&self) -> Result<bool, HangmanError> {
        Ok(self.outcome()? == Outcome::Lost)
    }

    /// Fails left before the round is lost; negative once it is
    pub fn fails_remaining(&self) -> i64 {
        i64::from(self.max_fails) - i64::from(self.fail_count)
    }

    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    pub fn max_fails(&self) -> u32 {
        self.max_fails
    }

    pub fn secret(&self) -> String {
        self.secret.iter().collect()
    }

    pub fn render(&self) -> GameView {
        GameView {
            revealed:        self.revealed.iter().map(|cell| cell.unwrap_or(PLACEHOLDER)).collect(),
            guessed_letters: self.guessed_letters.iter().copied().collect(),
            guessed_words:   self.guessed_words.iter().cloned().collect(),
            stage:           self.fail_count as usize,
            max_fails:       self.max_fails
        }
    }

    fn ensure_in_progress(&self) -> Result<(), HangmanError> {
        match self.outcome()? {
            Outcome::InProgress => Ok(()),
            Outcome::Won | Outcome::Lost => Err(HangmanError::EngineTerminated)
        }
    }
}

/// Upper-case a character when it maps to exactly one character, otherwise keep it
fn fold_case(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c
    }
}
