//! Stage graphics: the gallows drawings shown after each guess.
//!
//! A stage file starts with the frame height and the frame count, one number per line,
//! followed by the frames themselves. The number of frames fixes the largest fail limit a
//! round may use: a round allowing `m` fails needs `m + 2` frames (no fails up to `m` fails,
//! plus the final drawing once the round is lost), taken from the end of the list.

use std::{fs, path::Path};

use crate::domain::{engine::GameView, error::HangmanError};

const BUILTIN_STAGES: &str = include_str!("../../assets/stages.txt");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSet {
    frames: Vec<String>
}

impl StageSet {
    /// The gallows shipped with the bot (seven allowed fails at most)
    pub fn builtin() -> Result<Self, HangmanError> {
        Self::parse(BUILTIN_STAGES)
    }

    pub fn from_file(path: &Path) -> Result<Self, HangmanError> {
        let content = fs::read_to_string(path)
            .map_err(|e| HangmanError::FileSystem(format!("failed to read stage file {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, HangmanError> {
        let mut lines = content.lines();
        let height = parse_header(lines.next(), "frame height")?;
        let count = parse_header(lines.next(), "frame count")?;

        if height == 0 {
            return Err(HangmanError::Configuration("stage file has a frame height of 0".to_string()));
        }
        if count < 3 {
            return Err(HangmanError::Configuration(format!(
                "stage file needs at least 3 frames to allow a single fail, found {}",
                count
            )));
        }

        let available = lines.clone().count();
        if count.checked_mul(height).is_none_or(|needed| needed > available) {
            return Err(HangmanError::Configuration(format!(
                "stage file declares {} frames of {} lines but only {} lines follow",
                count, height, available
            )));
        }

        let mut frames = Vec::with_capacity(count);
        for index in 0..count {
            let frame: Vec<&str> = lines.by_ref().take(height).collect();
            if frame.len() < height {
                return Err(HangmanError::Configuration(format!(
                    "stage file is truncated: frame {} has {} of {} lines",
                    index,
                    frame.len(),
                    height
                )));
            }
            frames.push(frame.join("\n"));
        }

        Ok(Self { frames })
    }

    /// Largest fail limit a round may be configured with
    pub fn max_allowed_fails(&self) -> u32 {
        (self.frames.len() - 2) as u32
    }

    /// Frame for `stage` in a round allowing `max_fails` fails; every stage past the limit
    /// shows the final drawing
    pub fn frame(&self, stage: usize, max_fails: u32) -> Option<&str> {
        let used = max_fails as usize + 2;
        if used > self.frames.len() {
            return None;
        }
        let stage = stage.min(used - 1);
        self.frames.get(self.frames.len() - used + stage).map(String::as_str)
    }

    /// Full board text for a round: revealed cells, guesses so far and the drawing
    pub fn board(&self, view: &GameView) -> String {
        let letters: Vec<String> = view.guessed_letters.iter().map(char::to_string).collect();
        let mut board = format!(
            "`Status: {}`\nGuessed letters: [{}]\nGuessed words: [{}]\n",
            view.status_line(),
            letters.join(", "),
            view.guessed_words.join(", ")
        );
        if let Some(frame) = self.frame(view.stage, view.max_fails) {
            board.push_str("```\n");
            board.push_str(frame);
            board.push_str("\n```");
        }
        board
    }
}

fn parse_header(line: Option<&str>, what: &str) -> Result<usize, HangmanError> {
    let line = line.ok_or_else(|| HangmanError::Configuration(format!("stage file is missing the {}", what)))?;
    line.trim()
        .parse()
        .map_err(|_| HangmanError::Configuration(format!("stage file has an invalid {}: {:?}", what, line)))
}
