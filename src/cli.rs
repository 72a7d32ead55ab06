//! Command-line arguments of the `hangman` binary

use std::path::PathBuf;

use clap::Parser;

use crate::config::Settings;

/// Run the hangman bot over stdin/stdout: one JSON event per input line, one JSON message
/// per output line
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct HangmanCli {
    /// Settings file (YAML); defaults to the user config directory
    #[arg(long, value_name = "FILE")]
    pub config:          Option<PathBuf>,
    /// Stage graphics file, overriding the settings
    #[arg(long, value_name = "FILE")]
    pub stages:          Option<PathBuf>,
    /// Number of lanes, overriding the settings
    #[arg(long)]
    pub lanes:           Option<usize>,
    /// Handle every guild on a single lane
    #[arg(long)]
    pub single_threaded: bool
}

impl HangmanCli {
    /// Layer the command-line overrides on top of loaded settings
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(stages) = &self.stages {
            settings.stages_file = Some(stages.clone());
        }
        if let Some(lanes) = self.lanes {
            settings.lanes = Some(lanes);
        }
        if self.single_threaded {
            settings.multithreading = false;
        }
        settings
    }
}
