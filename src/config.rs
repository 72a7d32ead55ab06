use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf}
};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{
    command::{CommandSet, DEFAULT_RESET_COMMAND, DEFAULT_START_COMMAND},
    stages::StageSet
};

/// Runtime settings for the bot
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Spread guilds over several lanes; when false everything runs on a single lane
    pub multithreading: bool,
    /// Fixed lane count, overriding the one derived from available parallelism
    pub lanes:          Option<usize>,
    /// Stage graphics file; the built-in gallows is used when unset
    pub stages_file:    Option<PathBuf>,
    pub start_command:  String,
    pub reset_command:  String
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            multithreading: true,
            lanes:          None,
            stages_file:    None,
            start_command:  DEFAULT_START_COMMAND.to_string(),
            reset_command:  DEFAULT_RESET_COMMAND.to_string()
        }
    }
}

impl Settings {
    /// Number of serial lanes to run
    pub fn lane_count(&self) -> usize {
        if !self.multithreading {
            return 1;
        }
        self.lanes.map(|n| n.max(1)).unwrap_or_else(default_lane_count)
    }

    pub fn commands(&self) -> CommandSet {
        CommandSet::new(&self.start_command, &self.reset_command)
    }

    pub fn load_stages(&self) -> Result<StageSet> {
        let stages = match &self.stages_file {
            Some(path) => StageSet::from_file(path),
            None => StageSet::builtin()
        };
        stages.context("Failed to load stage graphics")
    }
}

/// One lane per available hardware thread, keeping one back for the transport
pub fn default_lane_count() -> usize {
    std::thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1).saturating_sub(1).max(1)
}

/// Get the project directories for cross-platform config path resolution
pub fn get_project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "guild-hangman").context("Failed to determine project directories")
}

/// Get the configuration directory path
pub fn get_config_dir() -> Result<PathBuf> {
    let project_dirs = get_project_dirs()?;
    Ok(project_dirs.config_dir().to_path_buf())
}

/// Get the config file path
pub fn get_config_file_path() -> Result<PathBuf> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join("config.yaml"))
}

/// Load settings from `path`, or from the default location when no path is given.
///
/// A missing default file means defaults; a missing explicit file is an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => load_settings_from(path),
        None => {
            let default_path = get_config_file_path()?;
            if default_path.exists() { load_settings_from(&default_path) } else { Ok(Settings::default()) }
        }
    }
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}
