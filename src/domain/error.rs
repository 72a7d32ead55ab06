use thiserror::Error;

use crate::domain::event::GroupId;

/// Common error types for the hangman bot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HangmanError {
    /// Bad round parameters (empty secret, fail limit out of range)
    #[error("{0}")]
    InvalidConfig(String),

    /// A guess was submitted after the round was already decided
    #[error("the round is already decided")]
    EngineTerminated,

    /// Internal consistency failure, e.g. a round both won and lost
    #[error("{0}")]
    InvariantViolation(String),

    /// An event reached a session bound to another group
    #[error("event from group {actual} delivered to session of group {expected}")]
    GroupMismatch { expected: GroupId, actual: GroupId },

    /// Configuration related errors
    #[error("{0}")]
    Configuration(String),

    /// Actor spawn errors
    #[error("{0}")]
    Spawn(String),

    /// Lane messaging errors
    #[error("{0}")]
    Dispatch(String),

    /// File system related errors
    #[error("{0}")]
    FileSystem(String),

    /// Serialization/deserialization errors
    #[error("{0}")]
    Serialization(String)
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for HangmanError {
    fn from(err: anyhow::Error) -> Self {
        HangmanError::Configuration(format!("{:#}", err))
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for HangmanError {
    fn from(err: std::io::Error) -> Self {
        HangmanError::FileSystem(err.to_string())
    }
}

/// Convert from serde_yaml::Error
impl From<serde_yaml::Error> for HangmanError {
    fn from(err: serde_yaml::Error) -> Self {
        HangmanError::Serialization(err.to_string())
    }
}

/// Convert from serde_json::Error
impl From<serde_json::Error> for HangmanError {
    fn from(err: serde_json::Error) -> Self {
        HangmanError::Serialization(err.to_string())
    }
}

/// Convert from ractor::SpawnErr
impl From<ractor::SpawnErr> for HangmanError {
    fn from(err: ractor::SpawnErr) -> Self {
        HangmanError::Spawn(err.to_string())
    }
}
