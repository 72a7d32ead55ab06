//! # Guild Hangman
//!
//! Hangman for chat bots that live in many guilds at once.
//!
//! This crate provides:
//! - A deterministic guessing engine for one round of hangman
//! - A per-guild session state machine (idle, setup over direct message, playing)
//! - A router that spreads guilds over a fixed pool of serial actor lanes, so each guild's
//!   events are handled in order and never concurrently, while unrelated guilds run in parallel
//!
//! The chat platform itself stays outside: events come in through
//! [`GroupRouter::dispatch`](actor::GroupRouter::dispatch) and replies go out through a
//! [`Transport`](port::transport::Transport).

pub mod actor;
pub mod adapter;
pub mod cli;
pub mod config;
pub mod domain;
pub mod port;

// Re-export commonly used types
pub use actor::{GroupRouter, RouterStats, SessionHandle};
pub use cli::HangmanCli;
pub use config::{Settings, load_settings};
pub use domain::{
    engine::GuessEngine,
    error::HangmanError,
    event::{ChannelId, ChannelKind, GroupId, InboundEvent, Outbound, UserId},
    session::{GroupSession, SessionPhase}
};
pub use port::transport::Transport;
