//! Actor-based event routing
//!
//! This module runs the guild sessions on a fixed pool of Ractor actors ("lanes"), each
//! handling its mailbox strictly in order.

pub mod lane;
pub mod message;
pub mod router;

pub use lane::*;
pub use message::*;
pub use router::*;
