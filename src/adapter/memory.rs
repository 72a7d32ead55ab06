//! In-memory transport that records everything sent through it.
//!
//! Used by the tests and handy when embedding the router somewhere that collects replies
//! itself.

use std::sync::{Mutex, PoisonError};

use crate::{
    domain::event::{ChannelId, Destination, Outbound, UserId},
    port::transport::Transport
};

#[derive(Debug, Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<Outbound>>
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in send order
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Texts sent to one channel, in send order
    pub fn channel_texts(&self, channel_id: ChannelId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|o| o.destination == Destination::Channel(channel_id))
            .map(|o| o.text)
            .collect()
    }

    /// Texts sent privately to one user, in send order
    pub fn user_texts(&self, user_id: UserId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|o| o.destination == Destination::User(user_id))
            .map(|o| o.text)
            .collect()
    }

    fn push(&self, message: Outbound) {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(message);
    }
}

impl Transport for InMemoryTransport {
    fn send_to_channel(&self, channel_id: ChannelId, text: &str) {
        self.push(Outbound::to_channel(channel_id, text));
    }

    fn send_private_to_user(&self, user_id: UserId, text: &str) {
        self.push(Outbound::to_user(user_id, text));
    }
}
