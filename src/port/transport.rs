use crate::domain::event::{ChannelId, Destination, Outbound, UserId};

/// Outbound side of the chat platform connection
///
/// Sends are fire-and-forget: implementations must not block the calling lane waiting for
/// delivery, and nothing they report flows back into a session.
pub trait Transport: Send + Sync {
    /// Post a message in a guild text channel
    fn send_to_channel(&self, channel_id: ChannelId, text: &str);

    /// Send a direct message to a user
    fn send_private_to_user(&self, user_id: UserId, text: &str);

    /// Route an outbound message to the matching send
    fn deliver(&self, message: &Outbound) {
        match message.destination {
            Destination::Channel(channel_id) => self.send_to_channel(channel_id, &message.text),
            Destination::User(user_id) => self.send_private_to_user(user_id, &message.text)
        }
    }
}
