//! Normalised chat events coming in from the transport, and the messages going back out.
//!
//! Gateway decoding is done by the transport; everything here is the minimal shape the
//! router and the sessions need.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A guild, i.e. an isolated chat space with its own session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

/// A chat user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// A text channel inside a guild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an inbound message was posted.
///
/// The group id only exists for guild channels and the mutual guilds only for direct
/// messages, so each lives on its own variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelKind {
    /// A text channel of a guild
    Group { group_id: GroupId, channel_id: ChannelId },
    /// A direct message to the bot, with every guild the author shares with it
    Private {
        #[serde(default)]
        mutual_group_ids: Vec<GroupId>
    },
    /// Voice, news, thread or any other channel type; never handled
    Other
}

/// A message received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub author_id:   UserId,
    /// Display name, used when addressing the author
    #[serde(default)]
    pub author_name: String,
    /// Set for bot and other automated accounts, including ourselves
    #[serde(default)]
    pub is_bot:      bool,
    pub channel:     ChannelKind,
    pub text:        String
}

impl InboundEvent {
    /// Message posted in a guild text channel
    pub fn in_group(
        group_id: GroupId,
        channel_id: ChannelId,
        author_id: UserId,
        author_name: impl Into<String>,
        text: impl Into<String>
    ) -> Self {
        Self {
            author_id,
            author_name: author_name.into(),
            is_bot: false,
            channel: ChannelKind::Group { group_id, channel_id },
            text: text.into()
        }
    }

    /// Direct message to the bot
    pub fn private(
        author_id: UserId,
        author_name: impl Into<String>,
        mutual_group_ids: Vec<GroupId>,
        text: impl Into<String>
    ) -> Self {
        Self {
            author_id,
            author_name: author_name.into(),
            is_bot: false,
            channel: ChannelKind::Private { mutual_group_ids },
            text: text.into()
        }
    }

    pub fn from_bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    pub fn group_id(&self) -> Option<GroupId> {
        match &self.channel {
            ChannelKind::Group { group_id, .. } => Some(*group_id),
            _ => None
        }
    }

    pub fn channel_id(&self) -> Option<ChannelId> {
        match &self.channel {
            ChannelKind::Group { channel_id, .. } => Some(*channel_id),
            _ => None
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self.channel, ChannelKind::Private { .. })
    }

    /// Where a direct reply to this event should go
    pub fn reply_destination(&self) -> Option<Destination> {
        match &self.channel {
            ChannelKind::Group { channel_id, .. } => Some(Destination::Channel(*channel_id)),
            ChannelKind::Private { .. } => Some(Destination::User(self.author_id)),
            ChannelKind::Other => None
        }
    }
}

/// Target of an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", content = "id", rename_all = "snake_case")]
pub enum Destination {
    Channel(ChannelId),
    User(UserId)
}

/// A message the bot wants delivered, fire-and-forget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbound {
    pub destination: Destination,
    pub text:        String
}

impl Outbound {
    pub fn to_channel(channel_id: ChannelId, text: impl Into<String>) -> Self {
        Self { destination: Destination::Channel(channel_id), text: text.into() }
    }

    pub fn to_user(user_id: UserId, text: impl Into<String>) -> Self {
        Self { destination: Destination::User(user_id), text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_event_from_json() {
        let line = r#"{"author_id":7,"author_name":"ann","channel":{"kind":"private","mutual_group_ids":[1,2]},"text":"hi"}"#;
        let event: InboundEvent = serde_json::from_str(line).unwrap();

        assert_eq!(event.author_id, UserId(7));
        assert!(!event.is_bot);
        assert_eq!(event.channel, ChannelKind::Private { mutual_group_ids: vec![GroupId(1), GroupId(2)] });
        assert_eq!(event.reply_destination(), Some(Destination::User(UserId(7))));
    }

    #[test]
    fn test_group_event_accessors() {
        let event = InboundEvent::in_group(GroupId(3), ChannelId(30), UserId(1), "bob", "A");

        assert_eq!(event.group_id(), Some(GroupId(3)));
        assert_eq!(event.channel_id(), Some(ChannelId(30)));
        assert!(!event.is_private());
        assert_eq!(event.reply_destination(), Some(Destination::Channel(ChannelId(30))));
    }
}
