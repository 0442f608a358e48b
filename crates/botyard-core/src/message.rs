//! Inbound and outbound chat message types.
//!
//! The field names on the wire follow the chat server's JSON
//! (`channelId`, `tags`), so these types serialize in camelCase.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a chat channel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Creates a channel identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ChannelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A message received from the chat transport. Read-only to bots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Raw message text.
    pub content: String,

    /// Channel the message was posted in.
    pub channel_id: ChannelId,

    /// Explicit-addressing tags; a tag equal to a bot's `bot_id` addresses it.
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Who posted the message, when the transport knows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl Message {
    /// Creates an untagged message in `channel`.
    pub fn new(channel: impl Into<ChannelId>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            channel_id: channel.into(),
            tags: BTreeSet::new(),
            author: None,
        }
    }

    /// Adds an explicit-addressing tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Sets the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Returns `true` if `tags` contains `bot_id`.
    pub fn is_addressed_to(&self, bot_id: &str) -> bool {
        self.tags.contains(bot_id)
    }
}

/// The single event type a bot sends back through the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEvent {
    /// Target channel.
    pub channel_id: ChannelId,
    /// Text to post.
    pub content: String,
}

impl OutboundEvent {
    /// Creates an outbound event.
    pub fn new(channel_id: ChannelId, content: impl Into<String>) -> Self {
        Self {
            channel_id,
            content: content.into(),
        }
    }
}
