//! The bot contract.
//!
//! A bot is three things: an immutable [`BotConfig`], a pure routing
//! predicate, and an async response generator. Releasing resources on
//! shutdown is an explicit, optional capability exposed through
//! [`Bot::cleanup`] rather than something the host checks for.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BotConfig;
use crate::error::{CleanupError, ResponseResult, TransportResult};
use crate::message::{ChannelId, Message, OutboundEvent};
use crate::transport::Outbox;

/// A chat bot hosted by the runtime.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Returns the bot's configuration.
    fn config(&self) -> &BotConfig;

    /// Decides whether `message` is addressed to this bot.
    ///
    /// Must be pure: no I/O, no state changes.
    fn should_respond_to(&self, message: &Message) -> bool;

    /// Produces the final reply for an addressed message.
    ///
    /// Interim acknowledgements go through `replies`. Recoverable failures
    /// are returned as errors and shown to the user by the run loop.
    async fn generate_response(&self, message: &Message, replies: &Replies)
    -> ResponseResult<String>;

    /// Marker prepended to every emission so the bot ignores its own echoes.
    fn suppression_marker(&self) -> Option<&str> {
        None
    }

    /// Returns the cleanup capability, if this bot holds resources.
    fn cleanup(&self) -> Option<&dyn Cleanup> {
        None
    }
}

/// Shutdown-time resource release.
///
/// Implementations must be idempotent: the host calls this once, but a
/// second call must be harmless.
#[async_trait]
pub trait Cleanup: Send + Sync {
    /// Releases held resources.
    async fn cleanup(&self) -> Result<(), CleanupError>;
}

/// Shared, type-erased bot.
pub type BoxedBot = Arc<dyn Bot>;

/// Routing rule used by all built-in bots.
///
/// A message is addressed when its content contains `trigger` or its tags
/// contain `bot_id`, unless the content carries `marker`. Both text checks
/// ignore case.
pub fn is_addressed(message: &Message, bot_id: &str, trigger: &str, marker: Option<&str>) -> bool {
    let content = message.content.to_lowercase();
    if let Some(marker) = marker
        && content.contains(&marker.to_lowercase())
    {
        return false;
    }

    message.is_addressed_to(bot_id) || content.contains(&trigger.to_lowercase())
}

// =============================================================================
// Replies
// =============================================================================

/// Handle a bot uses to emit interim messages while it works.
#[derive(Clone)]
pub struct Replies {
    outbox: Outbox,
    channel: ChannelId,
    marker: Option<String>,
}

impl Replies {
    /// Creates a reply handle targeting `channel`.
    pub fn new(outbox: Outbox, channel: ChannelId, marker: Option<String>) -> Self {
        Self {
            outbox,
            channel,
            marker,
        }
    }

    /// Channel replies are sent to.
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Wraps `text` with the suppression marker.
    pub fn render(&self, text: &str) -> String {
        match &self.marker {
            Some(marker) => format!("{marker}{text}"),
            None => text.to_string(),
        }
    }

    /// Emits an interim acknowledgement.
    pub async fn acknowledge(&self, text: &str) -> TransportResult<()> {
        self.send(text).await
    }

    /// Emits `text` to the reply channel.
    pub async fn send(&self, text: &str) -> TransportResult<()> {
        self.outbox
            .emit(OutboundEvent::new(self.channel.clone(), self.render(text)))
            .await
    }
}
