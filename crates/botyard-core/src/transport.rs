//! Transport boundary between bots and the chat server.
//!
//! A [`Transport`] hands each bot a [`Connection`]: an [`Inbox`] to read
//! channel traffic from and an [`Outbox`] to post to. Protocol framing is
//! the transport implementation's business.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::BotConfig;
use crate::error::{TransportError, TransportResult};
use crate::message::{ChannelId, Message, OutboundEvent};

/// Sending half of a bot connection.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<OutboundEvent>,
}

impl Outbox {
    /// Wraps an existing sender.
    pub fn new(tx: mpsc::Sender<OutboundEvent>) -> Self {
        Self { tx }
    }

    /// Creates an outbox and the receiver that drains it.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    /// Posts an event.
    pub async fn emit(&self, event: OutboundEvent) -> TransportResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| TransportError::closed("outbound channel dropped"))
    }

    /// Returns `true` once the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a bot connection.
#[async_trait]
pub trait Inbox: Send {
    /// Subscribes to a channel.
    async fn join(&mut self, channel: &ChannelId) -> TransportResult<()>;

    /// Waits for the next message; `None` once the transport is closed.
    ///
    /// Must be cancel-safe: dropping the future loses no message.
    async fn recv(&mut self) -> TransportResult<Option<Message>>;

    /// Leaves all channels.
    async fn close(&mut self) -> TransportResult<()>;
}

/// A bot's live connection.
pub struct Connection {
    /// Incoming messages.
    pub inbox: Box<dyn Inbox>,
    /// Outgoing events.
    pub outbox: Outbox,
}

/// Source of bot connections.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Transport name for logs.
    fn name(&self) -> &'static str;

    /// Opens a connection for the bot described by `config`.
    async fn connect(&self, config: &BotConfig) -> TransportResult<Connection>;
}

/// Shared, type-erased transport.
pub type BoxedTransport = Arc<dyn Transport>;
