//! In-process chat hub.
//!
//! Every channel is a tokio `broadcast` channel. A bot's inbox forwards the
//! channels it joins into one private queue; its outbox is drained by a
//! task that posts each emission back to the channel, authored by the bot,
//! the way a chat server echoes messages to all members.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use botyard_core::{
    BotConfig, ChannelId, Connection, Inbox, Message, OutboundEvent, Outbox, Transport,
    TransportError, TransportResult,
};

const DEFAULT_CAPACITY: usize = 256;

/// An event a bot sent, as observed through [`MemoryHub::subscribe_emissions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// Sender's `bot_id`.
    pub bot_id: String,
    /// What was sent.
    pub event: OutboundEvent,
}

struct HubInner {
    channels: Mutex<HashMap<ChannelId, broadcast::Sender<Message>>>,
    emissions: broadcast::Sender<Emission>,
    capacity: usize,
    closed: CancellationToken,
}

impl HubInner {
    fn sender(&self, channel: &ChannelId) -> broadcast::Sender<Message> {
        self.channels
            .lock()
            .entry(channel.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

/// Chat server living inside the process.
#[derive(Clone)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

impl MemoryHub {
    /// Creates a hub with the default per-channel buffer.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a hub buffering up to `capacity` messages per channel.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(HubInner {
                channels: Mutex::new(HashMap::new()),
                emissions: broadcast::channel(capacity).0,
                capacity,
                closed: CancellationToken::new(),
            }),
        }
    }

    /// Posts a message to its channel. Returns how many inboxes will see it.
    pub fn post(&self, message: Message) -> usize {
        if self.inner.closed.is_cancelled() {
            return 0;
        }
        trace!(channel = %message.channel_id, "Posting message");
        self.inner
            .sender(&message.channel_id)
            .send(message)
            .unwrap_or(0)
    }

    /// Observes every emission made by connected bots.
    pub fn subscribe_emissions(&self) -> broadcast::Receiver<Emission> {
        self.inner.emissions.subscribe()
    }

    /// Closes the hub: every inbox reports end of stream.
    pub fn close(&self) {
        self.inner.closed.cancel();
        self.inner.channels.lock().clear();
    }

    /// Returns `true` once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryHub {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self, config: &BotConfig) -> TransportResult<Connection> {
        if self.is_closed() {
            return Err(TransportError::ConnectionFailed {
                reason: "hub is closed".into(),
            });
        }

        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let inbox = HubInbox {
            hub: Arc::clone(&self.inner),
            bot_id: config.bot_id.clone(),
            tx,
            rx,
            forwarders: Vec::new(),
            joined: Vec::new(),
        };

        let (outbox, events) = Outbox::channel(self.inner.capacity);
        tokio::spawn(relay_emissions(
            Arc::clone(&self.inner),
            config.bot_id.clone(),
            events,
        ));

        debug!(bot = %config.bot_id, "Bot connected to memory hub");
        Ok(Connection {
            inbox: Box::new(inbox),
            outbox,
        })
    }
}

/// Drains a bot's outbox into the hub.
async fn relay_emissions(
    hub: Arc<HubInner>,
    bot_id: String,
    mut events: mpsc::Receiver<OutboundEvent>,
) {
    while let Some(event) = events.recv().await {
        if hub.closed.is_cancelled() {
            break;
        }
        let echo = Message::new(event.channel_id.clone(), event.content.clone())
            .with_author(bot_id.clone());
        let _ = hub.sender(&event.channel_id).send(echo);
        let _ = hub.emissions.send(Emission {
            bot_id: bot_id.clone(),
            event,
        });
    }
    trace!(bot = %bot_id, "Emission relay finished");
}

// =============================================================================
// Inbox
// =============================================================================

struct HubInbox {
    hub: Arc<HubInner>,
    bot_id: String,
    tx: mpsc::Sender<Message>,
    rx: mpsc::Receiver<Message>,
    forwarders: Vec<JoinHandle<()>>,
    joined: Vec<ChannelId>,
}

#[async_trait]
impl Inbox for HubInbox {
    async fn join(&mut self, channel: &ChannelId) -> TransportResult<()> {
        if self.hub.closed.is_cancelled() {
            return Err(TransportError::closed("hub is closed"));
        }
        if self.joined.contains(channel) {
            return Ok(());
        }

        let mut source = self.hub.sender(channel).subscribe();
        let sink = self.tx.clone();
        let bot_id = self.bot_id.clone();
        let channel_name = channel.clone();

        self.forwarders.push(tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(message) => {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(bot = %bot_id, channel = %channel_name, skipped, "Inbox lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
        self.joined.push(channel.clone());

        debug!(bot = %self.bot_id, channel = %channel, "Joined channel");
        Ok(())
    }

    async fn recv(&mut self) -> TransportResult<Option<Message>> {
        tokio::select! {
            biased;
            _ = self.hub.closed.cancelled() => Ok(None),
            message = self.rx.recv() => Ok(message),
        }
    }

    async fn close(&mut self) -> TransportResult<()> {
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }
        self.joined.clear();
        debug!(bot = %self.bot_id, "Inbox closed");
        Ok(())
    }
}

impl Drop for HubInbox {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}
