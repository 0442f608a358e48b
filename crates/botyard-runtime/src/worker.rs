//! The per-bot message loop.
//!
//! A worker connects its bot, joins the bot's channel and then handles one
//! message at a time until it is cancelled. Failures of a single response are
//! reported into the channel and the loop continues; losing the transport or
//! an unusable bot ends the worker as crashed.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::LifecycleError;
use botyard_core::{
    BoxedBot, BoxedTransport, ChannelId, Connection, Message, Outbox, Replies, TransportError,
};

/// Lifecycle state of one worker.
///
/// ```text
/// Created ──► Running ──► StopRequested ──► Stopped
///                │                            ▲
///                └──── crashed (flag) ────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Created,
    Running,
    StopRequested,
    Stopped,
}

#[derive(Debug)]
pub(crate) struct WorkerStatus {
    pub(crate) state: WorkerState,
    pub(crate) crash: Option<String>,
}

pub(crate) type SharedStatus = Arc<Mutex<WorkerStatus>>;

pub(crate) fn new_status() -> SharedStatus {
    Arc::new(Mutex::new(WorkerStatus {
        state: WorkerState::Created,
        crash: None,
    }))
}

/// Result of a worker task: `Ok` when it stopped on request.
pub(crate) type WorkerExit = Result<(), LifecycleError>;

pub(crate) struct Worker {
    pub(crate) bot: BoxedBot,
    /// Name used in user-facing error messages.
    pub(crate) name: String,
    pub(crate) transport: BoxedTransport,
    pub(crate) token: CancellationToken,
    pub(crate) status: SharedStatus,
}

impl Worker {
    pub(crate) async fn run(self) -> WorkerExit {
        {
            let mut status = self.status.lock();
            if status.state == WorkerState::Created {
                status.state = WorkerState::Running;
            }
        }

        match self.serve().await {
            Ok(()) => {
                debug!("Worker stopped");
                Ok(())
            }
            Err(reason) => {
                error!(error = %reason, "Worker crashed");
                self.status.lock().crash = Some(reason.clone());
                Err(LifecycleError::Crashed { reason })
            }
        }
    }

    async fn serve(&self) -> Result<(), String> {
        let config = self.bot.config();

        let Connection { mut inbox, outbox } = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Ok(()),
            connection = self.transport.connect(config) => {
                connection.map_err(|e| format!("connect failed: {e}"))?
            }
        };

        let channel = ChannelId::new(config.autojoin_channel.clone());
        inbox
            .join(&channel)
            .await
            .map_err(|e| format!("failed to join #{channel}: {e}"))?;
        info!(channel = %channel, transport = self.transport.name(), "Bot is listening");

        let marker = self.bot.suppression_marker().map(str::to_owned);

        let result = loop {
            let received = tokio::select! {
                biased;
                _ = self.token.cancelled() => break Ok(()),
                received = inbox.recv() => received,
            };

            match received {
                Ok(Some(message)) => {
                    if let Err(reason) = self.handle(&message, &outbox, marker.as_deref()).await {
                        break Err(reason);
                    }
                }
                Ok(None) => break Err("transport closed".to_string()),
                Err(e) => break Err(format!("receive failed: {e}")),
            }
        };

        if let Err(e) = inbox.close().await {
            warn!(error = %e, "Failed to close inbox");
        }
        result
    }

    /// Handles one message. `Err` means the worker must stop.
    async fn handle(
        &self,
        message: &Message,
        outbox: &Outbox,
        marker: Option<&str>,
    ) -> Result<(), String> {
        let addressed =
            std::panic::catch_unwind(AssertUnwindSafe(|| self.bot.should_respond_to(message)));
        match addressed {
            Ok(true) => {}
            Ok(false) => {
                trace!(channel = %message.channel_id, "Message not addressed to this bot");
                return Ok(());
            }
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "Routing predicate panicked, message ignored");
                return Ok(());
            }
        }

        debug!(channel = %message.channel_id, "Handling message");
        let replies = Replies::new(
            outbox.clone(),
            message.channel_id.clone(),
            marker.map(str::to_owned),
        );

        let response = tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!("Shutdown requested, response abandoned");
                return Ok(());
            }
            response = AssertUnwindSafe(self.bot.generate_response(message, &replies)).catch_unwind() => response,
        };

        let text = match response {
            Ok(Ok(text)) => text,
            Ok(Err(e)) if e.is_fatal() => return Err(format!("bot is unusable: {e}")),
            Ok(Err(e)) => {
                warn!(error = %e, "Response failed");
                format!("**{} Error:** {e}", self.name)
            }
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "Response generation panicked");
                format!(
                    "**{} Error:** internal error while handling the message",
                    self.name
                )
            }
        };

        match replies.send(&text).await {
            Ok(()) => Ok(()),
            Err(e @ TransportError::ConnectionClosed { .. }) => Err(format!("emit failed: {e}")),
            Err(e) => {
                warn!(error = %e, "Failed to emit response");
                Ok(())
            }
        }
    }
}

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
