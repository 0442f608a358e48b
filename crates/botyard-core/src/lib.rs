//! # Botyard Core
//!
//! Contracts shared by every part of the Botyard bot host.
//!
//! This crate provides:
//! - **Bot contract**: the [`Bot`] trait every plugin implements, with an
//!   explicit optional [`Cleanup`] capability
//! - **Data model**: [`BotConfig`], [`Message`], [`OutboundEvent`]
//! - **Registration**: [`BotDescriptor`] statics collected into the
//!   [`BOT_REGISTRY`] distributed slice via [`register_bot!`]
//! - **Explicit environment**: [`BotEnv`] carries credentials and settings
//!   into bot factories
//! - **Transport boundary**: [`Transport`], [`Inbox`], [`Outbox`]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   kind    ┌───────────────┐  create()  ┌─────────┐
//! │ bot manifest │──────────▶│ BOT_REGISTRY  │───────────▶│ dyn Bot │
//! └──────────────┘           └───────────────┘            └─────────┘
//!                                                              │
//!                                 Inbox ──▶ should_respond_to ─┤
//!                                 Outbox ◀── generate_response ┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use botyard_core::{Bot, BotConfig, BuildContext, BuildError, BoxedBot, register_bot};
//!
//! struct EchoBot { config: BotConfig }
//!
//! impl EchoBot {
//!     fn create(ctx: &BuildContext<'_>) -> Result<BoxedBot, BuildError> {
//!         let config = ctx.config(BotConfig::new("echo", "Echo Bot", "echo_bot"))?;
//!         Ok(std::sync::Arc::new(EchoBot { config }))
//!     }
//! }
//!
//! register_bot! {
//!     static ECHO = {
//!         kind: "echo",
//!         ty: EchoBot,
//!         description: "Repeats whatever it is asked",
//!         create: EchoBot::create,
//!     }
//! }
//! ```

pub mod bot;
pub mod config;
pub mod descriptor;
pub mod env;
pub mod error;
pub mod message;
pub mod transport;

pub use bot::{Bot, BoxedBot, Cleanup, Replies, is_addressed};
pub use config::{BotConfig, DEFAULT_CHANNEL};
pub use descriptor::{BOT_REGISTRY, BotDescriptor, BotFactory, BuildContext, descriptors, lookup};
pub use env::BotEnv;
pub use error::{
    BuildError, BuildResult, CleanupError, ResponseError, ResponseResult, TransportError,
    TransportResult,
};
pub use message::{ChannelId, Message, OutboundEvent};
pub use transport::{BoxedTransport, Connection, Inbox, Outbox, Transport};

#[doc(hidden)]
pub use linkme;
