//! # Botyard
//!
//! Hosts a directory of chat bots. Each bot runs in its own worker with its
//! own connection; a failure in one never reaches the others, and Ctrl+C or
//! SIGTERM stops every bot in order with its cleanup called exactly once.
//!
//! ## Architecture
//!
//! ```text
//! bots/*.toml ──▶ discover ──▶ BotInstance ──▶ worker ──▶ Transport
//!                    │                           │
//!               BOT_REGISTRY              should_respond_to
//!              (linked kinds)             generate_response
//! ```
//!
//! - **Core**: the [`Bot`](core::Bot) contract and registration
//! - **Runtime**: configuration, logging, discovery and lifecycle
//! - **Transport**: the in-process [`MemoryHub`](transport::MemoryHub)
//! - **Bots**: the built-in `math`, `recipe`, `geography`, `health` and
//!   `website` kinds
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use botyard::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BotyardRuntime::builder().plugin_dir("./bots").build()?;
//!     let report = runtime.run(Arc::new(MemoryHub::new())).await?;
//!     print!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `yaml-config`: also read `botyard.yaml`
//! - `json-log`: enable JSON log output

pub use botyard_bots as bots;
pub use botyard_calc as calc;
pub use botyard_core as core;
pub use botyard_runtime as runtime;
pub use botyard_transport as transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use std::sync::Arc;

    pub use botyard_core::{
        Bot, BotConfig, BotEnv, BoxedBot, BuildContext, BuildResult, Cleanup, Message, Replies,
        ResponseError, ResponseResult, register_bot,
    };
    pub use botyard_runtime::{BotOutcome, BotyardRuntime, LifecycleReport};
    pub use botyard_transport::MemoryHub;
}
