//! Botyard Runtime - discovery and lifecycle for hosted chat bots.
//!
//! This crate provides:
//! - [`registry`]: turns a directory of bot manifests into ready
//!   [`BotInstance`]s
//! - [`lifecycle`]: runs one worker per bot and shuts them all down in order
//!   on Ctrl+C / SIGTERM
//! - [`config`]: layered configuration with figment
//! - [`logging`]: `tracing-subscriber` setup driven by configuration
//! - [`BotyardRuntime`]: the four above wired together
//!
//! # Feature Flags
//!
//! - `yaml-config`: also search `botyard.yaml` / `botyard.yml`
//! - `json-log`: enable `format = "json"` logging

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod registry;
pub mod runtime;
mod worker;

pub use config::{BotyardConfig, ConfigError, ConfigLoader, ConfigResult};
pub use error::{DiscoveryError, LifecycleError, RegistryError, RuntimeError, RuntimeResult};
pub use lifecycle::{
    BotOutcome, BotReport, LifecycleManager, LifecycleReport, RunningBots, WorkerSnapshot,
    wait_for_shutdown,
};
pub use logging::LoggingBuilder;
pub use registry::{BotInstance, DiscoveryReport, InstanceId, available_kinds, discover};
pub use runtime::{BotyardRuntime, RuntimeBuilder};
pub use worker::WorkerState;

// Re-export tracing for downstream crates
pub use tracing;
pub use tracing_subscriber;
