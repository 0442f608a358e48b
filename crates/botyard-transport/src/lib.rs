//! Botyard Transport - chat transports for the Botyard bot host.
//!
//! This crate provides:
//! - [`MemoryHub`]: an in-process chat server implementing
//!   [`Transport`](botyard_core::Transport)
//! - [`console`]: helpers that bridge a hub to stdin/stdout
//!
//! Network protocol framing is out of scope; a networked transport
//! implements the same [`Transport`](botyard_core::Transport) trait.

pub mod console;
pub mod hub;

pub use hub::{Emission, MemoryHub};
