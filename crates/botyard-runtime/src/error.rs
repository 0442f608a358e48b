//! Runtime error types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use botyard_core::{BuildError, CleanupError};

// =============================================================================
// Discovery
// =============================================================================

/// Why a single bot manifest produced no bot.
///
/// These are recovered locally: discovery records them and moves on.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The manifest could not be read or parsed.
    #[error("failed to load manifest {}: {reason}", path.display())]
    Load {
        /// Manifest path.
        path: PathBuf,
        /// Parse or read failure.
        reason: String,
    },

    /// The manifest does not name a bot kind.
    #[error("manifest {} does not declare a `kind`", path.display())]
    MissingKind {
        /// Manifest path.
        path: PathBuf,
    },

    /// No linked crate registers the requested kind.
    #[error("manifest {} requests unknown bot kind '{kind}'", path.display())]
    UnknownKind {
        /// Manifest path.
        path: PathBuf,
        /// Requested kind.
        kind: String,
    },

    /// More than one descriptor registers the requested kind.
    #[error("manifest {} requests bot kind '{kind}', which is registered {count} times", path.display())]
    AmbiguousKind {
        /// Manifest path.
        path: PathBuf,
        /// Requested kind.
        kind: String,
        /// Number of registrations.
        count: usize,
    },

    /// The bot factory refused to build an instance.
    #[error("failed to build bot from {}: {source}", path.display())]
    Build {
        /// Manifest path.
        path: PathBuf,
        /// Factory failure.
        #[source]
        source: BuildError,
    },

    /// The bot factory panicked.
    #[error("bot factory for {} panicked: {reason}", path.display())]
    FactoryPanicked {
        /// Manifest path.
        path: PathBuf,
        /// Panic message.
        reason: String,
    },
}

impl DiscoveryError {
    /// Returns the manifest path the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Load { path, .. }
            | Self::MissingKind { path }
            | Self::UnknownKind { path, .. }
            | Self::AmbiguousKind { path, .. }
            | Self::Build { path, .. }
            | Self::FactoryPanicked { path, .. } => path,
        }
    }
}

/// Fatal discovery failure: the plugin directory itself is unusable.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The plugin directory could not be read.
    #[error("failed to read plugin directory {}: {source}", path.display())]
    ReadDir {
        /// Directory path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Per-worker failures, isolated from every other worker.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The worker stopped on its own because of an unrecoverable failure.
    #[error("worker crashed: {reason}")]
    Crashed {
        /// What went wrong.
        reason: String,
    },

    /// The bot's cleanup capability returned an error.
    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    /// The bot's cleanup capability panicked.
    #[error("cleanup panicked: {reason}")]
    CleanupPanicked {
        /// Panic payload, if it was a string.
        reason: String,
    },

    /// The worker did not stop within the grace period and was aborted.
    #[error("worker did not stop within {grace:?}")]
    StopTimedOut {
        /// Grace period that elapsed.
        grace: Duration,
    },
}

// =============================================================================
// Runtime
// =============================================================================

/// Errors surfaced by [`BotyardRuntime`](crate::BotyardRuntime).
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The plugin directory could not be scanned.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
