//! Unified error types for the Botyard core contracts.
//!
//! Runtime-level errors (discovery, lifecycle, configuration) live in
//! `botyard-runtime`; evaluator errors live in `botyard-calc`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur at the chat transport boundary.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for failure.
        reason: String,
    },

    /// The connection was closed by the other side.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// An outbound event could not be delivered.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The bot tried to use a channel the transport does not know.
    #[error("unknown channel '{channel}'")]
    UnknownChannel {
        /// The channel name.
        channel: String,
    },
}

impl TransportError {
    /// Creates a `ConnectionClosed` error with the given reason.
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Build Errors
// =============================================================================

/// Errors raised while a bot factory constructs an instance.
///
/// These are construction-time failures: a bot that cannot be built is
/// skipped by discovery and never reaches a worker.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    /// A required credential was not supplied in the [`BotEnv`](crate::BotEnv).
    #[error("missing required credential '{key}'")]
    MissingCredential {
        /// Credential key, e.g. `openai_api_key`.
        key: String,
    },

    /// The merged bot configuration is not valid.
    #[error("invalid bot configuration: {0}")]
    InvalidConfig(String),

    /// A shared settings section could not be deserialized.
    #[error("invalid settings in section '{section}': {reason}")]
    InvalidSettings {
        /// Section name, e.g. `llm`.
        section: String,
        /// Deserialization failure.
        reason: String,
    },
}

// =============================================================================
// Response Errors
// =============================================================================

/// Errors returned from [`Bot::generate_response`](crate::Bot::generate_response).
///
/// Every variant except the fatal ones is turned into a user-facing
/// diagnostic by the run loop; fatal ones stop the worker.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The language model call failed.
    #[error("language model request failed: {0}")]
    Llm(String),

    /// The inbound message could not be interpreted.
    #[error("invalid request: {0}")]
    InvalidInput(String),

    /// Emitting an interim or final event failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The bot itself can no longer operate.
    #[error("bot is unusable: {0}")]
    Unusable(String),
}

impl ResponseError {
    /// Returns `true` when the failure means the worker cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unusable(_) | Self::Transport(TransportError::ConnectionClosed { .. })
        )
    }
}

// =============================================================================
// Cleanup Errors
// =============================================================================

/// Errors returned from a bot's cleanup capability.
#[derive(Debug, Clone, Error)]
pub enum CleanupError {
    /// Releasing a resource failed.
    #[error("cleanup failed: {0}")]
    Failed(String),

    /// Closing a transport resource failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for bot construction.
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for response generation.
pub type ResponseResult<T> = Result<T, ResponseError>;
