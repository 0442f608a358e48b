//! Configuration for the Botyard runtime.
//!
//! Configuration is layered with figment (defaults, files, environment,
//! programmatic overrides) and checked by [`validate_config`] before use.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotyardConfig, Credentials, LlmConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    RuntimeConfig, WorkerSpans,
};
pub use validation::validate_config;
