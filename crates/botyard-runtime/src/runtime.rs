//! Top-level orchestration: configuration, logging, discovery and the
//! lifecycle in one place.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use botyard_runtime::BotyardRuntime;
//!
//! let runtime = BotyardRuntime::builder()
//!     .profile("production")
//!     .plugin_dir("./bots")
//!     .build()?;
//! let report = runtime.run(Arc::new(MemoryHub::new())).await?;
//! ```

use std::future::Future;
use std::path::Path;

use tracing::{info, warn};

use crate::config::{BotyardConfig, ConfigLoader, ConfigResult};
use crate::error::RuntimeResult;
use crate::lifecycle::{LifecycleManager, LifecycleReport, wait_for_shutdown};
use crate::logging;
use crate::registry::{self, DiscoveryReport};
use botyard_core::{BotEnv, BoxedTransport};

/// Name of the settings section holding [`LlmConfig`](crate::config::LlmConfig).
pub const LLM_SECTION: &str = "llm";

/// Loaded configuration plus the operations that act on it.
pub struct BotyardRuntime {
    config: BotyardConfig,
}

impl BotyardRuntime {
    /// Creates a runtime from the configuration found in the current
    /// directory, falling back to defaults when it cannot be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .with_user_config_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                BotyardConfig::default()
            });

        Self::from_config(config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initializes logging.
    pub fn from_config(config: BotyardConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            plugin_dir = %config.runtime.plugin_dir.display(),
            "Runtime initialized from configuration"
        );

        Self { config }
    }

    pub fn config(&self) -> &BotyardConfig {
        &self.config
    }

    /// Builds the environment handed to every bot factory: all credentials
    /// plus the `llm` settings section.
    pub fn bot_env(&self) -> BotEnv {
        let mut env = BotEnv::new();
        for (key, value) in self.config.credentials.iter() {
            env = env.with_credential(key, value);
        }
        match serde_json::to_value(&self.config.llm) {
            Ok(section) => env = env.with_section(LLM_SECTION, section),
            Err(e) => warn!(error = %e, "Failed to serialize LLM settings, bots get defaults"),
        }
        env
    }

    /// Scans the configured plugin directory.
    pub fn discover(&self) -> RuntimeResult<DiscoveryReport> {
        self.discover_in(&self.config.runtime.plugin_dir)
    }

    /// Scans `dir` instead of the configured plugin directory.
    pub fn discover_in(&self, dir: &Path) -> RuntimeResult<DiscoveryReport> {
        Ok(registry::discover(dir, &self.bot_env())?)
    }

    /// Creates a lifecycle manager using the configured grace period.
    pub fn lifecycle(&self, transport: BoxedTransport) -> LifecycleManager {
        LifecycleManager::new(transport).with_stop_grace(self.config.runtime.stop_grace())
    }

    /// Discovers bots and runs them until Ctrl+C or SIGTERM.
    pub async fn run(&self, transport: BoxedTransport) -> RuntimeResult<LifecycleReport> {
        self.run_until(transport, wait_for_shutdown()).await
    }

    /// Discovers bots and runs them until `shutdown` completes.
    pub async fn run_until<F>(
        &self,
        transport: BoxedTransport,
        shutdown: F,
    ) -> RuntimeResult<LifecycleReport>
    where
        F: Future<Output = ()>,
    {
        let discovered = self.discover()?;
        if discovered.bots.is_empty() {
            warn!(
                plugin_dir = %self.config.runtime.plugin_dir.display(),
                "No bots were loaded"
            );
        }

        info!("Botyard is running. Press Ctrl+C to stop.");
        let report = self
            .lifecycle(transport)
            .run_until(discovered.bots, shutdown)
            .await;
        Ok(report)
    }
}

impl Default for BotyardRuntime {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`BotyardRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder searching the current and user config directories.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new()
                .with_current_dir()
                .with_user_config_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Overrides the plugin directory regardless of other sources.
    pub fn plugin_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config_loader = self
            .config_loader
            .set("runtime.plugin_dir", dir.as_ref());
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: BotyardConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> ConfigResult<BotyardRuntime> {
        let config = self.config_loader.load()?;
        Ok(BotyardRuntime::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;

    #[test]
    fn test_bot_env_carries_credentials_and_llm_section() {
        let mut config = BotyardConfig::default();
        config.credentials.insert("openai_api_key", "sk-test");
        config.llm.model = "local".into();
        let runtime = BotyardRuntime { config };

        let env = runtime.bot_env();
        assert_eq!(env.credential("openai_api_key").unwrap(), "sk-test");
        let llm: LlmConfig = env.section(LLM_SECTION).unwrap();
        assert_eq!(llm.model, "local");
        assert_eq!(llm.timeout_secs, 60);
    }
}
