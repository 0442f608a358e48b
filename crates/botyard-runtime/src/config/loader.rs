//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults, then anything passed to [`ConfigLoader::merge`]
//! 2. Profile-specific config file (`botyard.{profile}.toml`)
//! 3. Main config file (`botyard.toml` or `config.toml`)
//! 4. Environment variables (`BOTYARD_*`)
//! 5. `OPENAI_API_KEY`, stored as `credentials.openai_api_key`
//! 6. Programmatic overrides ([`ConfigLoader::set`])
//!
//! With the `yaml-config` feature, `botyard.yaml` / `botyard.yml` are searched
//! as well.
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `BOTYARD_` prefix with `__` as separator:
//!
//! - `BOTYARD_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `BOTYARD_RUNTIME__PLUGIN_DIR=/srv/bots` → `runtime.plugin_dir = "/srv/bots"`
//! - `BOTYARD_LLM__MODEL=gpt-4o` → `llm.model = "gpt-4o"`
//!
//! # Example
//!
//! ```rust,ignore
//! use botyard_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .set("runtime.plugin_dir", "/srv/bots")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::BotyardConfig;
use super::validation::validate_config;

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "BOTYARD_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Parses a profile name; `prod` and `dev` are accepted as aliases.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Reads the profile from `BOTYARD_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic base layered over the defaults.
    figment: Figment,
    /// Programmatic overrides applied after every other source.
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds the user config directory (`~/.config/botyard` on Linux).
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("botyard"))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Layers a whole configuration over the defaults. Files and the
    /// environment still take precedence.
    pub fn merge(mut self, config: BotyardConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Overrides a single dotted key after every other source.
    ///
    /// ```rust,ignore
    /// ConfigLoader::new().set("runtime.stop_grace_secs", 3)
    /// ```
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<BotyardConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: BotyardConfig = figment.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            plugin_dir = %config.runtime.plugin_dir.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(BotyardConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with BOTYARD_ prefix");
            figment = figment
                .merge(Env::prefixed("BOTYARD_").ignore(&["PROFILE"]).split("__"))
                .merge(
                    Env::raw()
                        .only(&["OPENAI_API_KEY"])
                        .map(|_| "credentials.openai_api_key".into()),
                );
        }

        Ok(figment.merge(self.overrides))
    }

    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: ext.to_string(),
            }),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("botyard"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Iterates `search_paths × base_names`, merging a profile-specific
    /// variant first, then the base file. Stops at the first base file found.
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    figment = merge_fn(figment, &base_path);
                    return (figment, true);
                }
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();

        let (mut figment, mut found) = self.load_format_files(
            figment,
            &search_paths,
            &["botyard.toml", "config.toml"],
            |fig, path| fig.merge(Toml::file(path)),
        );

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["botyard.yaml", "botyard.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads configuration from the current directory and the user config dir.
pub fn load_config() -> ConfigResult<BotyardConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from one file plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<BotyardConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use figment::Jail;

    use super::*;
    use crate::config::{LogLevel, WorkerSpans};

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap();
            assert_eq!(config.logging.level.as_str(), "info");
            assert_eq!(config.runtime.plugin_dir, PathBuf::from("bots"));
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_then_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "botyard.toml",
                r#"
                [runtime]
                plugin_dir = "from-file"
                stop_grace_secs = 4

                [logging]
                level = "debug"
                worker_spans = "lifecycle"
                "#,
            )?;
            jail.set_env("BOTYARD_RUNTIME__STOP_GRACE_SECS", "7");
            jail.set_env("BOTYARD_LLM__MODEL", "local-model");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .set("runtime.plugin_dir", "from-cli")
                .load()
                .unwrap();

            assert_eq!(config.runtime.plugin_dir, PathBuf::from("from-cli"));
            assert_eq!(config.runtime.stop_grace(), Duration::from_secs(7));
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.logging.worker_spans, WorkerSpans::Lifecycle);
            assert_eq!(config.llm.model, "local-model");
            Ok(())
        });
    }

    #[test]
    fn test_profile_file_is_layered_under_base() {
        Jail::expect_with(|jail| {
            jail.create_file("botyard.production.toml", "[llm]\nmodel = \"prod\"\ntimeout_secs = 5")?;
            jail.create_file("botyard.toml", "[llm]\ntimeout_secs = 30")?;
            jail.set_env(PROFILE_ENV, "prod");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap();
            assert_eq!(config.llm.model, "prod");
            assert_eq!(config.llm.timeout_secs, 30);
            Ok(())
        });
    }

    #[test]
    fn test_openai_key_maps_to_credentials() {
        Jail::expect_with(|jail| {
            jail.set_env("OPENAI_API_KEY", "sk-test");
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap();
            assert_eq!(config.credentials.get("openai_api_key"), Some("sk-test"));
            Ok(())
        });
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("botyard.ini", "level = debug")?;
            let err = ConfigLoader::new()
                .without_env()
                .file(jail.directory().join("botyard.ini"))
                .load()
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::UnsupportedFormat { ref extension, .. } if extension == "ini"
            ));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|jail| {
            let err = ConfigLoader::new()
                .without_env()
                .file(jail.directory().join("absent.toml"))
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::FileNotFound(_)));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("botyard.toml", "[logging]\nlevel = \"loud\"")?;
            let err = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::Extract(_)));

            let err = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .set("logging.level", "info")
                .set("runtime.stop_grace_secs", 0)
                .load()
                .unwrap_err();
            assert_eq!(err.key(), Some("runtime.stop_grace_secs"));
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }
}
