//! Bot discovery.
//!
//! A plugin directory holds one TOML manifest per bot instance:
//!
//! ```toml
//! kind = "math"          # registered descriptor kind
//! enabled = true         # optional
//!
//! [config]               # optional BotConfig overrides
//! autojoin_channel = "numbers"
//! ```
//!
//! Manifests are visited in file-name order. Files whose name starts with
//! `_` are private and never loaded. A manifest that cannot be turned into a
//! bot is logged, recorded in [`DiscoveryReport::skipped`] and does not stop
//! the others.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Toml};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{DiscoveryError, RegistryError};
use crate::worker::panic_message;
use botyard_core::{BotDescriptor, BotEnv, BoxedBot, BuildContext};

/// Extension of manifest files.
pub const MANIFEST_EXTENSION: &str = "toml";

/// Prefix marking a manifest as private.
pub const PRIVATE_PREFIX: char = '_';

#[derive(Debug, Deserialize)]
struct BotManifest {
    kind: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    config: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

// =============================================================================
// Instances
// =============================================================================

/// Stable identity of a discovered bot: `<manifest-stem>#<index>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(String);

impl InstanceId {
    /// Builds the id for the `index`-th manifest of the directory.
    pub fn new(stem: &str, index: usize) -> Self {
        Self(format!("{stem}#{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A ready bot together with where it came from.
pub struct BotInstance {
    /// Stable identity.
    pub id: InstanceId,
    /// Descriptor kind that built it.
    pub kind: &'static str,
    /// The bot.
    pub bot: BoxedBot,
    /// Source manifest.
    pub path: PathBuf,
}

impl BotInstance {
    /// Creates an instance by hand, bypassing discovery.
    pub fn new(id: InstanceId, kind: &'static str, bot: BoxedBot, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            kind,
            bot,
            path: path.into(),
        }
    }

    /// Display name: `bot_name`, or the instance id when the name is empty.
    pub fn name(&self) -> String {
        let name = self.bot.config().bot_name.trim();
        if name.is_empty() {
            self.id.to_string()
        } else {
            name.to_string()
        }
    }
}

impl fmt::Debug for BotInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotInstance")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("bot_id", &self.bot.config().bot_id)
            .field("path", &self.path)
            .finish()
    }
}

/// Outcome of scanning a plugin directory.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Ready instances in enumeration order.
    pub bots: Vec<BotInstance>,
    /// Manifests that produced no bot, with the reason.
    pub skipped: Vec<DiscoveryError>,
    /// Manifests with `enabled = false`.
    pub disabled: Vec<PathBuf>,
}

// =============================================================================
// Discovery
// =============================================================================

/// Scans `dir` for bot manifests and instantiates every usable one.
///
/// Only an unreadable directory is an error; per-manifest failures are
/// reported in [`DiscoveryReport::skipped`].
pub fn discover(dir: &Path, env: &BotEnv) -> Result<DiscoveryReport, RegistryError> {
    let mut manifests = manifest_paths(dir)?;
    manifests.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(path = %dir.display(), count = manifests.len(), "Scanning plugin directory");

    let mut report = DiscoveryReport::default();
    for (index, path) in manifests.into_iter().enumerate() {
        match load_manifest(&path, env) {
            Ok(Some((descriptor, bot))) => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let instance = BotInstance::new(InstanceId::new(&stem, index), descriptor.kind, bot, path);
                info!(
                    instance = %instance.id,
                    kind = instance.kind,
                    bot = %instance.bot.config().bot_id,
                    "Loaded bot"
                );
                report.bots.push(instance);
            }
            Ok(None) => {
                info!(path = %path.display(), "Bot manifest disabled, skipping");
                report.disabled.push(path);
            }
            Err(e) => {
                warn!(path = %e.path().display(), error = %e, "Skipping bot manifest");
                report.skipped.push(e);
            }
        }
    }

    info!(
        loaded = report.bots.len(),
        skipped = report.skipped.len(),
        disabled = report.disabled.len(),
        "Discovery finished"
    );
    Ok(report)
}

/// Lists every registered bot kind, ordered by kind.
pub fn available_kinds() -> Vec<&'static BotDescriptor> {
    botyard_core::descriptors()
}

fn manifest_paths(dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    let entries = std::fs::read_dir(dir).map_err(|source| RegistryError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if is_candidate(&path) {
            paths.push(path);
        } else {
            debug!(path = %path.display(), "Not a bot manifest, ignoring");
        }
    }
    Ok(paths)
}

fn is_candidate(path: &Path) -> bool {
    let is_manifest = path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext == MANIFEST_EXTENSION);
    let is_private = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_none_or(|name| name.starts_with(PRIVATE_PREFIX));
    is_manifest && !is_private
}

fn load_manifest(
    path: &Path,
    env: &BotEnv,
) -> Result<Option<(&'static BotDescriptor, BoxedBot)>, DiscoveryError> {
    let load_error = |reason: String| DiscoveryError::Load {
        path: path.to_path_buf(),
        reason,
    };

    let source = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    let manifest: BotManifest = Figment::from(Toml::string(&source))
        .extract()
        .map_err(|e| load_error(e.to_string()))?;

    if !manifest.enabled {
        return Ok(None);
    }

    let kind = manifest
        .kind
        .filter(|kind| !kind.trim().is_empty())
        .ok_or_else(|| DiscoveryError::MissingKind {
            path: path.to_path_buf(),
        })?;

    let descriptor = match botyard_core::lookup(&kind).as_slice() {
        [] => {
            return Err(DiscoveryError::UnknownKind {
                path: path.to_path_buf(),
                kind,
            });
        }
        [descriptor] => *descriptor,
        many => {
            return Err(DiscoveryError::AmbiguousKind {
                path: path.to_path_buf(),
                kind,
                count: many.len(),
            });
        }
    };

    let ctx = BuildContext::new(&manifest.config, env);
    let built = std::panic::catch_unwind(AssertUnwindSafe(|| (descriptor.create)(&ctx)))
        .map_err(|payload| DiscoveryError::FactoryPanicked {
            path: path.to_path_buf(),
            reason: panic_message(payload.as_ref()),
        })?;
    let bot = built.map_err(|source| DiscoveryError::Build {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some((descriptor, bot)))
}
