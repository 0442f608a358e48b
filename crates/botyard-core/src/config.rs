//! Per-bot configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BuildError, BuildResult};

/// Channel every bot joins unless told otherwise.
pub const DEFAULT_CHANNEL: &str = "general";

/// Configuration of one bot instance.
///
/// Built once from the bot's defaults merged with manifest overrides and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Short identifier, also used for tag-based addressing.
    pub bot_id: String,

    /// Human-readable name used in status lines and error prefixes.
    pub bot_name: String,

    /// Flavor identifier, e.g. `math_bot`.
    pub bot_type: String,

    /// Channel joined when the worker starts.
    #[serde(default = "default_channel")]
    pub autojoin_channel: String,

    /// Any additional keys supplied by the manifest.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

impl BotConfig {
    /// Creates a configuration joining [`DEFAULT_CHANNEL`].
    pub fn new(
        bot_id: impl Into<String>,
        bot_name: impl Into<String>,
        bot_type: impl Into<String>,
    ) -> Self {
        Self {
            bot_id: bot_id.into(),
            bot_name: bot_name.into(),
            bot_type: bot_type.into(),
            autojoin_channel: default_channel(),
            extra: BTreeMap::new(),
        }
    }

    /// Merges `overrides` over `self` key by key; the override wins.
    ///
    /// The result is validated, so an override that blanks out `bot_id`
    /// is rejected here rather than at routing time.
    pub fn merged(self, overrides: &Map<String, Value>) -> BuildResult<Self> {
        let mut base = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(BuildError::InvalidConfig(format!(
                    "expected a table, found {other}"
                )));
            }
            Err(e) => return Err(BuildError::InvalidConfig(e.to_string())),
        };

        for (key, value) in overrides {
            base.insert(key.clone(), value.clone());
        }

        let merged: Self = serde_json::from_value(Value::Object(base))
            .map_err(|e| BuildError::InvalidConfig(e.to_string()))?;
        merged.validate()?;
        Ok(merged)
    }

    /// Checks the identifying fields.
    pub fn validate(&self) -> BuildResult<()> {
        if self.bot_id.trim().is_empty() {
            return Err(BuildError::InvalidConfig("bot_id must not be empty".into()));
        }
        if self.bot_id.chars().any(char::is_whitespace) {
            return Err(BuildError::InvalidConfig(format!(
                "bot_id '{}' must not contain whitespace",
                self.bot_id
            )));
        }
        if self.autojoin_channel.trim().is_empty() {
            return Err(BuildError::InvalidConfig(
                "autojoin_channel must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Returns an extra key, if present.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}
