//! Explicit environment handed to bot factories.
//!
//! Bots never read process environment variables themselves. The runtime
//! resolves credentials and shared settings sections once, at startup, and
//! passes them to each factory through a [`BotEnv`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BuildError, BuildResult};

/// Credentials and shared settings sections available to bot factories.
#[derive(Clone, Default)]
pub struct BotEnv {
    credentials: BTreeMap<String, String>,
    sections: BTreeMap<String, Value>,
}

impl BotEnv {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential.
    pub fn with_credential(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.credentials.insert(key.into(), value.into());
        self
    }

    /// Adds a raw settings section.
    pub fn with_section(mut self, name: impl Into<String>, value: Value) -> Self {
        self.sections.insert(name.into(), value);
        self
    }

    /// Returns a required credential; an empty value counts as missing.
    pub fn credential(&self, key: &str) -> BuildResult<&str> {
        self.optional_credential(key)
            .ok_or_else(|| BuildError::MissingCredential {
                key: key.to_string(),
            })
    }

    /// Returns a credential if present and non-empty.
    pub fn optional_credential(&self, key: &str) -> Option<&str> {
        self.credentials
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Deserializes a settings section, falling back to `T::default()`
    /// when the section is absent.
    pub fn section<T>(&self, name: &str) -> BuildResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.sections.get(name) {
            None => Ok(T::default()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| BuildError::InvalidSettings {
                    section: name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl fmt::Debug for BotEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotEnv")
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .field("sections", &self.sections.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Llm {
        model: String,
        temperature: f32,
    }

    #[test]
    fn test_missing_credential() {
        let env = BotEnv::new();
        let err = env.credential("openai_api_key").unwrap_err();
        assert!(matches!(err, BuildError::MissingCredential { key } if key == "openai_api_key"));
    }

    #[test]
    fn test_empty_credential_counts_as_missing() {
        let env = BotEnv::new().with_credential("openai_api_key", "  ");
        assert!(env.credential("openai_api_key").is_err());
        assert_eq!(env.optional_credential("openai_api_key"), None);
    }

    #[test]
    fn test_section_defaults_when_absent() {
        let env = BotEnv::new();
        assert_eq!(env.section::<Llm>("llm").unwrap(), Llm::default());
    }

    #[test]
    fn test_section_deserializes() {
        let env = BotEnv::new().with_section("llm", json!({ "model": "gpt-4-turbo" }));
        let llm: Llm = env.section("llm").unwrap();
        assert_eq!(llm.model, "gpt-4-turbo");
    }

    #[test]
    fn test_invalid_section() {
        let env = BotEnv::new().with_section("llm", json!({ "temperature": "hot" }));
        assert!(matches!(
            env.section::<Llm>("llm"),
            Err(BuildError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let env = BotEnv::new().with_credential("openai_api_key", "sk-secret");
        let rendered = format!("{env:?}");
        assert!(rendered.contains("openai_api_key"));
        assert!(!rendered.contains("sk-secret"));
    }
}
