//! # Botyard Bots
//!
//! The built-in bot kinds. Linking this crate registers all of them:
//!
//! | kind        | trigger      | needs `openai_api_key` |
//! |-------------|--------------|------------------------|
//! | `math`      | `@math`      | only for explanations  |
//! | `recipe`    | `@recipe`    | yes                    |
//! | `geography` | `@geography` | yes                    |
//! | `health`    | `@health`    | yes                    |
//! | `website`   | `@website`   | yes                    |
//!
//! Every bot answers when its trigger appears in a message (any case) or
//! when the message is tagged with its `bot_id`, and ignores messages that
//! carry its own suppression marker.

pub mod assistant;
pub mod geography;
pub mod health;
pub mod llm;
pub mod math;
pub mod recipe;
pub mod stats;
mod text;
pub mod website;

pub use assistant::{AssistantBot, Persona, QueryMode};
pub use llm::{LanguageModel, LlmError, LlmSettings, OpenAiClient, SharedModel};
pub use math::MathBot;

/// Kinds registered by this crate.
pub const KINDS: [&str; 5] = ["geography", "health", "math", "recipe", "website"];
