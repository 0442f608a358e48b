//! Shared implementation of the prompt-driven bots.
//!
//! Recipe, geography, health and website bots differ only in their
//! defaults, prompt and the wording of their answers, so each one is a
//! static [`Persona`] driving the same [`AssistantBot`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::llm::{LlmError, SharedModel, model_from_env};
use crate::text::{ensure_header, strip_token};
use botyard_core::{
    Bot, BotConfig, BoxedBot, BuildContext, BuildResult, Cleanup, CleanupError, Message, Replies,
    ResponseError, ResponseResult, is_addressed,
};

/// How the question is taken from an addressed message.
#[derive(Debug, Clone, Copy)]
pub enum QueryMode {
    /// The whole message content is the question.
    Content,
    /// The trigger is removed; an empty remainder gets `usage` back.
    AfterTrigger { usage: &'static str },
}

/// Everything that distinguishes one prompt-driven bot from another.
#[derive(Debug)]
pub struct Persona {
    pub bot_id: &'static str,
    pub bot_name: &'static str,
    pub bot_type: &'static str,
    pub trigger: &'static str,
    pub marker: &'static str,
    pub query: QueryMode,
    /// Interim message emitted before the model is called.
    pub acknowledgement: Option<&'static str>,
    pub header: &'static str,
    /// Inserted between the header and an answer that lacks it.
    pub separator: &'static str,
    pub prompt: fn(&str) -> String,
    pub failure: fn(&LlmError) -> String,
}

impl Persona {
    /// Default configuration before manifest overrides.
    pub fn defaults(&self) -> BotConfig {
        BotConfig::new(self.bot_id, self.bot_name, self.bot_type)
    }

    /// Builds a bot from a factory context; needs the OpenAI credential.
    pub fn build(&'static self, ctx: &BuildContext<'_>) -> BuildResult<BoxedBot> {
        let config = ctx.config(self.defaults())?;
        let model = model_from_env(ctx.env())?;
        Ok(std::sync::Arc::new(AssistantBot::new(self, config, model)))
    }
}

/// A bot that answers by prompting a language model.
pub struct AssistantBot {
    persona: &'static Persona,
    config: BotConfig,
    model: SharedModel,
    served: AtomicUsize,
    closed: AtomicBool,
}

impl AssistantBot {
    pub fn new(persona: &'static Persona, config: BotConfig, model: SharedModel) -> Self {
        Self {
            persona,
            config,
            model,
            served: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of model requests made so far.
    pub fn served(&self) -> usize {
        self.served.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Bot for AssistantBot {
    fn config(&self) -> &BotConfig {
        &self.config
    }

    fn should_respond_to(&self, message: &Message) -> bool {
        is_addressed(
            message,
            &self.config.bot_id,
            self.persona.trigger,
            Some(self.persona.marker),
        )
    }

    async fn generate_response(
        &self,
        message: &Message,
        replies: &Replies,
    ) -> ResponseResult<String> {
        if self.is_closed() {
            return Err(ResponseError::Unusable(format!(
                "{} has been shut down",
                self.config.bot_name
            )));
        }

        let question = match self.persona.query {
            QueryMode::Content => message.content.clone(),
            QueryMode::AfterTrigger { usage } => {
                let query = strip_token(&message.content, self.persona.trigger);
                if query.is_empty() {
                    return Ok(usage.to_string());
                }
                query
            }
        };

        if let Some(ack) = self.persona.acknowledgement {
            replies.acknowledge(ack).await?;
        }

        self.served.fetch_add(1, Ordering::Relaxed);
        debug!(bot = %self.config.bot_id, "Prompting language model");
        match self.model.complete(&(self.persona.prompt)(&question)).await {
            Ok(answer) => Ok(ensure_header(
                &answer,
                self.persona.header,
                self.persona.separator,
            )),
            Err(e) => {
                warn!(bot = %self.config.bot_id, error = %e, "Language model request failed");
                Ok((self.persona.failure)(&e))
            }
        }
    }

    fn suppression_marker(&self) -> Option<&str> {
        Some(self.persona.marker)
    }

    fn cleanup(&self) -> Option<&dyn Cleanup> {
        Some(self)
    }
}

#[async_trait]
impl Cleanup for AssistantBot {
    async fn cleanup(&self) -> Result<(), CleanupError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!(bot = %self.config.bot_id, "Already closed");
            return Ok(());
        }
        info!(
            bot = %self.config.bot_id,
            served = self.served(),
            "Closed language model session"
        );
        Ok(())
    }
}
