//! `@health`: general health information, always with a disclaimer.

use crate::assistant::{Persona, QueryMode};
use crate::llm::LlmError;
use botyard_core::{BoxedBot, BuildContext, BuildResult, register_bot};

pub static PERSONA: Persona = Persona {
    bot_id: "health",
    bot_name: "Health Bot {id: health}",
    bot_type: "health_bot",
    trigger: "@health",
    marker: "<!--healthbot-->",
    query: QueryMode::Content,
    acknowledgement: None,
    header: "**HealthBot Answer:**",
    separator: "\n- ",
    prompt,
    failure,
};

fn prompt(question: &str) -> String {
    format!(
        "You are a helpful health information assistant. \
         IMPORTANT: Always include a medical disclaimer. \
         Format your response in markdown with a bold heading '**HealthBot Answer:**' \
         and use bullet points for clarity. \
         Always emphasize that you are providing general information and not medical advice. \
         If the question is about specific symptoms or conditions, recommend consulting a healthcare professional. \
         For emergency situations, always advise seeking immediate medical attention. \
         Keep responses factual, evidence-based, and focused on general health information. \
         \n\nUser question: {question}"
    )
}

fn failure(error: &LlmError) -> String {
    format!(
        "**HealthBot Answer:**\n- ❌ Sorry, I couldn't process your health question. Error: {error}"
    )
}

fn create(ctx: &BuildContext<'_>) -> BuildResult<BoxedBot> {
    PERSONA.build(ctx)
}

register_bot! {
    static HEALTH_BOT = {
        kind: "health",
        ty: AssistantBot,
        description: "General health and wellness information",
        create: create,
    }
}
