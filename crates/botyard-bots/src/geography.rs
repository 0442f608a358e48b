//! `@geography`: places, features and facts about the world.

use crate::assistant::{Persona, QueryMode};
use crate::llm::LlmError;
use botyard_core::{BoxedBot, BuildContext, BuildResult, register_bot};

pub static PERSONA: Persona = Persona {
    bot_id: "geography",
    bot_name: "Geography Bot {id: geography}",
    bot_type: "geography_bot",
    trigger: "@geography",
    marker: "<!--geographybot-->",
    query: QueryMode::Content,
    acknowledgement: None,
    header: "**GeographyBot Answer:**",
    separator: "\n- ",
    prompt,
    failure,
};

fn prompt(question: &str) -> String {
    format!(
        "You are a knowledgeable geography assistant. \
         Format your response in markdown with a bold heading '**GeographyBot Answer:**' \
         and use bullet points for clarity. \
         When providing geographical information:\
         \n- Include precise coordinates when relevant\
         \n- Mention relevant geographical features\
         \n- Provide population and area data when available\
         \n- Include interesting geographical facts\
         \n- Mention neighboring countries/regions when relevant\
         \n- Include climate and timezone information when appropriate\
         \n- Use proper geographical terminology\
         \n\nUser question: {question}"
    )
}

fn failure(error: &LlmError) -> String {
    format!(
        "**GeographyBot Answer:**\n- ❌ Sorry, I couldn't process your geography question. Error: {error}"
    )
}

fn create(ctx: &BuildContext<'_>) -> BuildResult<BoxedBot> {
    PERSONA.build(ctx)
}

register_bot! {
    static GEOGRAPHY_BOT = {
        kind: "geography",
        ty: AssistantBot,
        description: "Countries, cities, landmarks and physical geography",
        create: create,
    }
}
