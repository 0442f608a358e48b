//! `@website`: summarised answers to search queries.

use crate::assistant::{Persona, QueryMode};
use crate::llm::LlmError;
use botyard_core::{BoxedBot, BuildContext, BuildResult, register_bot};

pub static PERSONA: Persona = Persona {
    bot_id: "website",
    bot_name: "Website Search Bot {id: website}",
    bot_type: "website_search_bot",
    trigger: "@website",
    marker: "<!--websitesearchbot-->",
    query: QueryMode::AfterTrigger {
        usage: "Please provide a search query after @website.",
    },
    acknowledgement: None,
    header: "**WebsiteSearchBot Answer:**",
    separator: "\n- ",
    prompt,
    failure,
};

fn prompt(query: &str) -> String {
    format!(
        "You are a helpful web search assistant. \
         Format your response in markdown with a bold heading '**WebsiteSearchBot Answer:**' \
         and use bullet points for clarity. \
         When providing search results:\
         \n- Summarize the key information\
         \n- Include relevant facts and details\
         \n- Keep the response concise and informative\
         \n- Use proper formatting for readability\
         \n\nSearch query: {query}"
    )
}

fn failure(error: &LlmError) -> String {
    format!(
        "**WebsiteSearchBot Error:** Sorry, I couldn't process your search request. Error: {error}"
    )
}

fn create(ctx: &BuildContext<'_>) -> BuildResult<BoxedBot> {
    PERSONA.build(ctx)
}

register_bot! {
    static WEBSITE_BOT = {
        kind: "website",
        ty: AssistantBot,
        description: "Search-style summaries on any topic",
        create: create,
    }
}
