//! `@recipe`: recipes from a professional-chef prompt.

use crate::assistant::{Persona, QueryMode};
use crate::llm::LlmError;
use botyard_core::{BoxedBot, BuildContext, BuildResult, register_bot};

pub static PERSONA: Persona = Persona {
    bot_id: "recipe",
    bot_name: "Food Recipe Bot {id: recipe}",
    bot_type: "recipe_bot",
    trigger: "@recipe",
    marker: "<!--recipebot-->",
    query: QueryMode::AfterTrigger {
        usage: "Please provide a recipe request after @recipe. For example: '@recipe how to make butter chicken'",
    },
    acknowledgement: Some("🍳 Working on your recipe request..."),
    header: "**FoodRecipeBot Answer:**",
    separator: "\n",
    prompt,
    failure,
};

fn prompt(query: &str) -> String {
    format!(
        "You are a professional chef and cooking expert. \
         Provide a detailed recipe in response to the user's request. \
         Format your response in markdown with a bold heading '**FoodRecipeBot Answer:**' \
         and use clear sections for the recipe. \
         Always include:\
         \n1. Dish Name and Brief Description\
         \n2. Preparation Time and Cooking Time\
         \n3. Servings\
         \n4. Ingredients (with precise measurements)\
         \n5. Step-by-step Instructions\
         \n6. Tips and Notes\
         \n7. Any cultural context or variations\
         \n\nMake sure the recipe is authentic and practical. \
         If the request is vague, provide a popular recipe from the mentioned cuisine. \
         \n\nUser request: {query}"
    )
}

fn failure(error: &LlmError) -> String {
    format!(
        "**FoodRecipeBot Error:** Sorry, I couldn't process your recipe request. Error: {error}"
    )
}

fn create(ctx: &BuildContext<'_>) -> BuildResult<BoxedBot> {
    PERSONA.build(ctx)
}

register_bot! {
    static RECIPE_BOT = {
        kind: "recipe",
        ty: AssistantBot,
        description: "Detailed recipes from any cuisine",
        create: create,
    }
}
