//! `@math`: statistics, sandboxed arithmetic and, when a model is
//! configured, explanations.
//!
//! Answers are built in three tiers:
//!
//! 1. Numbers plus a statistics keyword (`average`, `median`, `std`, ...)
//!    produce one bullet per requested statistic.
//! 2. Otherwise the question, minus lead-ins like "what is", is handed to
//!    [`botyard_calc::evaluate`]. Rejections other than parse failures are
//!    reported verbatim.
//! 3. Unparseable questions fall back to summing the numbers found, or to
//!    the language model when there are none.
//!
//! Asking "how", to "explain" or for "steps" appends a model-written
//! walkthrough to tiers 1 and 2.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::llm::{LlmError, SharedModel, optional_model_from_env};
use crate::stats;
use crate::text::{ensure_header, strip_token};
use botyard_calc::{EvalErrorKind, evaluate, format_number};
use botyard_core::{
    Bot, BotConfig, BoxedBot, BuildContext, BuildError, BuildResult, Message, Replies,
    ResponseResult, is_addressed, register_bot,
};

pub const TRIGGER: &str = "@math";
pub const MARKER: &str = "<!--mathcalcybot-->";
pub const HEADER: &str = "**MathCalcyBot Answer:**";

const NUMBER_PATTERN: &str = r"\d+(?:\.\d+)?";
const LEAD_INS: &[&str] = &[
    "what is",
    "what's",
    "calculate",
    "compute",
    "evaluate",
    "solve",
];
const EXPLAIN_WORDS: &[&str] = &["how", "explain", "step"];

/// Arithmetic and statistics bot.
pub struct MathBot {
    config: BotConfig,
    model: Option<SharedModel>,
    numbers: Regex,
}

impl MathBot {
    pub fn defaults() -> BotConfig {
        BotConfig::new("math", "Math Bot {id: math}", "math_bot")
    }

    /// Creates the bot; `model` is only needed for explanations and for
    /// questions the evaluator cannot read.
    pub fn new(config: BotConfig, model: Option<SharedModel>) -> BuildResult<Self> {
        let numbers =
            Regex::new(NUMBER_PATTERN).map_err(|e| BuildError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            config,
            model,
            numbers,
        })
    }

    fn create(ctx: &BuildContext<'_>) -> BuildResult<BoxedBot> {
        let config = ctx.config(Self::defaults())?;
        let model = optional_model_from_env(ctx.env())?;
        if model.is_none() {
            debug!(bot = %config.bot_id, "No language model configured, explanations disabled");
        }
        Ok(Arc::new(Self::new(config, model)?))
    }

    fn extract_numbers(&self, text: &str) -> Vec<f64> {
        self.numbers
            .find_iter(text)
            .filter_map(|m| m.as_str().parse().ok())
            .collect()
    }

    async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
        match &self.model {
            Some(model) => model.complete(prompt).await,
            None => Err(LlmError::Unconfigured),
        }
    }

    /// Appends a step-by-step explanation when the question asks for one.
    async fn with_explanation(&self, mut answer: String, lowered: &str, prompt: String) -> String {
        if !EXPLAIN_WORDS.iter().any(|w| lowered.contains(w)) {
            return answer;
        }
        match self.ask(&prompt).await {
            Ok(explanation) => {
                answer.push_str("\n\n**Step-by-step Explanation:**\n");
                answer.push_str(&explanation);
            }
            Err(e) => {
                warn!(bot = %self.config.bot_id, error = %e, "Explanation unavailable");
                answer.push_str(&format!("\n\n- (Could not generate explanation: {e})"));
            }
        }
        answer
    }

    async fn ask_assistant(&self, content: &str) -> String {
        let prompt = format!(
            "You are a helpful, advanced math assistant. \
             Always answer in markdown with a bold heading '{HEADER}' and bullet points for each step/result, each on a new line. \
             If the user asks for statistics (average, median, mode, min, max, product, range, std deviation), show step-by-step solutions. \
             If the user asks for unit conversion, show the conversion and the result. \
             If the user asks 'how' or for an explanation, provide a detailed, step-by-step answer. \
             \n\n{content}"
        );
        match self.ask(&prompt).await {
            Ok(answer) => ensure_header(&answer, HEADER, "\n- "),
            Err(e) => {
                warn!(bot = %self.config.bot_id, error = %e, "Language model request failed");
                format!(
                    "{HEADER}\n- ❌ Sorry, I couldn't process your math question. Error: {e}"
                )
            }
        }
    }
}

#[async_trait]
impl Bot for MathBot {
    fn config(&self) -> &BotConfig {
        &self.config
    }

    fn should_respond_to(&self, message: &Message) -> bool {
        is_addressed(message, &self.config.bot_id, TRIGGER, Some(MARKER))
    }

    async fn generate_response(
        &self,
        message: &Message,
        _replies: &Replies,
    ) -> ResponseResult<String> {
        let content = strip_token(&message.content, TRIGGER);
        let lowered = content.to_lowercase();
        let numbers = self.extract_numbers(&content);

        let stat_bullets = if numbers.is_empty() {
            Vec::new()
        } else {
            statistics(&lowered, &numbers)
        };
        if !stat_bullets.is_empty() {
            let prompt = calculation_prompt(&content);
            return Ok(self
                .with_explanation(answer(&stat_bullets), &lowered, prompt)
                .await);
        }

        let expression = expression_of(&content);
        match evaluate(&expression) {
            Ok(value) => {
                let bullets = [
                    format!("- The expression you provided: `{expression}`"),
                    format!("- The result is: {}", format_number(value)),
                ];
                let prompt = format!(
                    "You are a helpful math tutor. The user asked: '{content}'. \
                     Show a step-by-step solution for the expression `{expression}`."
                );
                Ok(self.with_explanation(answer(&bullets), &lowered, prompt).await)
            }
            Err(e) if e.kind() == EvalErrorKind::ParseFailure => {
                debug!(error = %e, "Not an expression");
                if numbers.is_empty() {
                    return Ok(self.ask_assistant(&content).await);
                }
                let listed: Vec<_> = numbers.iter().map(|n| format_number(*n)).collect();
                let bullets = [
                    format!("- The numbers you provided: {}", listed.join(", ")),
                    format!(
                        "- The sum of these numbers is: {}",
                        format_number(stats::sum(&numbers))
                    ),
                ];
                let prompt = calculation_prompt(&content);
                Ok(self.with_explanation(answer(&bullets), &lowered, prompt).await)
            }
            Err(e) => Ok(answer(&[format!("- ❌ {e}")])),
        }
    }

    fn suppression_marker(&self) -> Option<&str> {
        Some(MARKER)
    }
}

register_bot! {
    static MATH_BOT = {
        kind: "math",
        ty: MathBot,
        description: "Statistics and safe arithmetic, with optional explanations",
        create: MathBot::create,
    }
}

fn answer(bullets: &[String]) -> String {
    format!("{HEADER}\n{}", bullets.join("\n"))
}

fn calculation_prompt(content: &str) -> String {
    format!(
        "You are a helpful math tutor. The user asked: '{content}'. \
         Provide a step-by-step explanation for the calculation above, in markdown, with clear bullet points."
    )
}

/// One bullet per statistic named in `lowered`, in a fixed order.
fn statistics(lowered: &str, numbers: &[f64]) -> Vec<String> {
    let asks = |words: &[&str]| words.iter().any(|w| lowered.contains(w));
    let mut bullets = Vec::new();

    if asks(&["average", "mean"]) {
        bullets.push(format!("- The average is: {}", format_number(stats::mean(numbers))));
    }
    if asks(&["median"]) {
        bullets.push(format!("- The median is: {}", format_number(stats::median(numbers))));
    }
    if asks(&["mode"]) {
        bullets.push(format!("- The mode is: {}", format_number(stats::mode(numbers))));
    }
    if asks(&["sum", "add", "total"]) {
        bullets.push(format!("- The sum is: {}", format_number(stats::sum(numbers))));
    }
    if asks(&["min", "minimum"]) {
        bullets.push(format!("- The minimum is: {}", format_number(stats::min(numbers))));
    }
    if asks(&["max", "maximum"]) {
        bullets.push(format!("- The maximum is: {}", format_number(stats::max(numbers))));
    }
    if asks(&["product", "multiply"]) {
        bullets.push(format!("- The product is: {}", format_number(stats::product(numbers))));
    }
    if asks(&["range"]) {
        bullets.push(format!("- The range is: {}", format_number(stats::range(numbers))));
    }
    if asks(&["std", "standard deviation"]) {
        bullets.push(match stats::sample_std_dev(numbers) {
            Some(std) => format!("- The standard deviation is: {}", format_number(std)),
            None => "- Standard deviation requires at least two numbers.".to_string(),
        });
    }
    bullets
}

/// Strips conversational lead-ins and trailing `?`/`=` from a question.
fn expression_of(content: &str) -> String {
    let mut expr = content.trim();
    for lead in LEAD_INS {
        if expr.len() >= lead.len()
            && expr.is_char_boundary(lead.len())
            && expr[..lead.len()].eq_ignore_ascii_case(lead)
        {
            expr = expr[lead.len()..].trim_start();
            break;
        }
    }
    expr.trim_end_matches(|c: char| c == '?' || c == '=' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_of_strips_lead_ins() {
        assert_eq!(expression_of("What is 2 + 3 * 4?"), "2 + 3 * 4");
        assert_eq!(expression_of("calculate sqrt(16) ="), "sqrt(16)");
        assert_eq!(expression_of("  (1 + 2) ^ 2 "), "(1 + 2) ^ 2");
    }

    #[test]
    fn test_statistics_in_fixed_order() {
        let bullets = statistics("max and average please", &[2.0, 4.0, 6.0]);
        assert_eq!(bullets, ["- The average is: 4.0", "- The maximum is: 6.0"]);
    }

    #[test]
    fn test_statistics_std_needs_two_values() {
        let bullets = statistics("std of 5", &[5.0]);
        assert_eq!(bullets, ["- Standard deviation requires at least two numbers."]);
    }

    #[test]
    fn test_no_keyword_no_statistics() {
        assert!(statistics("2 + 2", &[2.0, 2.0]).is_empty());
    }

    #[test]
    fn test_extract_numbers() {
        let bot = MathBot::new(MathBot::defaults(), None).unwrap();
        assert_eq!(bot.extract_numbers("2, 4.5 and 10"), [2.0, 4.5, 10.0]);
        assert!(bot.extract_numbers("no digits").is_empty());
    }
}
