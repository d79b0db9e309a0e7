//! Best-effort recovery of a JSON array of records from free-form model text.
//!
//! Two stages only: the span from the first `{` to the last `}` is wrapped in
//! brackets and parsed; if that fails the model is asked once to repair it and
//! the span from the first `[` to the last `]` of its answer is parsed. Any
//! further failure yields an empty batch.

use serde_json::Value;
use tracing::{debug, warn};

use super::context::PlannerContext;
use super::conversation::complete_with_retry;
use super::openai_service::ModelTier;
use crate::models::transcript::Transcript;

pub const REPAIR_TEMPERATURE: f32 = 0.05;

pub async fn extract(ctx: &PlannerContext, text: &str) -> Vec<Value> {
    ctx.say("Trying to load JSON from the model reply.");

    let candidate = wrap_object_span(text);
    let error = match parse_array(&candidate) {
        Ok(records) => {
            ctx.say("Loading JSON succeeded!");
            return records;
        }
        Err(error) => error,
    };

    ctx.say("Invalid JSON, trying to fix...");
    warn!(%error, "model reply did not contain a parsable array");
    let request = repair_prompt(&candidate, &error);
    ctx.say(&format!("User:\n{}", request));
    let transcript = Transcript::starting_with(request);
    let reply = complete_with_retry(ctx, &transcript, ModelTier::Default, REPAIR_TEMPERATURE).await;
    ctx.say(&format!("Bot response:\n{}", reply));

    match bracket_span(&reply).map(parse_array) {
        Some(Ok(records)) => {
            ctx.say("Loading JSON succeeded!");
            records
        }
        Some(Err(error)) => {
            debug!(%error, "repaired reply still unparsable");
            ctx.say("Failed to get a valid response from the model.\n");
            Vec::new()
        }
        None => {
            ctx.say("Failed to get a valid response from the model.\n");
            Vec::new()
        }
    }
}

/// `[` + first `{` .. last `}` + `]`. Text without such a span gives an
/// empty candidate, which never parses.
pub fn wrap_object_span(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => format!("[{}]", &text[start..=end]),
        _ => String::new(),
    }
}

pub fn bracket_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

fn parse_array(candidate: &str) -> Result<Vec<Value>, String> {
    if candidate.trim().is_empty() {
        return Err("no JSON object found in the text".to_string());
    }
    serde_json::from_str::<Vec<Value>>(candidate).map_err(|e| e.to_string())
}

fn repair_prompt(candidate: &str, error: &str) -> String {
    format!(
        "This JSON array {}\n\ngives this error:\n{}\nplease fix it and answer with the corrected JSON array.",
        candidate, error
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_object_span_ignores_surrounding_prose() {
        let text = "Sure! Here you go:\n```json\n[{\"a\": 1}, {\"b\": [2]}]\n```\nAnything else?";
        assert_eq!(wrap_object_span(text), "[{\"a\": 1}, {\"b\": [2]}]");
    }

    #[test]
    fn wrap_object_span_without_braces_is_empty() {
        assert_eq!(wrap_object_span("no json here"), "");
        assert_eq!(wrap_object_span("} backwards {"), "");
    }

    #[test]
    fn bracket_span_takes_outermost_brackets() {
        assert_eq!(bracket_span("fixed: [[1], [2]] done"), Some("[[1], [2]]"));
        assert_eq!(bracket_span("nothing"), None);
    }

    #[test]
    fn parse_array_rejects_empty_candidate() {
        assert!(parse_array("").is_err());
        assert_eq!(parse_array("[{\"x\":1}]").unwrap().len(), 1);
    }
}
