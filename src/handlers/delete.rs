use serde_json::Value;
use tracing::warn;

use crate::error::CommandError;
use crate::models::event::{CalendarEvent, ChangeRequest};
use crate::service::approval_prompt::{Verdict, resolve};
use crate::service::calendar_service::fetch_window;
use crate::service::context::PlannerContext;
use crate::service::conversation::{DEFAULT_TEMPERATURE, negotiate};
use crate::service::formatting::prompt_timestamp;
use crate::service::json_extractor::extract;
use crate::service::openai_service::ModelTier;
use crate::service::time_window::resolve_window;

/// Finds the events the prompt wants gone. Every deletion defaults to "no".
pub async fn run(ctx: &PlannerContext, prompt: &str) -> Result<Vec<ChangeRequest>, CommandError> {
    let window = resolve_window(ctx, prompt).await?;
    let events = fetch_window(ctx, &window).await?;
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let request = delete_prompt(ctx, prompt, &events);
    let reply = negotiate(ctx, &request, ModelTier::Default, DEFAULT_TEMPERATURE).await?;
    let ids = read_ids(extract(ctx, &reply).await);

    let mut targets = Vec::with_capacity(ids.len());
    for id in ids {
        match ctx.calendar.get_event(&id).await {
            Ok(event) => targets.push(event),
            Err(err) => warn!(event_id = %id, %err, "skipping deletion of an unknown event"),
        }
    }

    let approved = resolve(
        ctx,
        &targets,
        |event: &CalendarEvent| {
            format!("You are about to delete event: {} from your calendar.", event.record.summary)
        },
        Verdict::Reject,
    )?;
    Ok(approved
        .into_iter()
        .map(|event| ChangeRequest::Delete {
            id: event.id,
            record: event.record,
        })
        .collect())
}

fn delete_prompt(ctx: &PlannerContext, prompt: &str, events: &[CalendarEvent]) -> String {
    let candidates: Vec<Value> = events.iter().map(CalendarEvent::without_details).collect();
    let candidates_json = serde_json::to_string(&candidates).unwrap_or_else(|_| "[]".to_string());
    format!(
        "From this query: \"{query} [sent {sent}]\", do as follows: \
         1. Identify the intent of the query. \
         2. Pick out the ids of any events from the JSON array below that the intent or query describes. \
         3. Make a JSON array of objects with a single key \"id\", one for each event to delete from step 2. \
         JSON Array: {events}.",
        query = prompt,
        sent = prompt_timestamp(&ctx.now().fixed_offset()),
        events = candidates_json,
    )
}

/// Accepts `{"id": ..}` objects as well as bare id strings, first
/// occurrence wins.
pub fn read_ids(records: Vec<Value>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for record in records {
        let id = match record {
            Value::String(id) => Some(id),
            Value::Object(map) => map.get("id").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}
