use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use super::edit::{read_revisions, review_revisions};
use crate::error::CommandError;
use crate::models::event::{CalendarEvent, ChangeRequest, RevisedEvent, mark_completed};
use crate::service::calendar_service::fetch_window;
use crate::service::context::PlannerContext;
use crate::service::conversation::{DEFAULT_TEMPERATURE, negotiate};
use crate::service::formatting::prompt_timestamp;
use crate::service::json_extractor::extract;
use crate::service::openai_service::ModelTier;
use crate::service::time_window::resolve_window;

/// Marks the events the prompt talks about as done by prefixing ✅ to their
/// summary. Descriptions and reminders are never shown to the model and are
/// carried over from the calendar untouched.
pub async fn run(ctx: &PlannerContext, prompt: &str) -> Result<Vec<ChangeRequest>, CommandError> {
    let window = resolve_window(ctx, prompt).await?;
    let events = fetch_window(ctx, &window).await?;
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let request = complete_prompt(ctx, prompt, &events);
    let reply = negotiate(ctx, &request, ModelTier::Default, DEFAULT_TEMPERATURE).await?;
    let revisions = completion_revisions(read_revisions(extract(ctx, &reply).await), &events);
    review_revisions(ctx, revisions).await
}

fn complete_prompt(ctx: &PlannerContext, prompt: &str, events: &[CalendarEvent]) -> String {
    let candidates: Vec<Value> = events.iter().map(CalendarEvent::without_details).collect();
    let candidates_json = serde_json::to_string(&candidates).unwrap_or_else(|_| "[]".to_string());
    format!(
        "From this query: \"{query} [sent {sent}]\", do as follows: \
         1. Pick out the titles/summaries of any events from the JSON array below that the query says are done. \
         2. Make a new JSON array of just those events, keeping their \"id\", with a green checkmark emoji (✅) \
         prepended to the far left of the summary without removing any other emojis. \
         Escape any characters with special meaning in JSON. JSON Array: {events}.",
        query = prompt,
        sent = prompt_timestamp(&ctx.now().fixed_offset()),
        events = candidates_json,
    )
}

/// Rebuilds each picked event from the calendar copy: checkmarked summary,
/// original description and reminders, times untouched. Ids the model made
/// up are dropped.
pub fn completion_revisions(picked: Vec<RevisedEvent>, events: &[CalendarEvent]) -> Vec<RevisedEvent> {
    let by_id: HashMap<&str, &CalendarEvent> = events.iter().map(|e| (e.id.as_str(), e)).collect();
    picked
        .into_iter()
        .filter_map(|revision| {
            let Some(original) = by_id.get(revision.id.as_str()) else {
                warn!(event_id = %revision.id, "model picked an event outside the window");
                return None;
            };
            Some(RevisedEvent {
                id: revision.id,
                summary: Some(mark_completed(&original.record.summary)),
                description: Some(original.record.description.clone()),
                reminders: original
                    .record
                    .reminders
                    .as_ref()
                    .and_then(|r| serde_json::to_value(r).ok()),
                start: None,
                end: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventRecord, Reminders, parse_timestamp};
    use chrono_tz::Europe::Copenhagen;

    fn event(id: &str, summary: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            record: EventRecord {
                summary: summary.to_string(),
                description: "keep me".to_string(),
                start: parse_timestamp("2026-10-17T09:00:00+02:00", &Copenhagen).unwrap(),
                end: parse_timestamp("2026-10-17T10:00:00+02:00", &Copenhagen).unwrap(),
                reminders: Some(Reminders::popup(Some(30))),
            },
        }
    }

    #[test]
    fn completion_restores_hidden_fields_and_marks_summary() {
        let events = vec![event("e1", "Gym 💪"), event("e2", "Laundry")];
        let picked = vec![
            RevisedEvent {
                id: "e1".to_string(),
                summary: Some("✅ Gym".to_string()),
                ..Default::default()
            },
            RevisedEvent {
                id: "ghost".to_string(),
                ..Default::default()
            },
        ];
        let revisions = completion_revisions(picked, &events);
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].summary.as_deref(), Some("✅Gym 💪"));
        assert_eq!(revisions[0].description.as_deref(), Some("keep me"));
        assert!(revisions[0].reminders.is_some());
    }
}
