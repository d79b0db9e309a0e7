use chrono::{DateTime, FixedOffset};

use super::make::{NEW_EVENT_SHAPE, approve_new_events};
use crate::error::CommandError;
use crate::models::event::{CalendarEvent, ChangeRequest};
use crate::service::calendar_service::fetch_window;
use crate::service::context::PlannerContext;
use crate::service::conversation::{DEFAULT_TEMPERATURE, negotiate};
use crate::service::formatting::prompt_timestamp;
use crate::service::json_extractor::extract;
use crate::service::openai_service::ModelTier;
use crate::service::time_window::{TimeWindow, resolve_window};

/// Plans new events into the gaps between the ones already in the window,
/// or after the last of them when no gap fits.
pub async fn run(ctx: &PlannerContext, prompt: &str) -> Result<Vec<ChangeRequest>, CommandError> {
    let window = resolve_window(ctx, prompt).await?;
    let existing = fetch_window(ctx, &window).await?;
    let gaps = free_slots(&existing, &window);

    let request = slot_prompt(ctx, prompt, &existing, &gaps);
    let reply = negotiate(ctx, &request, ModelTier::Default, DEFAULT_TEMPERATURE).await?;
    let records = extract(ctx, &reply).await;
    Ok(approve_new_events(ctx, records)?)
}

/// Uncovered stretches of `window`, in order. Overlapping events are merged.
pub fn free_slots(
    events: &[CalendarEvent],
    window: &TimeWindow,
) -> Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let mut busy: Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)> = events
        .iter()
        .map(|e| (e.record.start, e.record.end))
        .collect();
    busy.sort_by_key(|(start, _)| *start);

    let mut slots = Vec::new();
    let mut cursor = window.start;
    for (start, end) in busy {
        if start >= window.end {
            break;
        }
        if start > cursor {
            slots.push((cursor, start));
        }
        if end > cursor {
            cursor = end;
        }
    }
    if cursor < window.end {
        slots.push((cursor, window.end));
    }
    slots
}

fn slot_prompt(
    ctx: &PlannerContext,
    prompt: &str,
    existing: &[CalendarEvent],
    gaps: &[(DateTime<FixedOffset>, DateTime<FixedOffset>)],
) -> String {
    let plans = if existing.is_empty() {
        "no plans".to_string()
    } else {
        existing
            .iter()
            .map(|e| {
                format!(
                    "{}, starting at {}, ending at {}",
                    e.record.summary,
                    e.record.start.to_rfc3339(),
                    e.record.end.to_rfc3339()
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    let free = if gaps.is_empty() {
        "none".to_string()
    } else {
        gaps.iter()
            .map(|(start, end)| format!("{} to {}", start.to_rfc3339(), end.to_rfc3339()))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Given the current date and time {now}, the preexisting plans: {plans}, \
         the completely free time windows between them: {free}, and the planning prompt '{query}', do the following. \
         1. Identify the intent of the prompt. \
         2. Place the new events only inside the free time windows. If none fits, after the last preexisting plan is fine. \
         3. In detail, list your intended additions with respect to the prompt. \
         4. Make a new JSON array of just the additions, formatted as {shape}",
        now = prompt_timestamp(&ctx.now().fixed_offset()),
        plans = plans,
        free = free,
        query = prompt,
        shape = NEW_EVENT_SHAPE,
    )
}
