use serde_json::Value;
use tracing::warn;

use crate::error::CommandError;
use crate::models::event::{CalendarEvent, ChangeRequest, EventRecord, ProposedEvent};
use crate::models::signal::ControlSignal;
use crate::service::approval_prompt::{Verdict, resolve};
use crate::service::calendar_service::fetch_window;
use crate::service::context::PlannerContext;
use crate::service::conversation::negotiate;
use crate::service::formatting::{prompt_timestamp, readable_time};
use crate::service::json_extractor::extract;
use crate::service::openai_service::ModelTier;
use crate::service::time_window::resolve_window;

pub const MAKE_TEMPERATURE: f32 = 1.0;

pub const NEW_EVENT_SHAPE: &str = "JSON objects with the keys summary, start_datetime, end_datetime, \
    description and reminder (int, minutes), in an array that can be parsed to create calendar events. \
    Use 1-2 emojis per complex sentence in the summary and description to make them more personal.";

/// Turns a free-text plan into new events.
pub async fn run(ctx: &PlannerContext, prompt: &str) -> Result<Vec<ChangeRequest>, CommandError> {
    let mut plan = prompt.trim().to_string();
    while plan.is_empty() {
        plan = ctx.ask("Please enter concrete events", None)?;
    }

    let window = resolve_window(ctx, &plan).await?;
    let existing = fetch_window(ctx, &window).await?;

    let request = make_prompt(ctx, &plan, &existing);
    let reply = negotiate(ctx, &request, ModelTier::Upgraded, MAKE_TEMPERATURE).await?;
    let records = extract(ctx, &reply).await;
    Ok(approve_new_events(ctx, records)?)
}

fn make_prompt(ctx: &PlannerContext, plan: &str, existing: &[CalendarEvent]) -> String {
    let now = ctx.now().fixed_offset();
    let existing_json = serde_json::to_string(existing).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Given the current date and time {now} (UTC offset {offset}) and the planning prompt '{plan}', \
         format the prompt's contents as {shape} \
         These events already exist in the calendar for that period; do not duplicate them: {existing}",
        now = prompt_timestamp(&now),
        offset = now.offset(),
        plan = plan,
        shape = NEW_EVENT_SHAPE,
        existing = existing_json,
    )
}

/// Reads new-event records, drops the unreadable ones and asks the human to
/// approve each; enter means yes.
pub fn approve_new_events(
    ctx: &PlannerContext,
    records: Vec<Value>,
) -> Result<Vec<ChangeRequest>, ControlSignal> {
    let proposals: Vec<EventRecord> = records
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ProposedEvent>(value) {
            Ok(proposed) => {
                let summary = proposed.summary.clone();
                let record = proposed.into_record(&ctx.timezone);
                if record.is_none() {
                    warn!(%summary, "dropping proposed event with unreadable start/end");
                    ctx.say(&format!("Skipping \"{}\": its start or end time could not be read.", summary));
                }
                record
            }
            Err(err) => {
                warn!(%err, "dropping malformed event record");
                None
            }
        })
        .collect();

    let approved = resolve(
        ctx,
        &proposals,
        |record| {
            format!(
                "Add event: {} ({} until {}) to calendar?",
                record.summary,
                readable_time(&record.start),
                record.end.format("%H:%M")
            )
        },
        Verdict::Approve,
    )?;
    Ok(approved.into_iter().map(ChangeRequest::Create).collect())
}
