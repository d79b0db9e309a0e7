use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::warn;

use crate::error::CommandError;
use crate::models::event::{
    CalendarEvent, ChangeRequest, EventRecord, Reminders, RevisedEvent, is_falsy, timestamp_from_value,
};
use crate::service::approval_prompt::{Verdict, resolve};
use crate::service::calendar_service::fetch_window;
use crate::service::context::PlannerContext;
use crate::service::conversation::{DEFAULT_TEMPERATURE, negotiate};
use crate::service::formatting::{prompt_timestamp, readable_time};
use crate::service::json_extractor::extract;
use crate::service::openai_service::ModelTier;
use crate::service::time_window::resolve_window;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: &'static str,
    pub before: String,
    pub after: String,
}

/// An update waiting for the human's approval.
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub id: String,
    pub current: EventRecord,
    pub revised: EventRecord,
    pub changes: Vec<FieldChange>,
}

pub async fn run(ctx: &PlannerContext, prompt: &str) -> Result<Vec<ChangeRequest>, CommandError> {
    let window = resolve_window(ctx, prompt).await?;
    let events = fetch_window(ctx, &window).await?;
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let request = edit_prompt(ctx, prompt, &events);
    let reply = negotiate(ctx, &request, ModelTier::Default, DEFAULT_TEMPERATURE).await?;
    let revisions = read_revisions(extract(ctx, &reply).await);
    review_revisions(ctx, revisions).await
}

fn edit_prompt(ctx: &PlannerContext, prompt: &str, events: &[CalendarEvent]) -> String {
    let events_json = serde_json::to_string(events).unwrap_or_else(|_| "[]".to_string());
    format!(
        "From this query: \"{query} [sent {sent}]\", do as follows: \
         1. Identify the intent of the query. \
         2. Pick out the titles/summaries of any events from the JSON array below that the query is about. \
         3. In detail, list your intended edits to those events with respect to the query. \
         4. Make a new JSON array of just the revised events from step 2, keeping each event's \"id\" \
         and its keys unchanged. Make autonomous, unambiguous decisions where needed to satisfy the query, \
         and escape any characters with special meaning in JSON. JSON Array: {events}.",
        query = prompt,
        sent = prompt_timestamp(&ctx.now().fixed_offset()),
        events = events_json,
    )
}

/// Keeps the records that carry an `id`; the rest cannot be applied.
pub fn read_revisions(records: Vec<Value>) -> Vec<RevisedEvent> {
    records
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RevisedEvent>(value) {
            Ok(revision) if !revision.id.is_empty() => Some(revision),
            Ok(_) => {
                warn!("dropping revised event without an id");
                None
            }
            Err(err) => {
                warn!(%err, "dropping malformed revised event");
                None
            }
        })
        .collect()
}

/// Looks up each revised event, shows what would change and asks for
/// approval; enter means yes. Revisions that change nothing are reported and
/// skipped, as are revisions of events the calendar cannot find.
pub async fn review_revisions(
    ctx: &PlannerContext,
    revisions: Vec<RevisedEvent>,
) -> Result<Vec<ChangeRequest>, CommandError> {
    let mut pending = Vec::new();
    for revision in revisions {
        let current = match ctx.calendar.get_event(&revision.id).await {
            Ok(current) => current,
            Err(err) => {
                warn!(event_id = %revision.id, %err, "skipping revision of an unknown event");
                continue;
            }
        };
        let (revised, changes) = apply_revision(&current.record, &revision, &ctx.timezone);
        if changes.is_empty() {
            ctx.say(&format!("No changes to be made for event '{}'", current.record.summary));
            continue;
        }
        pending.push(PendingUpdate {
            id: current.id,
            current: current.record,
            revised,
            changes,
        });
    }

    let approved = resolve(ctx, &pending, render_update, Verdict::Approve)?;
    Ok(approved
        .into_iter()
        .map(|update| ChangeRequest::Update {
            id: update.id,
            record: update.revised,
        })
        .collect())
}

fn render_update(update: &PendingUpdate) -> String {
    let lines: Vec<String> = update
        .changes
        .iter()
        .map(|c| format!("     - {}: {} -> {}", c.field, c.before, c.after))
        .collect();
    format!(
        "These changes are about to be made to \"{}\":\n{}",
        update.current.summary,
        lines.join("\n")
    )
}

/// Merges a revision into the current record.
///
/// A field only changes when the revised value is present, non-empty and
/// different from the current one; an empty value never clears a field.
pub fn apply_revision(
    current: &EventRecord,
    revision: &RevisedEvent,
    tz: &Tz,
) -> (EventRecord, Vec<FieldChange>) {
    let mut revised = current.clone();
    let mut changes = Vec::new();

    if let Some(summary) = revision.summary.as_deref().filter(|s| !s.is_empty()) {
        if summary != current.summary {
            changes.push(FieldChange {
                field: "Summary",
                before: current.summary.clone(),
                after: summary.to_string(),
            });
            revised.summary = summary.to_string();
        }
    }

    if let Some(description) = revision.description.as_deref().filter(|s| !s.is_empty()) {
        if description != current.description {
            changes.push(FieldChange {
                field: "Description",
                before: current.description.clone(),
                after: description.to_string(),
            });
            revised.description = description.to_string();
        }
    }

    if let Some(start) = revised_time(revision.start.as_ref(), current.start, tz, &revision.id) {
        changes.push(FieldChange {
            field: "Start time",
            before: readable_time(&current.start),
            after: readable_time(&start),
        });
        revised.start = start;
    }

    if let Some(end) = revised_time(revision.end.as_ref(), current.end, tz, &revision.id) {
        changes.push(FieldChange {
            field: "End time",
            before: readable_time(&current.end),
            after: readable_time(&end),
        });
        revised.end = end;
    }

    if let Some(value) = revision.reminders.as_ref().filter(|v| !is_falsy(v)) {
        match serde_json::from_value::<Reminders>(value.clone()) {
            Ok(reminders) if current.reminders.as_ref() != Some(&reminders) => {
                changes.push(FieldChange {
                    field: "Reminders",
                    before: describe_reminders(current.reminders.as_ref()),
                    after: describe_reminders(Some(&reminders)),
                });
                revised.reminders = Some(reminders);
            }
            Ok(_) => {}
            Err(err) => warn!(event_id = %revision.id, %err, "ignoring unreadable reminders"),
        }
    }

    (revised, changes)
}

fn revised_time(
    value: Option<&Value>,
    current: DateTime<FixedOffset>,
    tz: &Tz,
    id: &str,
) -> Option<DateTime<FixedOffset>> {
    let value = value.filter(|v| !is_falsy(v))?;
    let Some(parsed) = timestamp_from_value(value, tz) else {
        warn!(event_id = %id, %value, "ignoring unreadable revised time");
        return None;
    };
    (parsed != current).then_some(parsed)
}

fn describe_reminders(reminders: Option<&Reminders>) -> String {
    match reminders {
        None => "none".to_string(),
        Some(r) if r.use_default => "calendar default".to_string(),
        Some(r) if r.overrides.is_empty() => "none".to_string(),
        Some(r) => r
            .overrides
            .iter()
            .map(|o| format!("{} {} min before", o.method, o.minutes))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::parse_timestamp;
    use chrono_tz::Europe::Copenhagen;
    use serde_json::json;

    fn record(summary: &str) -> EventRecord {
        EventRecord {
            summary: summary.to_string(),
            description: "notes".to_string(),
            start: parse_timestamp("2026-10-17T09:00:00+02:00", &Copenhagen).unwrap(),
            end: parse_timestamp("2026-10-17T10:00:00+02:00", &Copenhagen).unwrap(),
            reminders: None,
        }
    }

    fn revision(value: Value) -> RevisedEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_summary_leaves_field_unchanged() {
        let current = record("A");
        let (revised, changes) =
            apply_revision(&current, &revision(json!({"id": "e1", "summary": ""})), &Copenhagen);
        assert_eq!(revised.summary, "A");
        assert!(changes.is_empty());
    }

    #[test]
    fn new_summary_is_applied() {
        let current = record("A");
        let (revised, changes) =
            apply_revision(&current, &revision(json!({"id": "e1", "summary": "B"})), &Copenhagen);
        assert_eq!(revised.summary, "B");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].before, "A");
    }

    #[test]
    fn same_instant_in_other_notation_is_not_a_change() {
        let current = record("A");
        let (_, changes) = apply_revision(
            &current,
            &revision(json!({"id": "e1", "start": "2026-10-17T07:00:00Z", "end": ""})),
            &Copenhagen,
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn moved_start_and_new_reminder_are_applied() {
        let current = record("A");
        let (revised, changes) = apply_revision(
            &current,
            &revision(json!({
                "id": "e1",
                "start": "2026-10-17T09:30:00",
                "reminders": {"useDefault": false, "overrides": [{"method": "popup", "minutes": 10}]}
            })),
            &Copenhagen,
        );
        assert_eq!(revised.start.to_rfc3339(), "2026-10-17T09:30:00+02:00");
        assert_eq!(revised.reminders.unwrap().overrides[0].minutes, 10);
        assert_eq!(changes.len(), 2);
        assert_eq!(revised.description, "notes");
    }

    #[test]
    fn read_revisions_drops_records_without_id() {
        let revisions = read_revisions(vec![json!({"summary": "x"}), json!({"id": "e2"}), json!("e3")]);
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].id, "e2");
    }
}
