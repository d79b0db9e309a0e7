use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use super::context::PlannerContext;
use super::formatting::readable_time;
use super::time_window::TimeWindow;
use crate::error::BackendError;
use crate::models::event::{CalendarEvent, EventRecord};

/// Operations on the one calendar this assistant manages.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    async fn list_events(
        &self,
        time_min: DateTime<FixedOffset>,
        time_max: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>, BackendError>;

    async fn list_upcoming(
        &self,
        from: DateTime<FixedOffset>,
        max: usize,
    ) -> Result<Vec<CalendarEvent>, BackendError>;

    async fn get_event(&self, id: &str) -> Result<CalendarEvent, BackendError>;

    async fn insert_event(&self, record: &EventRecord) -> Result<CalendarEvent, BackendError>;

    async fn update_event(&self, id: &str, record: &EventRecord) -> Result<CalendarEvent, BackendError>;

    async fn delete_event(&self, id: &str) -> Result<(), BackendError>;
}

/// Fresh round trip for the events in `window`, listed to the human.
pub async fn fetch_window(
    ctx: &PlannerContext,
    window: &TimeWindow,
) -> Result<Vec<CalendarEvent>, BackendError> {
    ctx.say(&format!(
        "Fetching events between {} and {}.",
        readable_time(&window.start),
        readable_time(&window.end)
    ));
    let events = ctx.calendar.list_events(window.start, window.end).await?;
    ctx.say(&render_listing(&events));
    Ok(events)
}

pub fn render_listing(events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return "No events found.".to_string();
    }
    let lines: Vec<String> = events
        .iter()
        .map(|e| format!("{} {}", e.record.start.to_rfc3339(), e.record.summary))
        .collect();
    format!("Found events:\n{}", lines.join("\n"))
}
