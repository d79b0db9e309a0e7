use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use chrono_tz::Tz;
use regex::Regex;
use tracing::debug;

use super::context::PlannerContext;
use super::conversation::{DEFAULT_TEMPERATURE, negotiate};
use super::formatting::prompt_timestamp;
use super::openai_service::ModelTier;
use crate::models::event::parse_timestamp;
use crate::models::signal::ControlSignal;

static WINDOW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2} to \d{4}-\d{2}-\d{2} \d{2}:\d{2}")
        .expect("window pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl TimeWindow {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self {
            start: truncate_seconds(start),
            end: truncate_seconds(end),
        }
    }

    /// From `now` to the last second of today.
    pub fn rest_of_day(now: &DateTime<Tz>) -> Option<Self> {
        let end = now
            .with_time(NaiveTime::from_hms_opt(23, 59, 59)?)
            .earliest()?;
        Some(Self {
            start: now.fixed_offset(),
            end: end.fixed_offset(),
        })
    }
}

fn truncate_seconds(at: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    at.with_second(0)
        .and_then(|at| at.with_nanosecond(0))
        .unwrap_or(at)
}

/// First `YYYY-MM-DD HH:MM to YYYY-MM-DD HH:MM` in the reply. Later matches
/// are ignored.
pub fn find_window(reply: &str, tz: &Tz) -> Option<TimeWindow> {
    let found = WINDOW_PATTERN.find(reply)?;
    let (start, end) = found.as_str().split_once(" to ")?;
    Some(TimeWindow::new(
        parse_timestamp(start, tz)?,
        parse_timestamp(end, tz)?,
    ))
}

fn window_prompt(planning_prompt: &str, now: &DateTime<Tz>) -> String {
    format!(
        "From this query: \"{query} [sent {sent}]\", do as follows: \
         1. Identify the intent of the query. \
         2. Explain in depth the most important times mentioned in the query. \
         If the query names no day, assume today. If it carries no temporal hints \
         other than the time it was sent, use 00:00 to 23:59 of that day. \
         3. End your response with one unambiguous time frame covering the plans \
         from step 2, written exactly in this format with nothing changed: \
         'Original plans: YYYY-MM-DD HH:MM to YYYY-MM-DD HH:MM'.",
        query = planning_prompt,
        sent = prompt_timestamp(&now.fixed_offset()),
    )
}

/// Asks the model which stretch of time the request is about. Falls back to
/// today, confirmed or corrected by the human, when the reply has no window.
pub async fn resolve_window(
    ctx: &PlannerContext,
    planning_prompt: &str,
) -> Result<TimeWindow, ControlSignal> {
    let now = ctx.now();
    ctx.say("\nIdentifying time window from prompt...");
    let reply = negotiate(
        ctx,
        &window_prompt(planning_prompt, &now),
        ModelTier::Default,
        DEFAULT_TEMPERATURE,
    )
    .await?;

    if let Some(window) = find_window(&reply, &ctx.timezone) {
        debug!(start = %window.start, end = %window.end, "time window from model");
        return Ok(window);
    }

    let date = now.date_naive();
    let mut start = format!("{} 00:00", date);
    let mut end = format!("{} 23:59", date);
    ctx.say("No time window found in the response. Assuming the entire present day.");
    let confirmation = ctx.ask("Is the assumption correct? (yes/no)", None)?;
    if !confirmation.eq_ignore_ascii_case("yes") {
        start = ctx.ask("Please provide the correct start time.", Some(&start))?;
        end = ctx.ask("Please provide the correct end time.", Some(&end))?;
    }

    loop {
        match (
            parse_timestamp(&start, &ctx.timezone),
            parse_timestamp(&end, &ctx.timezone),
        ) {
            (Some(s), Some(e)) => return Ok(TimeWindow::new(s, e)),
            _ => {
                ctx.say("Invalid date/time format. Please use YYYY-MM-DD HH:MM.");
                start = ctx.ask("Please provide the correct start time.", Some(&start))?;
                end = ctx.ask("Please provide the correct end time.", Some(&end))?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Copenhagen;

    #[test]
    fn find_window_takes_first_match() {
        let reply = "Plans are at lunch.\nOriginal plans: 2026-10-17 12:00 to 2026-10-17 14:30\n\
                     Alternatively 2026-10-18 00:00 to 2026-10-18 23:59";
        let window = find_window(reply, &Copenhagen).unwrap();
        assert_eq!(window.start.to_rfc3339(), "2026-10-17T12:00:00+02:00");
        assert_eq!(window.end.to_rfc3339(), "2026-10-17T14:30:00+02:00");
    }

    #[test]
    fn find_window_requires_exact_shape() {
        assert!(find_window("Original plans: 2026-10-17 12:00 until 2026-10-17 14:30", &Copenhagen).is_none());
        assert!(find_window("tomorrow 1pm to 2pm", &Copenhagen).is_none());
    }
}
