use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::calendar_service::CalendarBackend;
use super::console::Console;
use super::openai_service::ChatModel;
use crate::models::signal::{ControlSignal, parse_reply};

/// Fixed waits between backend calls.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Extra attempts after a failed model call.
    pub max_resends: u32,
    pub retry_delay: Duration,
    /// Pause between the steps of a multi-step request.
    pub step_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            max_resends: 2,
            retry_delay: Duration::from_secs(5),
            step_delay: Duration::from_secs(5),
        }
    }
}

impl Pacing {
    pub fn immediate() -> Self {
        Self {
            retry_delay: Duration::ZERO,
            step_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Everything a command needs to run: the collaborators, the user's
/// timezone and the pacing policy. Holds no per-command state.
pub struct PlannerContext {
    pub calendar: Arc<dyn CalendarBackend>,
    pub model: Arc<dyn ChatModel>,
    pub console: Arc<dyn Console>,
    pub timezone: Tz,
    pub pacing: Pacing,
    fixed_now: Option<DateTime<Utc>>,
}

impl PlannerContext {
    pub fn new(
        calendar: Arc<dyn CalendarBackend>,
        model: Arc<dyn ChatModel>,
        console: Arc<dyn Console>,
        timezone: Tz,
    ) -> Self {
        Self {
            calendar,
            model,
            console,
            timezone,
            pacing: Pacing::default(),
            fixed_now: None,
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Pins the clock; used by tests and replays.
    pub fn with_fixed_now(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.fixed_now
            .unwrap_or_else(Utc::now)
            .with_timezone(&self.timezone)
    }

    /// Prompts the human. Control words come back as `Err`.
    pub fn ask(&self, message: &str, default: Option<&str>) -> Result<String, ControlSignal> {
        let Some(raw) = self.console.read_line(message, default) else {
            return Err(ControlSignal::Exit);
        };
        parse_reply(&raw, default, &self.timezone)
    }

    /// Like [`ask`](Self::ask), but a typed answer comes back exactly as
    /// typed, surrounding whitespace included.
    pub fn ask_exact(&self, message: &str, default: Option<&str>) -> Result<String, ControlSignal> {
        let Some(raw) = self.console.read_line(message, default) else {
            return Err(ControlSignal::Exit);
        };
        let parsed = parse_reply(&raw, default, &self.timezone)?;
        Ok(if raw.trim().is_empty() { parsed } else { raw })
    }

    pub fn say(&self, text: &str) {
        self.console.show(text);
    }
}
