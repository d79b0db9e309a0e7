#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use calendarBot::clients::memory_calendar::InMemoryCalendar;
use calendarBot::error::BackendError;
use calendarBot::handlers::action::ActionEngine;
use calendarBot::models::event::{CalendarEvent, EventRecord};
use calendarBot::models::transcript::ChatMessage;
use calendarBot::service::calendar_service::CalendarBackend;
use calendarBot::service::console::Console;
use calendarBot::service::context::{Pacing, PlannerContext};
use calendarBot::service::openai_service::{ChatModel, ModelTier};
use calendarBot::service::weather_service::{Forecast, NoWeather, WeatherBackend};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use chrono_tz::Europe::Copenhagen;

#[derive(Debug, Clone)]
pub struct ModelCall {
    pub messages: Vec<ChatMessage>,
    pub tier: ModelTier,
    pub temperature: f32,
}

/// Answers with the scripted replies in order; errors once they run out.
#[derive(Default)]
pub struct FakeModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<ModelCall>>,
}

impl FakeModel {
    pub fn new(replies: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for FakeModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tier: ModelTier,
        temperature: f32,
    ) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(ModelCall {
            messages: messages.to_vec(),
            tier,
            temperature,
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(err)) => Err(BackendError::model(err)),
            None => Err(BackendError::model("no scripted reply left")),
        }
    }
}

/// Feeds queued answers to prompts. An empty answer accepts the default; a
/// drained queue behaves like a closed terminal.
#[derive(Default)]
pub struct ScriptedConsole {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
    shown: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn new(answers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            ..Self::default()
        })
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }

    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }

    pub fn saw(&self, needle: &str) -> bool {
        self.shown().iter().any(|line| line.contains(needle))
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }
}

impl Console for ScriptedConsole {
    fn read_line(&self, message: &str, _default: Option<&str>) -> Option<String> {
        self.asked.lock().unwrap().push(message.to_string());
        self.answers.lock().unwrap().pop_front()
    }

    fn show(&self, text: &str) {
        self.shown.lock().unwrap().push(text.to_string());
    }
}

#[derive(Default)]
pub struct FakeWeather {
    pub forecast: Option<Forecast>,
    pub fail: bool,
}

#[async_trait]
impl WeatherBackend for FakeWeather {
    async fn forecast_at(&self, _at: DateTime<FixedOffset>) -> Result<Option<Forecast>, BackendError> {
        if self.fail {
            return Err(BackendError::weather("forecast service unavailable"));
        }
        Ok(self.forecast.clone())
    }
}

/// Fails every call, like a calendar that cannot be reached.
pub struct OfflineCalendar;

#[async_trait]
impl CalendarBackend for OfflineCalendar {
    async fn list_events(
        &self,
        _time_min: DateTime<FixedOffset>,
        _time_max: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>, BackendError> {
        Err(BackendError::calendar("calendar offline"))
    }

    async fn list_upcoming(&self, _from: DateTime<FixedOffset>, _max: usize) -> Result<Vec<CalendarEvent>, BackendError> {
        Err(BackendError::calendar("calendar offline"))
    }

    async fn get_event(&self, _id: &str) -> Result<CalendarEvent, BackendError> {
        Err(BackendError::calendar("calendar offline"))
    }

    async fn insert_event(&self, _record: &EventRecord) -> Result<CalendarEvent, BackendError> {
        Err(BackendError::calendar("calendar offline"))
    }

    async fn update_event(&self, _id: &str, _record: &EventRecord) -> Result<CalendarEvent, BackendError> {
        Err(BackendError::calendar("calendar offline"))
    }

    async fn delete_event(&self, _id: &str) -> Result<(), BackendError> {
        Err(BackendError::calendar("calendar offline"))
    }
}

/// 2026-10-16 10:00 in Copenhagen (+02:00).
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap()
}

pub fn at(raw: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(raw).unwrap()
}

pub fn event(id: &str, summary: &str, start: &str, end: &str) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        record: EventRecord {
            summary: summary.to_string(),
            description: format!("{summary} notes"),
            start: at(start),
            end: at(end),
            reminders: None,
        },
    }
}

pub struct Harness {
    pub ctx: PlannerContext,
    pub model: Arc<FakeModel>,
    pub console: Arc<ScriptedConsole>,
    pub calendar: Arc<InMemoryCalendar>,
    pub engine: ActionEngine,
}

pub fn harness(model: Arc<FakeModel>, answers: &[&str], events: Vec<CalendarEvent>) -> Harness {
    let console = ScriptedConsole::new(answers);
    let calendar = Arc::new(InMemoryCalendar::with_events(events));
    let ctx = PlannerContext::new(calendar.clone(), model.clone(), console.clone(), Copenhagen)
        .with_pacing(Pacing::immediate())
        .with_fixed_now(fixed_now());
    let engine = ActionEngine::new(calendar.clone(), Arc::new(NoWeather), console.clone());
    Harness {
        ctx,
        model,
        console,
        calendar,
        engine,
    }
}
