use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::error::BackendError;
use crate::models::event::{CalendarEvent, EventRecord};
use crate::service::calendar_service::CalendarBackend;

/// Process-local calendar. Used for dry runs and as the test double.
#[derive(Default)]
pub struct InMemoryCalendar {
    events: Mutex<HashMap<String, CalendarEvent>>,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        let map = events.into_iter().map(|e| (e.id.clone(), e)).collect();
        Self {
            events: Mutex::new(map),
        }
    }

    /// All events ordered by start.
    pub fn snapshot(&self) -> Vec<CalendarEvent> {
        let mut events: Vec<CalendarEvent> = self.lock().values().cloned().collect();
        events.sort_by_key(|e| e.record.start);
        events
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CalendarEvent>> {
        // A poisoned map is still a consistent map: every write is a single insert/remove.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn missing(id: &str) -> BackendError {
        BackendError::calendar(format!("event {id} not found"))
    }
}

#[async_trait]
impl CalendarBackend for InMemoryCalendar {
    async fn list_events(
        &self,
        time_min: DateTime<FixedOffset>,
        time_max: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>, BackendError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|e| e.record.end > time_min && e.record.start < time_max)
            .collect())
    }

    async fn list_upcoming(
        &self,
        from: DateTime<FixedOffset>,
        max: usize,
    ) -> Result<Vec<CalendarEvent>, BackendError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|e| e.record.end > from)
            .take(max)
            .collect())
    }

    async fn get_event(&self, id: &str) -> Result<CalendarEvent, BackendError> {
        self.lock().get(id).cloned().ok_or_else(|| Self::missing(id))
    }

    async fn insert_event(&self, record: &EventRecord) -> Result<CalendarEvent, BackendError> {
        let event = CalendarEvent {
            id: Uuid::new_v4().simple().to_string(),
            record: record.clone(),
        };
        self.lock().insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn update_event(&self, id: &str, record: &EventRecord) -> Result<CalendarEvent, BackendError> {
        let mut events = self.lock();
        let existing = events.get_mut(id).ok_or_else(|| Self::missing(id))?;
        existing.record = record.clone();
        Ok(existing.clone())
    }

    async fn delete_event(&self, id: &str) -> Result<(), BackendError> {
        self.lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::missing(id))
    }
}
