use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::google_auth::TokenSource;
use crate::error::BackendError;
use crate::models::event::{CalendarEvent, EventRecord, Reminders, parse_timestamp};
use crate::service::calendar_service::CalendarBackend;

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Default, Serialize, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime", default, skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start: EventTime,
    #[serde(default)]
    end: EventTime,
    #[serde(default)]
    reminders: Option<Reminders>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventsListResponse {
    #[serde(default)]
    items: Option<Vec<RemoteEvent>>,
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventTime,
    end: EventTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    reminders: Option<&'a Reminders>,
}

/// Google Calendar v3 over REST, scoped to one calendar id.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    tokens: TokenSource,
    calendar_id: String,
    timezone: Tz,
}

impl GoogleCalendarClient {
    pub fn new(tokens: TokenSource, calendar_id: impl Into<String>, timezone: Tz) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
            calendar_id: calendar_id.into(),
            timezone,
        }
    }

    fn events_url(&self) -> String {
        format!("{CALENDAR_API}/calendars/{}/events", self.calendar_id)
    }

    fn event_url(&self, id: &str) -> String {
        format!("{}/{}", self.events_url(), id)
    }

    async fn token(&self) -> Result<String, BackendError> {
        self.tokens.access_token(&self.http).await
    }

    fn body<'a>(&self, record: &'a EventRecord) -> EventBody<'a> {
        let zone = self.timezone.name().to_string();
        EventBody {
            summary: &record.summary,
            description: &record.description,
            start: EventTime {
                date_time: Some(record.start.to_rfc3339()),
                date: None,
                time_zone: Some(zone.clone()),
            },
            end: EventTime {
                date_time: Some(record.end.to_rfc3339()),
                date: None,
                time_zone: Some(zone),
            },
            reminders: record.reminders.as_ref(),
        }
    }

    fn to_event(&self, remote: RemoteEvent) -> Option<CalendarEvent> {
        let start = self.read_time(&remote.start)?;
        let end = self.read_time(&remote.end)?;
        Some(CalendarEvent {
            id: remote.id,
            record: EventRecord {
                summary: remote.summary.unwrap_or_default(),
                description: remote.description.unwrap_or_default(),
                start,
                end,
                reminders: remote.reminders,
            },
        })
    }

    // All-day events only carry a date; they start at local midnight.
    fn read_time(&self, time: &EventTime) -> Option<DateTime<FixedOffset>> {
        let raw = time.date_time.as_deref().or(time.date.as_deref())?;
        parse_timestamp(raw, &self.timezone)
    }

    async fn list(&self, query: &[(&str, String)]) -> Result<Vec<CalendarEvent>, BackendError> {
        let token = self.token().await?;
        let resp = self
            .http
            .get(self.events_url())
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| BackendError::calendar(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BackendError::calendar(format!(
                "Calendar list failed: HTTP {}",
                resp.status()
            )));
        }

        let body: EventsListResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::calendar(e.to_string()))?;

        let events = body
            .items
            .unwrap_or_default()
            .into_iter()
            .filter(|item| item.status.as_deref() != Some("cancelled"))
            .filter_map(|item| {
                let id = item.id.clone();
                let event = self.to_event(item);
                if event.is_none() {
                    warn!(event_id = %id, "skipping event with unreadable start/end");
                }
                event
            })
            .collect();
        Ok(events)
    }

    async fn read_event(resp: reqwest::Response, action: &str) -> Result<RemoteEvent, BackendError> {
        if !resp.status().is_success() {
            return Err(BackendError::calendar(format!(
                "Event {action} failed: HTTP {}",
                resp.status()
            )));
        }
        resp.json()
            .await
            .map_err(|e| BackendError::calendar(e.to_string()))
    }

    fn readable(&self, remote: RemoteEvent) -> Result<CalendarEvent, BackendError> {
        let id = remote.id.clone();
        self.to_event(remote)
            .ok_or_else(|| BackendError::calendar(format!("event {id} has no readable start/end")))
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendarClient {
    async fn list_events(
        &self,
        time_min: DateTime<FixedOffset>,
        time_max: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>, BackendError> {
        debug!(%time_min, %time_max, "listing calendar events");
        self.list(&[
            ("timeMin", time_min.to_rfc3339()),
            ("timeMax", time_max.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ])
        .await
    }

    async fn list_upcoming(
        &self,
        from: DateTime<FixedOffset>,
        max: usize,
    ) -> Result<Vec<CalendarEvent>, BackendError> {
        self.list(&[
            ("timeMin", from.to_rfc3339()),
            ("maxResults", max.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ])
        .await
    }

    async fn get_event(&self, id: &str) -> Result<CalendarEvent, BackendError> {
        let token = self.token().await?;
        let resp = self
            .http
            .get(self.event_url(id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BackendError::calendar(e.to_string()))?;
        let remote = Self::read_event(resp, "get").await?;
        self.readable(remote)
    }

    async fn insert_event(&self, record: &EventRecord) -> Result<CalendarEvent, BackendError> {
        let token = self.token().await?;
        let resp = self
            .http
            .post(self.events_url())
            .bearer_auth(token)
            .json(&self.body(record))
            .send()
            .await
            .map_err(|e| BackendError::calendar(e.to_string()))?;
        let remote = Self::read_event(resp, "create").await?;
        self.readable(remote)
    }

    async fn update_event(&self, id: &str, record: &EventRecord) -> Result<CalendarEvent, BackendError> {
        let token = self.token().await?;
        let resp = self
            .http
            .patch(self.event_url(id))
            .bearer_auth(token)
            .json(&self.body(record))
            .send()
            .await
            .map_err(|e| BackendError::calendar(e.to_string()))?;
        let remote = Self::read_event(resp, "update").await?;
        self.readable(remote)
    }

    async fn delete_event(&self, id: &str) -> Result<(), BackendError> {
        let token = self.token().await?;
        let resp = self
            .http
            .delete(self.event_url(id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BackendError::calendar(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BackendError::calendar(format!(
                "Event delete failed: HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
