use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const COMPLETED_MARK: &str = "✅";

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminders {
    #[serde(rename = "useDefault", default)]
    pub use_default: bool,
    #[serde(default)]
    pub overrides: Vec<ReminderOverride>,
}

impl Reminders {
    /// A single popup `minutes` before the start, or no reminder at all.
    pub fn popup(minutes: Option<i64>) -> Self {
        Self {
            use_default: false,
            overrides: minutes
                .map(|minutes| {
                    vec![ReminderOverride {
                        method: "popup".to_string(),
                        minutes,
                    }]
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Reminders>,
}

/// An event as the calendar backend returns it, id included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(flatten)]
    pub record: EventRecord,
}

impl CalendarEvent {
    /// The shape shown to the model when it only needs to pick events.
    pub fn without_details(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "summary": self.record.summary,
            "start": self.record.start.to_rfc3339(),
            "end": self.record.end.to_rfc3339(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeRequest {
    Create(EventRecord),
    Update { id: String, record: EventRecord },
    Delete { id: String, record: EventRecord },
}

impl ChangeRequest {
    pub fn record(&self) -> &EventRecord {
        match self {
            ChangeRequest::Create(record) => record,
            ChangeRequest::Update { record, .. } => record,
            ChangeRequest::Delete { record, .. } => record,
        }
    }
}

/// A new event as the model writes it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposedEvent {
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "start")]
    pub start_datetime: String,
    #[serde(alias = "end")]
    pub end_datetime: String,
    #[serde(default)]
    pub reminder: Option<Value>,
}

impl ProposedEvent {
    pub fn reminder_minutes(&self) -> Option<i64> {
        match self.reminder.as_ref()? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn into_record(self, tz: &Tz) -> Option<EventRecord> {
        let start = parse_timestamp(&self.start_datetime, tz)?;
        let end = parse_timestamp(&self.end_datetime, tz)?;
        let reminders = Reminders::popup(self.reminder_minutes());
        Some(EventRecord {
            summary: self.summary,
            description: self.description,
            start,
            end,
            reminders: Some(reminders),
        })
    }
}

/// A revised event as the model writes it back. Every field but `id` may be
/// missing or empty, which means "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevisedEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "start_datetime")]
    pub start: Option<Value>,
    #[serde(default, alias = "end_datetime")]
    pub end: Option<Value>,
    #[serde(default)]
    pub reminders: Option<Value>,
}

/// Reads a timestamp the way the model or the human tends to write one.
/// Offsets are kept when present, otherwise the wall time is placed in `tz`.
pub fn parse_timestamp(raw: &str, tz: &Tz) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return localize(&naive, tz);
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    localize(&date.and_hms_opt(0, 0, 0)?, tz)
}

pub fn localize(naive: &NaiveDateTime, tz: &Tz) -> Option<DateTime<FixedOffset>> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

/// Reads a JSON value that should hold a timestamp. Empty strings and
/// non-strings count as absent.
pub fn timestamp_from_value(value: &Value, tz: &Tz) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::String(s) if !s.trim().is_empty() => parse_timestamp(s, tz),
        Value::Object(map) => map
            .get("dateTime")
            .or_else(|| map.get("date"))
            .and_then(|inner| timestamp_from_value(inner, tz)),
        _ => None,
    }
}

pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

pub fn mark_completed(summary: &str) -> String {
    if summary.starts_with(COMPLETED_MARK) {
        summary.to_string()
    } else {
        format!("{COMPLETED_MARK}{summary}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::Europe::Copenhagen;

    #[test]
    fn parse_timestamp_keeps_explicit_offset() {
        let parsed = parse_timestamp("2026-10-17T13:00:00+05:00", &Copenhagen).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 5 * 3600);
        assert_eq!(parsed.hour(), 13);
    }

    #[test]
    fn parse_timestamp_places_naive_time_in_zone() {
        let parsed = parse_timestamp("2026-10-17T13:00:00", &Copenhagen).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 2 * 3600);
        let winter = parse_timestamp("2026-12-01 09:30", &Copenhagen).unwrap();
        assert_eq!(winter.offset().local_minus_utc(), 3600);
        assert_eq!(winter.minute(), 30);
    }

    #[test]
    fn parse_timestamp_rejects_prose() {
        assert!(parse_timestamp("tomorrow at noon", &Copenhagen).is_none());
    }

    #[test]
    fn proposed_event_accepts_string_reminder() {
        let proposed: ProposedEvent = serde_json::from_value(serde_json::json!({
            "summary": "Lunch",
            "start_datetime": "2026-10-17T13:00:00",
            "end_datetime": "2026-10-17T14:00:00",
            "reminder": "15"
        }))
        .unwrap();
        let record = proposed.into_record(&Copenhagen).unwrap();
        let reminders = record.reminders.unwrap();
        assert_eq!(reminders.overrides[0].minutes, 15);
        assert_eq!(record.description, "");
    }

    #[test]
    fn mark_completed_is_idempotent() {
        assert_eq!(mark_completed("Gym 💪"), "✅Gym 💪");
        assert_eq!(mark_completed("✅Gym"), "✅Gym");
    }

    #[test]
    fn calendar_event_serializes_flat() {
        let event = CalendarEvent {
            id: "e1".to_string(),
            record: EventRecord {
                summary: "Standup".to_string(),
                description: String::new(),
                start: parse_timestamp("2026-10-17T09:00:00+02:00", &Copenhagen).unwrap(),
                end: parse_timestamp("2026-10-17T09:15:00+02:00", &Copenhagen).unwrap(),
                reminders: None,
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["id"], "e1");
        assert_eq!(value["summary"], "Standup");
        assert_eq!(value["start"], "2026-10-17T09:00:00+02:00");
    }
}
