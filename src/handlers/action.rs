use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{error, info, warn};

use crate::error::BackendError;
use crate::models::event::{ChangeRequest, EventRecord, mark_completed};
use crate::service::calendar_service::CalendarBackend;
use crate::service::console::Console;
use crate::service::formatting::readable_time;
use crate::service::weather_service::WeatherBackend;

/// Outcome of one apply pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Writes approved change-requests to the calendar.
pub struct ActionEngine {
    calendar: Arc<dyn CalendarBackend>,
    weather: Arc<dyn WeatherBackend>,
    console: Arc<dyn Console>,
}

impl ActionEngine {
    pub fn new(
        calendar: Arc<dyn CalendarBackend>,
        weather: Arc<dyn WeatherBackend>,
        console: Arc<dyn Console>,
    ) -> Self {
        Self {
            calendar,
            weather,
            console,
        }
    }

    /// Applies every change in order. A failed change is reported and the
    /// rest still run.
    pub async fn apply_all(&self, changes: &[ChangeRequest], now: DateTime<FixedOffset>) -> ApplyReport {
        let mut report = ApplyReport::default();
        for change in changes {
            let result = match change {
                ChangeRequest::Create(record) => self.create(record, now).await.map(|_| report.created += 1),
                ChangeRequest::Update { id, record } => self.update(id, record).await.map(|_| report.updated += 1),
                ChangeRequest::Delete { id, record } => self.delete(id, record).await.map(|_| report.deleted += 1),
            };
            if let Err(err) = result {
                error!(%err, summary = %change.record().summary, "failed to apply change");
                self.console.show(&format!(
                    "Could not apply the change to '{}': {}",
                    change.record().summary,
                    err
                ));
                report.failed += 1;
            }
        }
        info!(?report, "applied changes");
        report
    }

    async fn create(&self, record: &EventRecord, now: DateTime<FixedOffset>) -> Result<(), BackendError> {
        let mut record = record.clone();
        if record.end <= now {
            record.summary = mark_completed(&record.summary);
        }
        match self.weather.forecast_at(record.start).await {
            Ok(Some(forecast)) => {
                record.description.push_str(&format!(
                    "\n\nWeather ({}):\nDescription: {}\nTemperature: {}°C",
                    readable_time(&record.start),
                    forecast.description,
                    forecast.temperature_celsius
                ));
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%err, "weather lookup failed, creating event without forecast");
                self.console.show(&format!("Could not fetch the weather: {}", err));
            }
        }

        let created = self.calendar.insert_event(&record).await?;
        self.console.show(&format!(
            "Event created: {} ({} until {})",
            created.record.summary,
            readable_time(&created.record.start),
            created.record.end.format("%H:%M")
        ));
        Ok(())
    }

    async fn update(&self, id: &str, record: &EventRecord) -> Result<(), BackendError> {
        let updated = self.calendar.update_event(id, record).await?;
        self.console
            .show(&format!("Event '{}' updated successfully.", updated.record.summary));
        Ok(())
    }

    async fn delete(&self, id: &str, record: &EventRecord) -> Result<(), BackendError> {
        self.calendar.delete_event(id).await?;
        self.console
            .show(&format!("Event named '{}' deleted successfully.", record.summary));
        Ok(())
    }
}
