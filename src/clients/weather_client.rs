use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::error::BackendError;
use crate::service::weather_service::{Forecast, WeatherBackend, describe_weather};

const FORECAST_API: &str = "https://api.open-meteo.com/v1/forecast";
const GEOCODE_API: &str = "https://nominatim.openstreetmap.org/search";
const USER_AGENT: &str = concat!("calendarBot/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: Hourly,
}

#[derive(Debug, Deserialize)]
struct Hourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    weathercode: Vec<Option<i64>>,
}

/// Looks a city up once through Nominatim.
pub async fn geocode(city: &str, country: &str) -> Result<Coordinates, BackendError> {
    let client = reqwest::Client::new();
    let resp = client
        .get(GEOCODE_API)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .query(&[("city", city), ("country", country), ("format", "json")])
        .send()
        .await
        .map_err(|e| BackendError::weather(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(BackendError::weather(format!(
            "Geocoding failed: HTTP {}",
            resp.status()
        )));
    }

    let places: Vec<Place> = resp
        .json()
        .await
        .map_err(|e| BackendError::weather(e.to_string()))?;
    let place = places
        .first()
        .ok_or_else(|| BackendError::weather(format!("no location found for {city}, {country}")))?;

    let latitude = place
        .lat
        .parse()
        .map_err(|_| BackendError::weather(format!("bad latitude {}", place.lat)))?;
    let longitude = place
        .lon
        .parse()
        .map_err(|_| BackendError::weather(format!("bad longitude {}", place.lon)))?;
    Ok(Coordinates {
        latitude,
        longitude,
    })
}

pub struct OpenMeteoClient {
    http: reqwest::Client,
    location: Coordinates,
    timezone: Tz,
}

impl OpenMeteoClient {
    pub fn new(location: Coordinates, timezone: Tz) -> Self {
        Self {
            http: reqwest::Client::new(),
            location,
            timezone,
        }
    }
}

#[async_trait]
impl WeatherBackend for OpenMeteoClient {
    async fn forecast_at(&self, at: DateTime<FixedOffset>) -> Result<Option<Forecast>, BackendError> {
        let local = at.with_timezone(&self.timezone);
        let hour = local.format("%Y-%m-%dT%H:00").to_string();
        let day = local.format("%Y-%m-%d").to_string();

        let resp = self
            .http
            .get(FORECAST_API)
            .query(&[
                ("latitude", self.location.latitude.to_string()),
                ("longitude", self.location.longitude.to_string()),
                ("hourly", "temperature_2m,weathercode".to_string()),
                ("timezone", self.timezone.name().to_string()),
                ("start_date", day.clone()),
                ("end_date", day),
            ])
            .send()
            .await
            .map_err(|e| BackendError::weather(e.to_string()))?;

        // Open-Meteo answers 400 for dates outside its forecast range.
        if resp.status() == reqwest::StatusCode::BAD_REQUEST {
            debug!(%hour, "no forecast available for this hour");
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(BackendError::weather(format!(
                "Forecast failed: HTTP {}",
                resp.status()
            )));
        }

        let body: ForecastResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::weather(e.to_string()))?;
        Ok(pick_hour(&body.hourly, &hour))
    }
}

fn pick_hour(hourly: &Hourly, hour: &str) -> Option<Forecast> {
    let index = hourly.time.iter().position(|t| t == hour)?;
    let code = (*hourly.weathercode.get(index)?)?;
    let temperature = (*hourly.temperature_2m.get(index)?)?;
    Some(Forecast {
        description: describe_weather(code),
        temperature_celsius: temperature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_hour_matches_exact_hour() {
        let hourly: Hourly = serde_json::from_value(serde_json::json!({
            "time": ["2026-10-17T12:00", "2026-10-17T13:00"],
            "temperature_2m": [11.5, 12.25],
            "weathercode": [3, 61]
        }))
        .unwrap();
        let forecast = pick_hour(&hourly, "2026-10-17T13:00").unwrap();
        assert_eq!(forecast.temperature_celsius, 12.25);
        assert_eq!(forecast.description, "Light rain 🌦");
        assert!(pick_hour(&hourly, "2026-10-17T14:00").is_none());
    }

    #[test]
    fn pick_hour_skips_missing_values() {
        let hourly: Hourly = serde_json::from_value(serde_json::json!({
            "time": ["2026-10-17T12:00"],
            "temperature_2m": [null],
            "weathercode": [0]
        }))
        .unwrap();
        assert!(pick_hour(&hourly, "2026-10-17T12:00").is_none());
    }
}
