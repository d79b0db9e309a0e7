use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::error::BackendError;

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub description: String,
    pub temperature_celsius: f64,
}

#[async_trait]
pub trait WeatherBackend: Send + Sync {
    /// `Ok(None)` when there is no forecast for that hour.
    async fn forecast_at(&self, at: DateTime<FixedOffset>) -> Result<Option<Forecast>, BackendError>;
}

/// Used when weather lookups are disabled or the location could not be resolved.
pub struct NoWeather;

#[async_trait]
impl WeatherBackend for NoWeather {
    async fn forecast_at(&self, _at: DateTime<FixedOffset>) -> Result<Option<Forecast>, BackendError> {
        Ok(None)
    }
}

/// WMO weather interpretation codes, as reported by Open-Meteo.
pub fn describe_weather(code: i64) -> String {
    let text = match code {
        0 => "Clear sky ☀️",
        1 => "Mostly clear 🌤",
        2 => "Partly cloudy ⛅",
        3 => "Overcast ☁️",
        45 => "Fog 🌫",
        48 => "Dense fog 🌁",
        51 => "Light drizzle 🌦",
        53 => "Drizzle 🌧",
        55 => "Heavy drizzle 🌧️🌧️",
        56 => "Light freezing drizzle 🌨️",
        57 => "Freezing drizzle ❄️💧",
        61 => "Light rain 🌦",
        63 => "Rain 🌧",
        65 => "Heavy rain 🌧️🌧️",
        66 => "Light freezing rain 🌨️",
        67 => "Freezing rain ❄️💧",
        71 => "Light sleet 🌦❄️",
        73 => "Sleet 🌨️",
        75 => "Heavy sleet 🌨️🌨️",
        81 => "Light snowfall 🌨️",
        83 => "Snowfall ❄️",
        85 => "Heavy snowfall ❄️❄️",
        other => return format!("Unknown weather code {other} ❓"),
    };
    text.to_string()
}
