use std::collections::HashMap;
use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use clap::ValueEnum;
use tracing::Level;

use crate::clients::openai_client::DEFAULT_BASE_URL;
use crate::error::ConfigError;
use crate::service::context::Pacing;

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// `KEY=VALUE` lines; blank lines, `#` comments, `export ` prefixes and
    /// quoted values are accepted.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.trim().to_string(), value);
        }
        Ok(Self { values })
    }

    /// File value first, then the process environment.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| env::var(key).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// The human names the command.
    Manual,
    /// The model picks the command from the plan.
    Intelligent,
    /// Every plan is split into steps.
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarKind {
    Google,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_upgraded_model: String,
    pub openai_base_url: String,
    pub calendar: CalendarKind,
    pub calendar_id: String,
    pub google_token_file: String,
    pub timezone: Tz,
    pub weather_enabled: bool,
    pub weather_city: String,
    pub weather_country: String,
    pub run_mode: RunMode,
    pub pacing: Pacing,
    pub log_level: Level,
}

impl Settings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| config.get(key))
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let or = |key: &str, default: &str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let openai_api_key = get("OPENAI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let calendar = match or("CALENDAR_BACKEND", "google").to_lowercase().as_str() {
            "google" => CalendarKind::Google,
            "memory" => CalendarKind::Memory,
            other => return Err(invalid("CALENDAR_BACKEND", other)),
        };

        let timezone_name = or("TIMEZONE", "Europe/Copenhagen");
        let timezone = Tz::from_str(&timezone_name).map_err(|_| invalid("TIMEZONE", &timezone_name))?;

        let mode_name = or("RUN_MODE", "manual");
        let run_mode = <RunMode as ValueEnum>::from_str(&mode_name, true).map_err(|_| invalid("RUN_MODE", &mode_name))?;

        let level_name = or("LOG_LEVEL", "warn");
        let log_level = Level::from_str(&level_name).map_err(|_| invalid("LOG_LEVEL", &level_name))?;

        let pacing = Pacing {
            max_resends: number(&or("MODEL_MAX_RESENDS", "2"), "MODEL_MAX_RESENDS")?,
            retry_delay: Duration::from_secs(number(&or("MODEL_RETRY_DELAY_SECS", "5"), "MODEL_RETRY_DELAY_SECS")?),
            step_delay: Duration::from_secs(number(&or("STEP_DELAY_SECS", "5"), "STEP_DELAY_SECS")?),
        };

        let weather_enabled = match or("WEATHER_ENABLED", "true").to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => true,
            "false" | "no" | "0" | "off" => false,
            other => return Err(invalid("WEATHER_ENABLED", other)),
        };

        Ok(Self {
            openai_api_key,
            openai_model: or("OPENAI_MODEL", "gpt-3.5-turbo"),
            openai_upgraded_model: or("OPENAI_UPGRADED_MODEL", "gpt-4-1106-preview"),
            openai_base_url: or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            calendar,
            calendar_id: or("CALENDAR_ID", "primary"),
            google_token_file: or("GOOGLE_TOKEN_FILE", "token.json"),
            timezone,
            weather_enabled,
            weather_city: or("WEATHER_CITY", "Copenhagen"),
            weather_country: or("WEATHER_COUNTRY", "Denmark"),
            run_mode,
            pacing,
            log_level,
        })
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

fn number<T: FromStr>(raw: &str, key: &'static str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| invalid(key, raw))
}
