#![allow(non_snake_case)]

use std::env;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use calendarBot::cli::{self, Cli};
use calendarBot::clients::google_auth::TokenSource;
use calendarBot::clients::google_calendar::GoogleCalendarClient;
use calendarBot::clients::memory_calendar::InMemoryCalendar;
use calendarBot::clients::weather_client::{OpenMeteoClient, geocode};
use calendarBot::config::{AppConfig, CalendarKind, Settings};
use calendarBot::handlers::action::ActionEngine;
use calendarBot::service::calendar_service::CalendarBackend;
use calendarBot::service::console::InquireConsole;
use calendarBot::service::context::PlannerContext;
use calendarBot::service::openai_service::OpenAIService;
use calendarBot::service::weather_service::{NoWeather, WeatherBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => AppConfig::default(),
    };
    let settings = Settings::from_config(&config)?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing log subscriber")?;

    let calendar: Arc<dyn CalendarBackend> = match settings.calendar {
        CalendarKind::Memory => Arc::new(InMemoryCalendar::new()),
        CalendarKind::Google => {
            let tokens = TokenSource::from_file(&settings.google_token_file)
                .with_context(|| format!("loading Google token from {}", settings.google_token_file))?;
            Arc::new(GoogleCalendarClient::new(
                tokens,
                settings.calendar_id.clone(),
                settings.timezone,
            ))
        }
    };
    calendar
        .list_upcoming(chrono::Utc::now().fixed_offset(), 1)
        .await
        .context("calendar backend is not reachable")?;
    info!(calendar = ?settings.calendar, "calendar ready");

    let weather: Arc<dyn WeatherBackend> = if settings.weather_enabled {
        match geocode(&settings.weather_city, &settings.weather_country).await {
            Ok(location) => Arc::new(OpenMeteoClient::new(location, settings.timezone)),
            Err(err) => {
                warn!(%err, city = %settings.weather_city, "weather disabled, location lookup failed");
                Arc::new(NoWeather)
            }
        }
    } else {
        Arc::new(NoWeather)
    };

    let model = OpenAIService::new(
        settings.openai_api_key.clone(),
        settings.openai_model.clone(),
        settings.openai_upgraded_model.clone(),
    )
    .with_base_url(settings.openai_base_url.clone());

    let console = Arc::new(InquireConsole);
    let ctx = PlannerContext::new(calendar.clone(), Arc::new(model), console.clone(), settings.timezone)
        .with_pacing(settings.pacing.clone());
    let engine = ActionEngine::new(calendar, weather, console);

    cli::cli(args, &ctx, &engine, settings.run_mode).await
}
