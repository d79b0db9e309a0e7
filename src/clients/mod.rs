pub mod google_auth;
pub mod google_calendar;
pub mod memory_calendar;
pub mod openai_client;
pub mod weather_client;
