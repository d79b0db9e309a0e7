pub mod approval_prompt;
pub mod calendar_service;
pub mod console;
pub mod context;
pub mod conversation;
pub mod formatting;
pub mod json_extractor;
pub mod openai_service;
pub mod routing;
pub mod time_window;
pub mod weather_service;
