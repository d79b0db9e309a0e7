use thiserror::Error;

use crate::models::signal::ControlSignal;

/// The one failure kind every remote collaborator (calendar, model, weather)
/// reports. `service` names which backend produced it.
#[derive(Debug, Clone, Error)]
#[error("{service} backend error: {message}")]
pub struct BackendError {
    pub service: &'static str,
    pub message: String,
}

impl BackendError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }

    pub fn calendar(message: impl Into<String>) -> Self {
        Self::new("calendar", message)
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::new("model", message)
    }

    pub fn weather(message: impl Into<String>) -> Self {
        Self::new("weather", message)
    }
}

/// Why a command stopped before producing its change-requests.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("interrupted by control signal {0:?}")]
    Signal(ControlSignal),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<ControlSignal> for CommandError {
    fn from(signal: ControlSignal) -> Self {
        CommandError::Signal(signal)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config line {line}: {content}")]
    InvalidLine { line: usize, content: String },

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}
