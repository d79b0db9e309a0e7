pub mod event;
pub mod signal;
pub mod transcript;
