use inquire::{InquireError, Text};
use tracing::warn;

/// The human on the other side of the terminal.
///
/// `read_line` returns the raw answer; `None` means the input stream is gone
/// (closed terminal, Ctrl-C) and is treated as a request to exit.
pub trait Console: Send + Sync {
    fn read_line(&self, message: &str, default: Option<&str>) -> Option<String>;
    fn show(&self, text: &str);
}

pub struct InquireConsole;

impl Console for InquireConsole {
    fn read_line(&self, message: &str, default: Option<&str>) -> Option<String> {
        let mut prompt = Text::new(message);
        if let Some(default) = default {
            prompt = prompt.with_default(default);
        }
        match prompt.prompt() {
            Ok(answer) => Some(answer),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => None,
            Err(err) => {
                warn!(%err, "failed to read console input");
                None
            }
        }
    }

    fn show(&self, text: &str) {
        println!("{}", text);
    }
}
