use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::info;

use super::action::ActionEngine;
use super::{complete, delete, edit, get_then_make, help, make, paste, sequentially};
use crate::error::CommandError;
use crate::models::event::ChangeRequest;
use crate::service::context::PlannerContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Make,
    Edit,
    Delete,
    Complete,
    GetThenMake,
    Help,
    Paste,
    Sequentially,
}

static REGISTRY: LazyLock<HashMap<&'static str, Command>> =
    LazyLock::new(|| Command::ALL.iter().map(|c| (c.name(), *c)).collect());

impl Command {
    /// Menu order; also the order the model sees the commands in.
    pub const ALL: [Command; 8] = [
        Command::Make,
        Command::Edit,
        Command::Delete,
        Command::Complete,
        Command::GetThenMake,
        Command::Help,
        Command::Paste,
        Command::Sequentially,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Command::Make => "MAKE",
            Command::Edit => "EDIT",
            Command::Delete => "DELETE",
            Command::Complete => "COMPLETE",
            Command::GetThenMake => "GET THEN MAKE",
            Command::Help => "HELP",
            Command::Paste => "PASTE",
            Command::Sequentially => "SEQUENTIALLY",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Make => "makes new events from the prompt.",
            Command::Edit => "finds and edits calendar events.",
            Command::Delete => "removes events from the calendar.",
            Command::Complete => "marks events as complete or done.",
            Command::GetThenMake => "makes events in the free time between existing ones.",
            Command::Help => "displays the list of possible commands.",
            Command::Paste => "makes events from an already processed request.",
            Command::Sequentially => "splits a compound request into steps and runs them in order.",
        }
    }

    /// Case-insensitive exact name lookup.
    pub fn from_name(input: &str) -> Option<Command> {
        REGISTRY.get(input.trim().to_uppercase().as_str()).copied()
    }

    /// Whether this command may be chosen as one step of a compound request.
    pub fn is_step(self) -> bool {
        !matches!(self, Command::Sequentially | Command::Help)
    }
}

/// Runs one command to completion and returns the change-requests the human
/// approved. Only SEQUENTIALLY writes to the calendar itself, through
/// `engine`, so that each step sees what the steps before it did.
pub async fn run_command(
    ctx: &PlannerContext,
    engine: &ActionEngine,
    command: Command,
    prompt: &str,
) -> Result<Vec<ChangeRequest>, CommandError> {
    info!(command = command.name(), "running command");
    match command {
        Command::Make => make::run(ctx, prompt).await,
        Command::Edit => edit::run(ctx, prompt).await,
        Command::Delete => delete::run(ctx, prompt).await,
        Command::Complete => complete::run(ctx, prompt).await,
        Command::GetThenMake => get_then_make::run(ctx, prompt).await,
        Command::Help => Ok(help::run(ctx)),
        Command::Paste => paste::run(ctx, prompt).await,
        Command::Sequentially => sequentially::run(ctx, engine, prompt).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_ignores_case_and_padding() {
        assert_eq!(Command::from_name("make"), Some(Command::Make));
        assert_eq!(Command::from_name("  Get Then Make "), Some(Command::GetThenMake));
        assert_eq!(Command::from_name("makes"), None);
    }

    #[test]
    fn step_commands_exclude_help_and_sequentially() {
        let steps: Vec<Command> = Command::ALL.into_iter().filter(|c| c.is_step()).collect();
        assert_eq!(steps.len(), 6);
        assert!(!steps.contains(&Command::Sequentially));
    }
}
