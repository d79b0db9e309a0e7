use async_trait::async_trait;
use tracing::debug;

use super::context::PlannerContext;
use super::conversation::{DEFAULT_TEMPERATURE, negotiate};
use super::openai_service::ModelTier;
use crate::handlers::commands::Command;
use crate::models::signal::ControlSignal;

/// A command chosen for one top-level request, with the plan it should work on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub command: Command,
    pub prompt: String,
}

/// Picks the command for the next top-level request. `Ok(None)` means
/// nothing matched; the human has already been told.
#[async_trait]
pub trait CommandRouter: Send + Sync {
    async fn route(&self, ctx: &PlannerContext) -> Result<Option<Routed>, ControlSignal>;
}

/// The human types the command name, then the plan.
pub struct ManualRouter;

#[async_trait]
impl CommandRouter for ManualRouter {
    async fn route(&self, ctx: &PlannerContext) -> Result<Option<Routed>, ControlSignal> {
        let choice = ctx.ask(
            "What would you like to do? Type help for list of commands.",
            Some("make"),
        )?;
        let Some(command) = Command::from_name(&choice) else {
            debug!(%choice, "no command with that name");
            return Ok(None);
        };

        announce(ctx, command);
        let prompt = if command == Command::Help {
            String::new()
        } else {
            ctx.ask("Please enter a general plan", None)?
        };
        Ok(Some(Routed { command, prompt }))
    }
}

/// The human types the plan and the model picks the command.
pub struct ModelRouter;

#[async_trait]
impl CommandRouter for ModelRouter {
    async fn route(&self, ctx: &PlannerContext) -> Result<Option<Routed>, ControlSignal> {
        let plan = ctx.ask("Please enter a general plan", None)?;
        if plan.trim().is_empty() {
            return Ok(Some(Routed {
                command: Command::Make,
                prompt: String::new(),
            }));
        }

        let reply = negotiate(ctx, &selection_prompt(&plan), ModelTier::Default, DEFAULT_TEMPERATURE).await?;
        let Some(command) = match_in_reply(&reply) else {
            debug!(%reply, "model reply names no command");
            return Ok(None);
        };
        announce(ctx, command);
        Ok(Some(Routed { command, prompt: plan }))
    }
}

/// Every plan is treated as a compound request and split into steps.
pub struct SequentialRouter;

#[async_trait]
impl CommandRouter for SequentialRouter {
    async fn route(&self, ctx: &PlannerContext) -> Result<Option<Routed>, ControlSignal> {
        let plan = ctx.ask("Please enter a general plan", None)?;
        Ok(Some(Routed {
            command: Command::Sequentially,
            prompt: plan,
        }))
    }
}

fn announce(ctx: &PlannerContext, command: Command) {
    ctx.say(&format!("\nBot response:\nAlright, we'll {} plans!", command.name()));
}

fn selection_prompt(plan: &str) -> String {
    let catalogue: String = Command::ALL
        .into_iter()
        .map(|c| format!(" {}, {}", c.name(), c.description()))
        .collect();
    format!(
        "Given the following query \"{plan}\", do the following: \
         1. From the perspective of a calendar app, identify the intent of the query. \
         2. Identify the most suitable command to satisfy the query from these:{catalogue} \
         Make sure only to include one mention of an existing command in your response.",
    )
}

/// The command whose name occurs first in the reply. When two names start at
/// the same place the longer one wins, so "GET THEN MAKE" is not read as
/// "MAKE". Matching is case-sensitive.
///
/// The position in the reply decides, not the order of the menu: a reply
/// naming DELETE before EDIT picks DELETE even though EDIT is listed first.
pub fn match_in_reply(reply: &str) -> Option<Command> {
    Command::ALL
        .into_iter()
        .filter_map(|c| reply.find(c.name()).map(|at| (at, c)))
        .min_by(|(a, ca), (b, cb)| a.cmp(b).then(cb.name().len().cmp(&ca.name().len())))
        .map(|(_, c)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earliest_mention_wins() {
        assert_eq!(
            match_in_reply("The intent is removal, so DELETE fits better than EDIT."),
            Some(Command::Delete)
        );
    }

    #[test]
    fn reply_position_beats_menu_order() {
        assert_eq!(
            match_in_reply("PASTE is closest; MAKE would also work."),
            Some(Command::Paste)
        );
    }

    #[test]
    fn longer_name_wins_at_same_position() {
        assert_eq!(
            match_in_reply("Command: GET THEN MAKE"),
            Some(Command::GetThenMake)
        );
        assert_eq!(match_in_reply("Command: MAKE"), Some(Command::Make));
    }

    #[test]
    fn lowercase_names_do_not_match() {
        assert_eq!(match_in_reply("you should make an event"), None);
    }

    #[test]
    fn selection_prompt_lists_every_command() {
        let prompt = selection_prompt("lunch");
        for command in Command::ALL {
            assert!(prompt.contains(command.name()));
        }
    }
}
