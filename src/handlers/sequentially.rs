use serde::Deserialize;
use tracing::{info, warn};

use super::action::ActionEngine;
use super::commands::{Command, run_command};
use crate::error::CommandError;
use crate::models::event::ChangeRequest;
use crate::service::context::PlannerContext;
use crate::service::conversation::{DEFAULT_TEMPERATURE, negotiate};
use crate::service::json_extractor::extract;
use crate::service::openai_service::ModelTier;

/// One part of a compound request, as proposed by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub subquery: String,
    pub command: String,
}

/// Splits a compound request into steps and runs each step's command in
/// order, pausing between steps. Each step's approved changes are applied
/// before the next step starts, so nothing is left for the caller to apply.
pub async fn run(
    ctx: &PlannerContext,
    engine: &ActionEngine,
    prompt: &str,
) -> Result<Vec<ChangeRequest>, CommandError> {
    let reply = negotiate(ctx, &breakdown_prompt(prompt), ModelTier::Default, DEFAULT_TEMPERATURE).await?;
    let steps = read_steps(extract(ctx, &reply).await);
    info!(steps = steps.len(), "running compound request");

    let mut first = true;
    for step in steps {
        let Some(command) = Command::from_name(&step.command).filter(|c| c.is_step()) else {
            warn!(command = %step.command, "skipping step with unknown command");
            ctx.say(&format!("Skipping \"{}\": {} is not a command I can run.", step.subquery, step.command));
            continue;
        };
        if !first {
            ctx.say(&format!("Waiting {} seconds to do the next task.", ctx.pacing.step_delay.as_secs()));
            tokio::time::sleep(ctx.pacing.step_delay).await;
        }
        first = false;

        ctx.say(&format!("\nBot response:\nAlright, we'll {} plans!", command.name()));
        let subquery = format!(
            "I need just this part done: {}, from this list: {}. Everything before this in the list has been done already.",
            step.subquery, prompt
        );
        let changes = Box::pin(run_command(ctx, engine, command, &subquery)).await?;
        let report = engine.apply_all(&changes, ctx.now().fixed_offset()).await;
        info!(step = command.name(), ?report, "step applied");
    }
    Ok(Vec::new())
}

fn breakdown_prompt(prompt: &str) -> String {
    let catalogue: String = Command::ALL
        .into_iter()
        .filter(|c| c.is_step())
        .map(|c| format!("{}, {} ", c.name(), c.description()))
        .collect();
    format!(
        "Only respond in JSON array code block. Given the following query \"{query}\", do the following: \
         1. From the perspective of a calendar app, identify the intents of the query. \
         2. Identify the most suitable commands to satisfy the query from these: {catalogue}\
         Make an array matching the intent of each subpart of the query, using a key named \"subquery\" \
         for the subpart and a key named \"command\" for the chosen command, and return it as a JSON array.",
        query = prompt,
        catalogue = catalogue,
    )
}

fn read_steps(records: Vec<serde_json::Value>) -> Vec<Step> {
    records
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Step>(value) {
            Ok(step) => Some(step),
            Err(err) => {
                warn!(%err, "dropping malformed step");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn breakdown_prompt_lists_only_step_commands() {
        let prompt = breakdown_prompt("clean up and plan friday");
        assert!(prompt.contains("GET THEN MAKE"));
        assert!(!prompt.contains("SEQUENTIALLY"));
        assert!(!prompt.contains("HELP"));
    }

    #[test]
    fn read_steps_keeps_well_formed_records() {
        let steps = read_steps(vec![
            json!({"subquery": "delete the dentist", "command": "DELETE"}),
            json!({"subquery": "missing command"}),
        ]);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].command, "DELETE");
    }
}
