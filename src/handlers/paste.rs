use super::make::approve_new_events;
use crate::error::CommandError;
use crate::models::event::ChangeRequest;
use crate::service::context::PlannerContext;
use crate::service::json_extractor::extract;

/// Treats the prompt as a model reply that was already agreed on elsewhere.
pub async fn run(ctx: &PlannerContext, prompt: &str) -> Result<Vec<ChangeRequest>, CommandError> {
    let mut pasted = prompt.trim().to_string();
    if pasted.is_empty() {
        pasted = ctx.ask("Please paste the processed events", None)?;
    }
    let records = extract(ctx, &pasted).await;
    Ok(approve_new_events(ctx, records)?)
}
