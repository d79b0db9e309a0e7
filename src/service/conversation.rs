use tracing::{error, warn};

use super::context::PlannerContext;
use super::openai_service::ModelTier;
use crate::models::signal::ControlSignal;
use crate::models::transcript::Transcript;

/// Typing exactly this (or accepting the default) ends a negotiation.
pub const SENTINEL: &str = "This is okay.";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Sends the transcript, retrying failed calls `pacing.max_resends` times
/// with a fixed delay. Gives back an empty reply once every attempt failed.
pub async fn complete_with_retry(
    ctx: &PlannerContext,
    transcript: &Transcript,
    tier: ModelTier,
    temperature: f32,
) -> String {
    let max_resends = ctx.pacing.max_resends;
    let mut resends = 0;
    loop {
        match ctx
            .model
            .complete(transcript.messages(), tier, temperature)
            .await
        {
            Ok(reply) => return reply,
            Err(err) if resends < max_resends => {
                resends += 1;
                warn!(%err, "model call failed, resending ({}/{})", resends, max_resends);
                ctx.say(&format!(
                    "An error occurred. Resending ({}/{})...",
                    resends, max_resends
                ));
                tokio::time::sleep(ctx.pacing.retry_delay).await;
            }
            Err(err) => {
                error!(%err, "all model requests failed");
                ctx.say(&format!("All requests failed! Error: {}", err));
                return String::new();
            }
        }
    }
}

/// Talks with the model until the human accepts a reply.
pub async fn negotiate(
    ctx: &PlannerContext,
    prompt: &str,
    tier: ModelTier,
    temperature: f32,
) -> Result<String, ControlSignal> {
    negotiate_transcript(ctx, prompt, tier, temperature)
        .await
        .map(|(reply, _)| reply)
}

/// Like [`negotiate`], also handing back the full transcript.
///
/// Every non-sentinel answer from the human is appended as steering for the
/// next call. Only the first call may run on the requested tier; refinement
/// rounds always use the default one.
pub async fn negotiate_transcript(
    ctx: &PlannerContext,
    prompt: &str,
    tier: ModelTier,
    temperature: f32,
) -> Result<(String, Transcript), ControlSignal> {
    ctx.say(&format!("User: {}\n", prompt));
    let mut transcript = Transcript::starting_with(prompt);
    let mut tier = tier;
    loop {
        let reply = complete_with_retry(ctx, &transcript, tier, temperature).await;
        transcript.push_assistant(reply.clone());
        ctx.say(&format!("Bot response: {}\n", reply));

        let answer = ctx.ask_exact("Ok?", Some(SENTINEL))?;
        transcript.push_user(answer.clone());
        if answer == SENTINEL {
            return Ok((reply, transcript));
        }
        tier = ModelTier::Default;
    }
}
