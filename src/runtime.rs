use chrono::{DateTime, FixedOffset};
use tracing::{error, info};

use crate::error::{BackendError, CommandError};
use crate::handlers::action::ActionEngine;
use crate::handlers::commands::run_command;
use crate::models::event::ChangeRequest;
use crate::models::signal::{ControlSignal, SCRY_COUNT};
use crate::service::calendar_service::render_listing;
use crate::service::context::PlannerContext;
use crate::service::formatting::readable_time;
use crate::service::routing::CommandRouter;
use crate::service::time_window::TimeWindow;

/// Whether the loop keeps going after a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// One pass through the router and the chosen command. The returned changes
/// are not yet written to the calendar.
pub async fn run_once(
    ctx: &PlannerContext,
    router: &dyn CommandRouter,
    engine: &ActionEngine,
) -> Result<Vec<ChangeRequest>, CommandError> {
    let Some(routed) = router.route(ctx).await? else {
        ctx.say("\nBot response:\nSorry, I couldn't understand your response.");
        return Ok(Vec::new());
    };
    run_command(ctx, engine, routed.command, &routed.prompt).await
}

/// Main menu loop: route, run, apply, repeat. Control words typed anywhere
/// land here; calendar failures are reported and the loop carries on.
pub async fn run_loop(ctx: &PlannerContext, router: &dyn CommandRouter, engine: &ActionEngine) {
    ctx.say("Welcome to CalendarBot!");
    ctx.say("----------------------------");
    loop {
        match run_once(ctx, router, engine).await {
            Ok(changes) => {
                if !changes.is_empty() {
                    engine.apply_all(&changes, ctx.now().fixed_offset()).await;
                }
            }
            Err(CommandError::Signal(signal)) => {
                if handle_signal(ctx, signal).await == Flow::Stop {
                    break;
                }
            }
            Err(CommandError::Backend(err)) => report_backend_error(ctx, &err),
        }
    }
    info!("leaving main loop");
    ctx.say("Goodbye!");
}

/// Carries out a control word. Listing failures are reported, not raised.
pub async fn handle_signal(ctx: &PlannerContext, signal: ControlSignal) -> Flow {
    info!(?signal, "control signal");
    let result = match signal {
        ControlSignal::Exit => return Flow::Stop,
        ControlSignal::Regret => {
            ctx.say("Let's try again!");
            Ok(())
        }
        ControlSignal::Scry => show_upcoming(ctx, SCRY_COUNT).await,
        ControlSignal::GetNext(count) => show_upcoming(ctx, count).await,
        ControlSignal::GetBetween { start, end } => show_between(ctx, start, end).await,
    };
    if let Err(err) = result {
        report_backend_error(ctx, &err);
    }
    Flow::Continue
}

/// Lists the next `count` events from now. Nothing is listed for `count <= 0`.
pub async fn show_upcoming(ctx: &PlannerContext, count: i64) -> Result<(), BackendError> {
    let Ok(max) = usize::try_from(count) else {
        ctx.say("No upcoming events found.");
        return Ok(());
    };
    if max == 0 {
        ctx.say("No upcoming events found.");
        return Ok(());
    }
    ctx.say(&format!("Getting the upcoming {} events", max));
    let events = ctx
        .calendar
        .list_upcoming(ctx.now().fixed_offset(), max)
        .await?;
    if events.is_empty() {
        ctx.say("No upcoming events found.");
    } else {
        ctx.say(&render_listing(&events));
    }
    Ok(())
}

/// Lists the events between two instants. Missing bounds mean from now until
/// the end of today.
pub async fn show_between(
    ctx: &PlannerContext,
    start: Option<DateTime<FixedOffset>>,
    end: Option<DateTime<FixedOffset>>,
) -> Result<(), BackendError> {
    let fallback = TimeWindow::rest_of_day(&ctx.now());
    let start = start.or(fallback.map(|w| w.start));
    let end = end.or(fallback.map(|w| w.end));
    let (Some(start), Some(end)) = (start, end) else {
        ctx.say("Could not work out a time window for today.");
        return Ok(());
    };
    ctx.say(&format!(
        "Getting events between {} and {}",
        readable_time(&start),
        readable_time(&end)
    ));
    let events = ctx.calendar.list_events(start, end).await?;
    ctx.say(&render_listing(&events));
    Ok(())
}

fn report_backend_error(ctx: &PlannerContext, err: &BackendError) {
    error!(%err, "backend call failed");
    ctx.say(&format!("An error occurred: {}", err));
}
