use std::fs;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};

use crate::config::RunMode;
use crate::error::CommandError;
use crate::handlers::action::ActionEngine;
use crate::handlers::commands::{Command, run_command};
use crate::models::event::parse_timestamp;
use crate::models::signal::SCRY_COUNT;
use crate::runtime::{self, Flow};
use crate::service::context::PlannerContext;
use crate::service::routing::{CommandRouter, ManualRouter, ModelRouter, SequentialRouter};

#[derive(Parser)]
#[command(name = "calendarBot", about = "Plans your calendar from free-text prompts")]
pub struct Cli {
    /// Overrides RUN_MODE from the config.
    #[arg(long, value_enum)]
    pub mode: Option<RunMode>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive planning loop (the default).
    Run,
    /// Lists the next 5 events.
    Scry,
    /// Lists the next <count> events.
    Next { count: i64 },
    /// Lists the events between two "YYYY-MM-DD HH:MM" times.
    Between { start: String, end: String },
    /// Creates events from a file holding an already processed model reply.
    Paste { file: PathBuf },
}

pub fn router_for(mode: RunMode) -> Box<dyn CommandRouter> {
    match mode {
        RunMode::Manual => Box::new(ManualRouter),
        RunMode::Intelligent => Box::new(ModelRouter),
        RunMode::Sequential => Box::new(SequentialRouter),
    }
}

pub async fn cli(
    cli: Cli,
    ctx: &PlannerContext,
    engine: &ActionEngine,
    configured_mode: RunMode,
) -> anyhow::Result<()> {
    let mode = cli.mode.unwrap_or(configured_mode);
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let router = router_for(mode);
            runtime::run_loop(ctx, router.as_ref(), engine).await;
        }
        Commands::Scry => runtime::show_upcoming(ctx, SCRY_COUNT).await?,
        Commands::Next { count } => runtime::show_upcoming(ctx, count).await?,
        Commands::Between { start, end } => {
            let start = parse_timestamp(&start, &ctx.timezone)
                .ok_or_else(|| anyhow!("invalid start time '{}', expected YYYY-MM-DD HH:MM", start))?;
            let end = parse_timestamp(&end, &ctx.timezone)
                .ok_or_else(|| anyhow!("invalid end time '{}', expected YYYY-MM-DD HH:MM", end))?;
            runtime::show_between(ctx, Some(start), Some(end)).await?;
        }
        Commands::Paste { file } => {
            let pasted = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            match run_command(ctx, engine, Command::Paste, &pasted).await {
                Ok(changes) => {
                    engine.apply_all(&changes, ctx.now().fixed_offset()).await;
                }
                Err(CommandError::Signal(signal)) => {
                    if runtime::handle_signal(ctx, signal).await == Flow::Stop {
                        return Ok(());
                    }
                }
                Err(CommandError::Backend(err)) => return Err(err.into()),
            }
        }
    }
    Ok(())
}
