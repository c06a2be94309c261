//! Relay CLI Application
//!
//! Command-line interface for the relay plan execution engine.

mod args;
mod cli;
mod renderer;

use std::sync::Arc;

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use cli::Cli;
use log::info;
use relay_core::{params::ListPlans, ChannelNotifier, PlanEngineBuilder};
use renderer::TerminalRenderer;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        data_dir,
        allowed_roots,
        no_color,
        command,
    } = Args::parse();

    let (notifier, events) = ChannelNotifier::new();
    let engine = PlanEngineBuilder::new()
        .with_data_dir(data_dir)
        .with_allowed_roots(allowed_roots)
        .with_notifier(Arc::new(notifier))
        .build()
        .await
        .context("Failed to initialize plan engine")?;

    let cli = Cli::new(engine, events, TerminalRenderer::new(!no_color));

    info!("Relay started");

    match command {
        Some(Plan { command }) => cli.handle_plan_command(command).await,
        Some(Step { command }) => cli.handle_step_command(command).await,
        Some(Stats) => cli.show_stats(),
        None => cli.list_plans(&ListPlans::default()),
    }
}
