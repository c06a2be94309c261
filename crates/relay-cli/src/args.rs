//! Command-line interface definitions using clap
//!
//! Each command's arguments live in a clap `Args` struct that converts into
//! the matching core parameter type, so the core stays free of clap:
//!
//! ```text
//! User Input → CLI Args (clap) → Core Params → PlanEngine
//! ```

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use relay_core::params::{ListPlans, UpdatePlan};

/// Relay runs multi-step plans: shell commands, manual checkpoints, and
/// placeholder steps, in dependency order, with pause, resume, and cancel.
#[derive(Parser)]
#[command(version, about, name = "relay")]
pub struct Args {
    /// Directory holding plan and stats documents. Defaults to
    /// $XDG_DATA_HOME/relay
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory shell steps may run in (repeatable). Defaults to the home
    /// directory
    #[arg(long = "allowed-root", global = true)]
    pub allowed_roots: Vec<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage and run plans
    #[command(alias = "p")]
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Signal the outcome of a step
    #[command(alias = "s")]
    Step {
        #[command(subcommand)]
        command: StepCommands,
    },
    /// Show execution statistics
    Stats,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Create a plan from a JSON document
    #[command(alias = "c")]
    Create(CreatePlanArgs),
    /// List plans, most recently updated first
    #[command(alias = "l")]
    List(ListPlansArgs),
    /// Show a plan with all of its steps
    #[command(alias = "s")]
    Show(PlanIdArgs),
    /// Change a plan's title, description, or project path
    #[command(alias = "u")]
    Update(UpdatePlanArgs),
    /// Delete a plan, cancelling it if it is executing
    #[command(alias = "d")]
    Delete(DeletePlanArgs),
    /// Execute a draft plan and follow its progress
    #[command(alias = "r")]
    Run(PlanIdArgs),
    /// Pause an executing plan
    Pause(PlanIdArgs),
    /// Resume a paused plan and follow its progress
    Resume(PlanIdArgs),
    /// Cancel an executing or paused plan
    Cancel(PlanIdArgs),
}

#[derive(Subcommand)]
pub enum StepCommands {
    /// Mark a step completed and follow the plan's progress
    #[command(alias = "c")]
    Complete(CompleteStepArgs),
    /// Mark a step failed, which fails its plan
    #[command(alias = "f")]
    Fail(FailStepArgs),
}

/// Create a plan
///
/// The document has the shape
/// `{"title": "...", "project_path": "...", "steps": [{"name": "...",
/// "type": "shell", "command": "...", "depends_on": [0]}]}`.
#[derive(ClapArgs)]
pub struct CreatePlanArgs {
    #[arg(help = "Path to the JSON plan document")]
    pub file: PathBuf,
}

#[derive(ClapArgs)]
pub struct ListPlansArgs {
    #[arg(long, help = "Only list plans for this project directory")]
    pub project_path: Option<String>,
}

impl From<ListPlansArgs> for ListPlans {
    fn from(val: ListPlansArgs) -> Self {
        ListPlans {
            project_path: val.project_path,
        }
    }
}

#[derive(ClapArgs)]
pub struct PlanIdArgs {
    #[arg(help = "Unique identifier of the plan")]
    pub id: String,
}

#[derive(ClapArgs)]
pub struct UpdatePlanArgs {
    #[arg(help = "Unique identifier of the plan to update")]
    pub id: String,
    #[arg(short, long, help = "New title for the plan")]
    pub title: Option<String>,
    #[arg(short, long, help = "New description; an empty string clears it")]
    pub description: Option<String>,
    #[arg(long, help = "New project directory for shell steps")]
    pub project_path: Option<String>,
}

impl From<UpdatePlanArgs> for UpdatePlan {
    fn from(val: UpdatePlanArgs) -> Self {
        UpdatePlan {
            title: val.title,
            description: val.description,
            project_path: val.project_path,
            steps: None,
        }
    }
}

/// Delete a plan
///
/// Requires --confirm since the plan and its history cannot be recovered.
#[derive(ClapArgs)]
pub struct DeletePlanArgs {
    #[arg(help = "Unique identifier of the plan to delete")]
    pub id: String,
    #[arg(long, help = "Confirm permanent deletion")]
    pub confirm: bool,
}

#[derive(ClapArgs)]
pub struct CompleteStepArgs {
    #[arg(help = "Unique identifier of the plan")]
    pub plan_id: String,
    #[arg(help = "Unique identifier of the step")]
    pub step_id: String,
    #[arg(short, long, help = "What the step produced")]
    pub output: Option<String>,
}

#[derive(ClapArgs)]
pub struct FailStepArgs {
    #[arg(help = "Unique identifier of the plan")]
    pub plan_id: String,
    #[arg(help = "Unique identifier of the step")]
    pub step_id: String,
    #[arg(short, long, help = "Why the step failed")]
    pub error: String,
}
