//! The plan execution engine.
//!
//! [`PlanEngine`] is the single entry point callers use. It owns the
//! in-memory plan map (the authoritative state), the live-process table, and
//! the statistics, and mirrors every mutation to the [`PlanStore`] and the
//! optional [`Notifier`].
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   plan_ops      │    │   scheduler     │    │     shell       │
//! │ (create, list,  │    │ (execute, pause,│───▶│ (validate, spawn│
//! │  update, delete)│    │  step signals)  │◀───│  supervise)     │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!          │                      │                      │
//!          ▼                      ▼                      ▼
//!      PlanStore         StatsAggregator            ProcessTable
//! ```
//!
//! ## Submodules
//!
//! - [`builder`]: Factory for [`PlanEngine`] instances
//! - `plan_ops`: Plan repository operations
//! - `scheduler`: Lifecycle state machine and the step-advance routine
//! - `shell`: Supervision of shell steps
//!
//! # Concurrency
//!
//! All scheduling decisions are made while holding the plan-map lock, which
//! is never held across an `.await`. Lock order is plans, then processes
//! or timers, then stats. Operations that dispatch steps spawn tokio tasks and must run
//! inside a tokio runtime.
//!
//! # Usage
//!
//! ```rust,no_run
//! use relay_core::{params::{CreatePlan, StepCreate}, PlanEngineBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = PlanEngineBuilder::new().build().await?;
//!
//! let plan = engine.create(&CreatePlan {
//!     title: "Build".to_string(),
//!     steps: vec![StepCreate::shell("compile", "cargo build")],
//!     ..Default::default()
//! })?;
//! assert!(engine.execute(&plan.id));
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::error;

use crate::{
    models::Plan,
    notify::{Notifier, PlanEvent},
    process::{ProcessSpawner, ProcessTable},
    stats::StatsAggregator,
    store::PlanStore,
    validation::{CommandValidator, PathValidator},
};

pub mod builder;
mod plan_ops;
mod scheduler;
mod shell;


pub use builder::PlanEngineBuilder;

/// Runtime settings of an engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directories a plan's project path must lie within for shell steps
    pub allowed_roots: Vec<PathBuf>,
    /// How long placeholder step types take to auto-complete
    pub placeholder_delay: Duration,
}

pub(crate) struct EngineInner {
    plans: Mutex<HashMap<String, Plan>>,
    processes: ProcessTable,
    /// Armed placeholder timers; entries hold no process handle.
    timers: ProcessTable,
    stats: StatsAggregator,
    store: Arc<dyn PlanStore>,
    notifier: Option<Arc<dyn Notifier>>,
    command_validator: Arc<dyn CommandValidator>,
    path_validator: Arc<dyn PathValidator>,
    spawner: Arc<dyn ProcessSpawner>,
    config: EngineConfig,
}

/// Handle to the execution engine. Cloning is cheap and every clone refers
/// to the same state.
#[derive(Clone)]
pub struct PlanEngine {
    inner: Arc<EngineInner>,
}

impl PlanEngine {
    /// Number of shell steps with a live or pending process.
    pub fn live_processes(&self) -> usize {
        self.inner.processes.len()
    }

    fn lock_plans(&self) -> MutexGuard<'_, HashMap<String, Plan>> {
        self.inner.plans.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Persist `plan` and notify observers. A failed write is logged and
    /// otherwise ignored; memory stays authoritative.
    fn commit(&self, plan: &Plan, event: PlanEvent) {
        if let Err(e) = self.inner.store.save_plan(plan) {
            error!("Failed to persist plan {}: {e}", plan.id);
        }
        self.notify(event, plan);
    }

    fn notify(&self, event: PlanEvent, plan: &Plan) {
        if let Some(notifier) = &self.inner.notifier {
            notifier.notify(event, plan);
        }
    }
}
