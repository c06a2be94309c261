//! Core library for the Relay plan execution engine.
//!
//! A plan is an ordered list of steps with dependencies between them. The
//! [`PlanEngine`] runs a plan one step at a time: shell steps spawn a
//! validated command in the plan's project directory, manual steps wait for
//! an external completion signal, and the remaining step types complete on
//! their own after a short delay. Plans can be paused, resumed, and
//! cancelled while they execute.
//!
//! # Architecture
//!
//! - **Engine** ([`engine`]): lifecycle state machine, scheduler, and shell
//!   supervision
//! - **Models** ([`models`]): plans, steps, statuses, and statistics
//! - **Store** ([`store`]): JSON documents mirroring the in-memory state
//! - **Validation** ([`validation`]): command allowlist and project-path
//!   checks
//! - **Process** ([`process`]): spawning and killing child processes
//! - **Notify** ([`notify`]): change notifications for observers
//! - **Display** ([`display`]): markdown formatting of models and results
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use relay_core::{params::{CreatePlan, StepCreate}, PlanEngineBuilder, StepType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = PlanEngineBuilder::new()
//!     .with_data_dir(Some("/tmp/relay"))
//!     .build()
//!     .await?;
//!
//! let plan = engine.create(&CreatePlan {
//!     title: "Release".to_string(),
//!     project_path: Some("/home/user/project".to_string()),
//!     steps: vec![
//!         StepCreate::shell("test", "cargo test"),
//!         StepCreate::new("sign off", StepType::Manual).depends_on([0]),
//!     ],
//!     ..Default::default()
//! })?;
//!
//! engine.execute(&plan.id);
//! println!("{}", engine.get(&plan.id).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod display;
pub mod engine;
pub mod error;
pub mod models;
pub mod notify;
pub mod params;
pub mod process;
pub mod stats;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use display::{CreateResult, DeleteResult, FormatDuration, LocalDateTime, OperationStatus, Plans};
pub use engine::{EngineConfig, PlanEngine, PlanEngineBuilder};
pub use error::{EngineError, Result, StepFailure};
pub use models::{Plan, PlanExecutionStats, PlanStatus, PlanStep, StepStatus, StepType};
pub use notify::{ChannelNotifier, Notifier, PlanEvent};
pub use params::{CreatePlan, ListPlans, StepCreate, UpdatePlan};
pub use store::{JsonFileStore, PlanStore};
