//! Persistence for plans and execution statistics.
//!
//! The engine keeps the authoritative state in memory and mirrors every
//! mutation through a [`PlanStore`] on a best-effort basis: a failed write is
//! logged by the caller and never rolls the in-memory change back.

use crate::{
    error::Result,
    models::{Plan, PlanExecutionStats},
};

pub mod json;

pub use json::JsonFileStore;

/// Storage backend for plan documents and the stats document.
pub trait PlanStore: Send + Sync {
    /// Load every stored plan. Unreadable documents are skipped.
    fn load_plans(&self) -> Result<Vec<Plan>>;

    /// Write (create or replace) the document for `plan`.
    fn save_plan(&self, plan: &Plan) -> Result<()>;

    /// Remove the document for `plan_id`. Removing a missing plan is not an
    /// error.
    fn delete_plan(&self, plan_id: &str) -> Result<()>;

    /// Load the stats document, or `None` if none was saved yet.
    fn load_stats(&self) -> Result<Option<PlanExecutionStats>>;

    fn save_stats(&self, stats: &PlanExecutionStats) -> Result<()>;
}
