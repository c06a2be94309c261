//! Process-wide execution statistics.

use serde::{Deserialize, Serialize};

/// Cumulative counters across every plan the engine has run.
///
/// These outlive individual plans: deleting a plan never rolls them back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanExecutionStats {
    pub total_plans: u64,
    pub completed_plans: u64,
    pub failed_plans: u64,
    /// `completed / (completed + failed)`, 0.0 before any plan finished
    pub success_rate: f64,
    /// Mean `total_duration_ms` over completed plans only
    pub avg_duration_ms: f64,
    pub total_steps_executed: u64,
}
