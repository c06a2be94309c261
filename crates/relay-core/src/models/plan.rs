//! Plan model definition and related functionality.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{PlanStatus, PlanStep, StepStatus};

/// A titled, ordered collection of steps with an overall lifecycle status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    /// Unique identifier for the plan
    pub id: String,

    /// Title of the plan
    pub title: String,

    /// Detailed multi-line description of the plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Working directory shell steps run in
    pub project_path: String,

    #[serde(default)]
    pub status: PlanStatus,

    /// Steps ordered by `order`, which always equals the index
    #[serde(default)]
    pub steps: Vec<PlanStep>,

    /// Index of the step the scheduler is currently advancing through
    #[serde(default)]
    pub current_step_index: usize,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,

    /// Wall time from `started_at` to `completed_at`, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Plan {
    /// Position of the step with `step_id`, if it belongs to this plan.
    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn step(&self, step_id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// The step at `current_step_index`, if the index is in range.
    pub fn current_step(&self) -> Option<&PlanStep> {
        self.steps.get(self.current_step_index)
    }

    /// Count of steps in the given status.
    pub fn count_steps(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// True when every dependency of `step` has completed.
    ///
    /// A dependency id that does not name a step of this plan can never be
    /// satisfied.
    pub fn dependencies_met(&self, step: &PlanStep) -> bool {
        step.dependencies.iter().all(|dep| {
            self.step(dep)
                .is_some_and(|d| d.status == StepStatus::Completed)
        })
    }

    /// Bump `updated_at` to now.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }

    /// Record the terminal timestamps and the total duration.
    pub(crate) fn finish(&mut self, status: PlanStatus, error: Option<String>) {
        let now = Timestamp::now();
        self.status = status;
        self.error = error;
        self.completed_at = Some(now);
        self.total_duration_ms = Some(self.started_at.map_or(0, |started| {
            let millis = now.duration_since(started).as_millis();
            u64::try_from(millis.max(0)).unwrap_or(u64::MAX)
        }));
        self.updated_at = now;
    }
}
