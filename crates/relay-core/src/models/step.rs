//! Step model definition.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{StepStatus, StepType};

/// One unit of work within a plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanStep {
    /// Unique identifier for the step
    pub id: String,

    /// Short name of the step
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Position of the step within the plan (0-indexed)
    pub order: u32,

    #[serde(rename = "type")]
    pub step_type: StepType,

    #[serde(default)]
    pub status: StepStatus,

    /// Command line for `shell` steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Ids of steps in the same plan that must complete first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_secs: Option<u64>,

    /// Captured stdout (shell) or the completion output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}

impl PlanStep {
    /// Append a chunk of process output.
    pub(crate) fn append_output(&mut self, chunk: &str) {
        self.output.get_or_insert_with(String::new).push_str(chunk);
    }
}
