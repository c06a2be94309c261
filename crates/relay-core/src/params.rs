//! Parameter structures for engine operations.
//!
//! These are the shapes callers hand to [`crate::PlanEngine`], independent of
//! the interface they come through. The CLI reads [`CreatePlan`] straight
//! from a JSON document, so every type here derives serde.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   CLI args /    │    │  Core params    │    │   PlanEngine    │
//! │  JSON document  │───▶│ (this module)   │───▶│   operations    │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::models::StepType;

/// Parameters for creating a plan.
///
/// # Examples
///
/// ```rust
/// use relay_core::params::CreatePlan;
///
/// let params: CreatePlan = serde_json::from_str(r#"{
///     "title": "Build",
///     "project_path": "/tmp",
///     "steps": [
///         { "name": "compile", "type": "shell", "command": "cargo build" },
///         { "name": "check", "type": "manual", "depends_on": [0] }
///     ]
/// }"#).unwrap();
/// assert_eq!(params.steps[1].depends_on, vec![0]);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePlan {
    /// Title of the plan
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Working directory for shell steps; defaults to the current directory
    #[serde(default)]
    pub project_path: Option<String>,
    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<StepCreate>,
}

/// Parameters for one step of a new plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Command line, required for `shell` steps
    #[serde(default)]
    pub command: Option<String>,
    /// Positions (within the same request) of steps this one waits for.
    ///
    /// Positions must be lower than the step's own position for the step to
    /// ever become eligible; the scheduler only scans forward.
    #[serde(default)]
    pub depends_on: Vec<usize>,
    #[serde(default)]
    pub estimated_duration_secs: Option<u64>,
}

impl StepCreate {
    /// A step of `step_type` with only a name set.
    pub fn new(name: impl Into<String>, step_type: StepType) -> Self {
        Self {
            name: name.into(),
            description: None,
            step_type,
            command: None,
            depends_on: Vec::new(),
            estimated_duration_secs: None,
        }
    }

    /// A `shell` step running `command`.
    pub fn shell(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            ..Self::new(name, StepType::Shell)
        }
    }

    /// Add dependencies by request position.
    pub fn depends_on(mut self, positions: impl IntoIterator<Item = usize>) -> Self {
        self.depends_on.extend(positions);
        self
    }
}

/// Partial update of a plan. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlan {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_path: Option<String>,
    /// Replacement step list; only accepted while the plan is a draft
    #[serde(default)]
    pub steps: Option<Vec<StepCreate>>,
}

impl UpdatePlan {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.project_path.is_none()
            && self.steps.is_none()
    }
}

/// Parameters for listing plans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPlans {
    /// Only plans whose `project_path` equals this path
    #[serde(default)]
    pub project_path: Option<String>,
}
