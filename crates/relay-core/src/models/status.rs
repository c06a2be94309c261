//! Status and type enumerations for plans and steps.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Created but never executed
    #[default]
    Draft,

    /// A step is being advanced
    Executing,

    /// Suspended by `pause`; `resume` continues it
    Paused,

    /// Every step completed (terminal)
    Completed,

    /// A step failed or the plan was cancelled (terminal)
    Failed,
}

impl PlanStatus {
    /// Lowercase string form, matching the serialized representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Executing => "executing",
            PlanStatus::Paused => "paused",
            PlanStatus::Completed => "completed",
            PlanStatus::Failed => "failed",
        }
    }

    /// `completed` and `failed` admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Completed | PlanStatus::Failed)
    }
}

/// Status of a single step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Waiting to be scheduled
    #[default]
    Pending,

    /// Dispatched and not yet finished
    Running,

    /// Finished successfully
    Completed,

    /// Finished unsuccessfully
    Failed,
}

impl StepStatus {
    /// Lowercase string form, matching the serialized representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }

    /// Get status with consistent icon formatting for display.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use relay_core::models::StepStatus;
    ///
    /// assert_eq!(StepStatus::Completed.with_icon(), "✓ Completed");
    /// assert_eq!(StepStatus::Running.with_icon(), "➤ Running");
    /// assert_eq!(StepStatus::Pending.with_icon(), "○ Pending");
    /// assert_eq!(StepStatus::Failed.with_icon(), "✗ Failed");
    /// ```
    pub fn with_icon(&self) -> &'static str {
        match self {
            StepStatus::Completed => "✓ Completed",
            StepStatus::Running => "➤ Running",
            StepStatus::Pending => "○ Pending",
            StepStatus::Failed => "✗ Failed",
        }
    }
}

/// What kind of work a step performs, which decides how it is dispatched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    /// Runs an external command under the process supervisor
    Shell,
    /// Waits for an external `step_complete`/`step_fail`
    Manual,
    Code,
    Research,
    Review,
    Test,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Shell => "shell",
            StepType::Manual => "manual",
            StepType::Code => "code",
            StepType::Research => "research",
            StepType::Review => "review",
            StepType::Test => "test",
        }
    }

    /// Step types that complete on a timer until agent delegation exists.
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            StepType::Code | StepType::Research | StepType::Review | StepType::Test
        )
    }
}
