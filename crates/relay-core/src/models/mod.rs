//! Data models for plans, steps, and execution statistics.
//!
//! All models serialize with serde and are the exact documents the
//! [`crate::store`] layer writes to disk. Display implementations live in
//! [`crate::display::models`] so presentation stays out of the data types.
//!
//! # Examples
//!
//! ```rust
//! use relay_core::models::{Plan, PlanStatus};
//! use jiff::Timestamp;
//!
//! let plan = Plan {
//!     id: "p1".to_string(),
//!     title: "Release".to_string(),
//!     description: None,
//!     project_path: "/tmp".to_string(),
//!     status: PlanStatus::Draft,
//!     steps: vec![],
//!     current_step_index: 0,
//!     created_at: Timestamp::now(),
//!     updated_at: Timestamp::now(),
//!     started_at: None,
//!     completed_at: None,
//!     total_duration_ms: None,
//!     error: None,
//! };
//! assert!(!plan.status.is_terminal());
//! ```

pub mod plan;
pub mod stats;
pub mod status;
pub mod step;


pub use plan::Plan;
pub use stats::PlanExecutionStats;
pub use status::{PlanStatus, StepStatus, StepType};
pub use step::PlanStep;
