//! Display formatting for plans, steps, statistics, and operation results.
//!
//! Domain models implement [`std::fmt::Display`] in [`models`] as markdown;
//! the wrappers here add context (lists, creation confirmations, yes/no
//! operation outcomes). The CLI renders the markdown with termimad.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Domain Models  │    │    Wrappers     │    │    Markdown     │
//! │ (Plan, Step,    │───▶│ (Plans,         │───▶│     output      │
//! │  Stats)         │    │  CreateResult)  │    │                 │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod results;

pub use collections::Plans;
pub use datetime::{FormatDuration, LocalDateTime};
pub use results::{CreateResult, DeleteResult, OperationStatus};
